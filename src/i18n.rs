//! User-facing message catalogue (English and Brazilian Portuguese).

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::ACCEPT_LANGUAGE, request::Parts},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    En,
    PtBr,
}

impl Lang {
    /// Pick a language from the first `Accept-Language` entry.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()) else {
            return Lang::En;
        };
        let first = value.split(',').next().unwrap_or("").trim();
        if first.to_ascii_lowercase().starts_with("pt") {
            Lang::PtBr
        } else {
            Lang::En
        }
    }
}

impl<S> FromRequestParts<S> for Lang
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Lang::from_headers(&parts.headers))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    AuthenticationFailure,
    InactiveAuthenticationFailure,
    Unauthenticated,
    ForbiddenUpdate,
    ForbiddenDelete,
    UnauthorizedPasswordReset,
    ValidationFailure,
    UsernameNull,
    UsernameSize,
    EmailNull,
    EmailInvalid,
    EmailInUse,
    EmailNotInUse,
    PasswordNull,
    PasswordSize,
    PasswordPattern,
    ProfileImageSize,
    UnsupportedImageFile,
    UserCreateSuccess,
    AccountActivationSuccess,
    AccountActivationFailure,
    PasswordResetRequestSuccess,
    PasswordResetSuccess,
    EmailFailure,
    UserNotFound,
    InternalError,
}

impl Message {
    pub fn text(self, lang: Lang) -> &'static str {
        match lang {
            Lang::En => self.en(),
            Lang::PtBr => self.pt_br(),
        }
    }

    fn en(self) -> &'static str {
        match self {
            Message::AuthenticationFailure => "Incorrect credentials",
            Message::InactiveAuthenticationFailure => "Account is inactive",
            Message::Unauthenticated => "You are not authenticated",
            Message::ForbiddenUpdate => "You are not authorized to update user",
            Message::ForbiddenDelete => "You are not authorized to delete user",
            Message::UnauthorizedPasswordReset => "Please enter a valid password reset token",
            Message::ValidationFailure => "Validation Failure",
            Message::UsernameNull => "Username cannot be null",
            Message::UsernameSize => "Must have min 4 and max 32 characters",
            Message::EmailNull => "E-mail cannot be null",
            Message::EmailInvalid => "E-mail is not valid",
            Message::EmailInUse => "E-mail in use",
            Message::EmailNotInUse => "E-mail not in use",
            Message::PasswordNull => "Password cannot be null",
            Message::PasswordSize => "Password must be at least 6 characters",
            Message::PasswordPattern => {
                "Password must have at least 1 uppercase, 1 lowercase letter and 1 number"
            }
            Message::ProfileImageSize => "Your profile image cannot be bigger than 2MB",
            Message::UnsupportedImageFile => "Only JPEG or PNG files are allowed",
            Message::UserCreateSuccess => "User created",
            Message::AccountActivationSuccess => "Account is activated",
            Message::AccountActivationFailure => {
                "This account is either active or the token is invalid"
            }
            Message::PasswordResetRequestSuccess => {
                "Check your e-mail for resetting your password"
            }
            Message::PasswordResetSuccess => "Password updated",
            Message::EmailFailure => "E-mail failure",
            Message::UserNotFound => "User not found",
            Message::InternalError => "Internal server error",
        }
    }

    fn pt_br(self) -> &'static str {
        match self {
            Message::AuthenticationFailure => "Credenciais incorretas",
            Message::InactiveAuthenticationFailure => "A conta está inativa",
            Message::Unauthenticated => "Você não está autenticado",
            Message::ForbiddenUpdate => "Você não tem permissão para atualizar o usuário",
            Message::ForbiddenDelete => "Você não tem permissão para excluir o usuário",
            Message::UnauthorizedPasswordReset => {
                "Informe um token de redefinição de senha válido"
            }
            Message::ValidationFailure => "Falha na validação",
            Message::UsernameNull => "O nome de usuário não pode ser nulo",
            Message::UsernameSize => "Deve ter no mínimo 4 e no máximo 32 caracteres",
            Message::EmailNull => "O e-mail não pode ser nulo",
            Message::EmailInvalid => "O e-mail não é válido",
            Message::EmailInUse => "E-mail em uso",
            Message::EmailNotInUse => "E-mail não está em uso",
            Message::PasswordNull => "A senha não pode ser nula",
            Message::PasswordSize => "A senha deve ter pelo menos 6 caracteres",
            Message::PasswordPattern => {
                "A senha deve ter pelo menos 1 letra maiúscula, 1 minúscula e 1 número"
            }
            Message::ProfileImageSize => "A imagem de perfil não pode ser maior que 2MB",
            Message::UnsupportedImageFile => "Apenas arquivos JPEG ou PNG são permitidos",
            Message::UserCreateSuccess => "Usuário criado",
            Message::AccountActivationSuccess => "A conta foi ativada",
            Message::AccountActivationFailure => "Esta conta já está ativa ou o token é inválido",
            Message::PasswordResetRequestSuccess => {
                "Verifique seu e-mail para redefinir sua senha"
            }
            Message::PasswordResetSuccess => "Senha atualizada",
            Message::EmailFailure => "Falha no envio do e-mail",
            Message::UserNotFound => "Usuário não encontrado",
            Message::InternalError => "Erro interno do servidor",
        }
    }
}
