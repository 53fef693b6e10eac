//! Shared error handling for API endpoints.
//!
//! Every failure leaves the API as
//! `{ "path", "timestamp", "message", "validationErrors" }`.
//! [`ApiError`] only knows the status and message keys; [`render_errors`]
//! adds the request path and localizes the text.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error};

use crate::i18n::{Lang, Message};
use crate::tokens::now_millis;

/// Field name to message key.
pub type ValidationErrors = BTreeMap<&'static str, Message>;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::internal(msg, e))
    }
}

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationErrors),
    Unauthorized(Message),
    Forbidden(Message),
    NotFound(Message),
    BadRequest(Message),
    BadGateway(Message),
    Internal,
}

impl ApiError {
    pub fn internal(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(self) -> ErrorDetails {
        match self {
            ApiError::Validation(fields) => ErrorDetails {
                message: Message::ValidationFailure,
                validation_errors: fields,
            },
            ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::BadRequest(message)
            | ApiError::BadGateway(message) => ErrorDetails {
                message,
                validation_errors: ValidationErrors::new(),
            },
            ApiError::Internal => ErrorDetails {
                message: Message::InternalError,
                validation_errors: ValidationErrors::new(),
            },
        }
    }
}

/// Message keys carried on an error response until [`render_errors`] sees it.
#[derive(Debug, Clone)]
struct ErrorDetails {
    message: Message,
    validation_errors: ValidationErrors,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    path: &'a str,
    timestamp: i64,
    message: &'static str,
    #[serde(rename = "validationErrors")]
    validation_errors: BTreeMap<&'static str, &'static str>,
}

impl ErrorDetails {
    fn render(&self, status: StatusCode, path: &str, lang: Lang) -> Response {
        let body = ErrorResponse {
            path,
            timestamp: now_millis(),
            message: self.message.text(lang),
            validation_errors: self
                .validation_errors
                .iter()
                .map(|(field, message)| (*field, message.text(lang)))
                .collect(),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = self.details();
        let mut response = details.render(status, "", Lang::En);
        response.extensions_mut().insert(details);
        response
    }
}

/// Re-render error responses with the request path and language.
pub async fn render_errors(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let lang = Lang::from_headers(request.headers());

    let response = next.run(request).await;

    if let Some(details) = response.extensions().get::<ErrorDetails>().cloned() {
        return details.render(response.status(), &path, lang);
    }
    response
}

/// Success body carrying a localized message.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: Message, lang: Lang) -> Json<Self> {
        Json(Self {
            message: message.text(lang),
        })
    }
}

/// JSON request body whose rejection is an [`ApiError`].
///
/// A missing content type, malformed JSON or a shape mismatch all become
/// `ApiError::Validation` with no field errors. Handlers that answer bad
/// input differently take `Result<JsonBody<T>, ApiError>` and map it.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(error = %rejection, "Rejected request body");
                Err(ApiError::Validation(ValidationErrors::new()))
            }
        }
    }
}
