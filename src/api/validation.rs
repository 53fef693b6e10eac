//! Field rules shared by registration, profile update and password reset.

use crate::i18n::Message;

const USERNAME_MIN: usize = 4;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 6;

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn check_username(username: Option<&str>) -> Result<(), Message> {
    let username = present(username).ok_or(Message::UsernameNull)?;
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(Message::UsernameSize);
    }
    Ok(())
}

pub fn check_email(email: Option<&str>) -> Result<(), Message> {
    let email = present(email).ok_or(Message::EmailNull)?;
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(Message::EmailInvalid)
    }
}

pub fn check_password(password: Option<&str>) -> Result<(), Message> {
    let password = password.filter(|p| !p.is_empty()).ok_or(Message::PasswordNull)?;
    if password.chars().count() < PASSWORD_MIN {
        return Err(Message::PasswordSize);
    }
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Err(Message::PasswordPattern);
    }
    Ok(())
}

/// Loose structural check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}
