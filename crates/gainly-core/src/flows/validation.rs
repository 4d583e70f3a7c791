//! Form input sanitising and validation, run before any provider call.

use crate::error::ValidationError;

/// Maximum length for e-mail input (RFC 5321 path limit)
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an e-mail character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

fn sanitize(raw: &str, accept: fn(usize, char) -> bool) -> String {
    let mut value = String::new();
    let mut len = 0;
    for c in raw.chars() {
        if accept(len, c) {
            value.push(c);
            len += 1;
        }
    }
    value
}

pub fn sanitize_email(raw: &str) -> String {
    sanitize(raw.trim(), can_add_email_char)
}

pub fn sanitize_password(raw: &str) -> String {
    sanitize(raw, can_add_password_char)
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    Ok(())
}

/// Registration checks: e-mail shape, matching confirmation, then length.
pub fn validate_registration(
    email: &str,
    password: &str,
    confirm_password: &str,
    min_password_length: usize,
) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if !email.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < min_password_length {
        return Err(ValidationError::PasswordTooShort {
            min: min_password_length,
        });
    }
    Ok(())
}
