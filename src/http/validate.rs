//! Input validation for the public endpoint.

use crate::error::AppError;

/// Maximum accepted message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 65536;

/// Check E.164 format: `+`, a non-zero leading digit, 2–15 digits total.
pub fn is_valid_phone(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };
    (2..=15).contains(&digits.len())
        && digits.starts_with(|c: char| ('1'..='9').contains(&c))
        && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn validate_phone(phone: &str) -> Result<(), AppError> {
    if is_valid_phone(phone) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Invalid phone number. Must be in E.164 format (e.g., +1234567890).".into(),
        ))
    }
}

pub fn validate_message(message: &str) -> Result<(), AppError> {
    if message.chars().count() <= MAX_MESSAGE_LENGTH {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Message too long. Maximum {MAX_MESSAGE_LENGTH} characters."
        )))
    }
}
