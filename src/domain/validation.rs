//! Shape checks for registration input.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::constants::accounts::{MAX_NAME_LENGTH, MAX_PHONE_LENGTH, MAX_REFERRAL_CODE_LENGTH};
use crate::constants::otp::CODE_LENGTH;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Trims the address and lower-cases the domain part.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex pattern defined in code")
    });

    let trimmed = email.trim();
    if !re.is_match(trimmed) {
        return Err(ValidationError::new(format!(
            "Invalid email address: '{trimmed}'"
        )));
    }

    let (local, domain) = trimmed
        .rsplit_once('@')
        .ok_or_else(|| ValidationError::new("Email must contain '@'"))?;

    Ok(format!("{local}@{}", domain.to_lowercase()))
}

pub fn validate_phone(phone: &str) -> Result<&str, ValidationError> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::new("Phone number cannot be empty"));
    }

    if phone.chars().count() > MAX_PHONE_LENGTH {
        return Err(ValidationError::new(format!(
            "Phone number must be {MAX_PHONE_LENGTH} characters or less"
        )));
    }

    Ok(phone)
}

pub fn validate_referral_code(code: &str) -> Result<&str, ValidationError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::new("Referral code cannot be empty"));
    }

    if code.len() > MAX_REFERRAL_CODE_LENGTH {
        return Err(ValidationError::new(format!(
            "Referral code must be {MAX_REFERRAL_CODE_LENGTH} characters or less"
        )));
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new(
            "Referral code can only contain letters and numbers",
        ));
    }

    Ok(code)
}

/// Splits a display name on the first whitespace run into first and last name.
pub fn split_name(name: &str) -> Result<(String, String), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::new("Name cannot be empty"));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::new(format!(
            "Name must be {MAX_NAME_LENGTH} characters or less"
        )));
    }

    Ok(match name.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim_start().to_string()),
        None => (name.to_string(), String::new()),
    })
}

pub fn validate_password(password: &str, min_length: usize) -> Result<&str, ValidationError> {
    if password.chars().count() < min_length {
        return Err(ValidationError::new(format!(
            "Password must be at least {min_length} characters"
        )));
    }
    Ok(password)
}

pub fn validate_otp_code(code: &str) -> Result<&str, ValidationError> {
    let code = code.trim();
    if code.len() != CODE_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new(format!(
            "OTP must be {CODE_LENGTH} digits"
        )));
    }
    Ok(code)
}
