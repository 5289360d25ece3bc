//! Pre-flight checks on user input
//!
//! Everything here runs before a request is built. A failure is returned as
//! [`Error::Validation`] and never reaches the network.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::{LoginCredentials, RegistrationData};
use crate::{Error, Result};

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

fn contact_regex() -> &'static Regex {
    static CONTACT_REGEX: OnceLock<Regex> = OnceLock::new();
    CONTACT_REGEX.get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").unwrap())
}

fn otp_regex() -> &'static Regex {
    static OTP_REGEX: OnceLock<Regex> = OnceLock::new();
    OTP_REGEX.get_or_init(|| Regex::new(r"^[0-9]{4,8}$").unwrap())
}

/// Check an email address
pub fn validate_email(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(Error::Validation("Email is required".to_string()));
    }
    if !email_regex().is_match(email.trim()) {
        return Err(Error::Validation("Please enter a valid email address".to_string()));
    }
    Ok(())
}

/// Check a password
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(Error::Validation("Password is required".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Check the login form
pub fn validate_login(credentials: &LoginCredentials) -> Result<()> {
    validate_email(&credentials.email)?;
    if credentials.password.is_empty() {
        return Err(Error::Validation("Password is required".to_string()));
    }
    Ok(())
}

/// Check the registration form
pub fn validate_registration(data: &RegistrationData) -> Result<()> {
    if data.name.trim().is_empty() {
        return Err(Error::Validation("Name is required".to_string()));
    }
    validate_email(&data.email)?;
    validate_password(&data.password)?;

    let contact: String = data.contact_number.chars().filter(|c| !c.is_whitespace()).collect();
    if !contact_regex().is_match(&contact) {
        return Err(Error::Validation("Please enter a valid contact number".to_string()));
    }

    if let Some(images) = &data.images {
        for upload in [&images.id_front, &images.id_back, &images.selfie] {
            if upload.bytes.is_empty() {
                return Err(Error::Validation(format!("{} is empty", upload.file_name)));
            }
        }
    }
    Ok(())
}

/// Check a password reset request
pub fn validate_reset(email: &str, otp: &str, new_password: &str) -> Result<()> {
    validate_email(email)?;
    if !otp_regex().is_match(otp.trim()) {
        return Err(Error::Validation("Please enter the code from your email".to_string()));
    }
    validate_password(new_password)
}
