//! Input validation for API requests.
//!
//! This module provides validation functions for API request data,
//! ensuring all inputs meet the required format and constraints.
//!
//! For collecting multiple validation errors and returning them as an ApiError,
//! use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::models::{AMENITIES, CLASS_TYPES};

lazy_static! {
    /// Regex for validating email addresses
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^\s@]+@[^\s@]+\.[^\s@]+$"
    ).unwrap();

    /// Regex for validating mobile numbers (E.164, optional leading +)
    static ref MOBILE_REGEX: Regex = Regex::new(
        r"^\+?[1-9]\d{1,14}$"
    ).unwrap();

    /// Regex for validating train numbers (alphanumeric with dashes, 2-20 chars)
    static ref TRAIN_NUMBER_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?$"
    ).unwrap();

    /// Regex for validating OTP codes (exactly 6 digits)
    static ref OTP_REGEX: Regex = Regex::new(
        r"^\d{6}$"
    ).unwrap();
}

/// Validate a person's name (user or passenger)
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required".to_string());
    }

    if name.len() < 2 {
        return Err("Name is too short (min 2 characters)".to_string());
    }

    if name.len() > 50 {
        return Err("Name is too long (max 50 characters)".to_string());
    }

    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a mobile number
pub fn validate_mobile(mobile: &str) -> Result<(), String> {
    if mobile.is_empty() {
        return Err("Mobile number is required".to_string());
    }

    if !MOBILE_REGEX.is_match(mobile) {
        return Err("Invalid mobile number format".to_string());
    }

    Ok(())
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 6 {
        return Err("Password must be at least 6 characters".to_string());
    }

    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }

    Ok(())
}

/// Validate an OTP code
pub fn validate_otp(otp: &str) -> Result<(), String> {
    if otp.is_empty() {
        return Err("OTP is required".to_string());
    }

    if !OTP_REGEX.is_match(otp) {
        return Err("OTP must be exactly 6 digits".to_string());
    }

    Ok(())
}

/// Validate a train name
pub fn validate_train_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Train name is required".to_string());
    }

    if name.len() < 2 {
        return Err("Train name is too short (min 2 characters)".to_string());
    }

    if name.len() > 100 {
        return Err("Train name is too long (max 100 characters)".to_string());
    }

    Ok(())
}

/// Validate a train number
pub fn validate_train_number(number: &str) -> Result<(), String> {
    if number.is_empty() {
        return Err("Train number is required".to_string());
    }

    if number.len() < 2 {
        return Err("Train number is too short (min 2 characters)".to_string());
    }

    if number.len() > 20 {
        return Err("Train number is too long (max 20 characters)".to_string());
    }

    if !TRAIN_NUMBER_REGEX.is_match(number) {
        return Err("Train number must be alphanumeric with optional dashes".to_string());
    }

    Ok(())
}

/// Validate a station name (origin or destination)
pub fn validate_station(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if value.len() < 2 {
        return Err(format!("{} is too short (min 2 characters)", field_name));
    }

    if value.len() > 50 {
        return Err(format!("{} is too long (max 50 characters)", field_name));
    }

    Ok(())
}

/// Validate a total seat count
pub fn validate_seats(seats: i64) -> Result<(), String> {
    if seats < 1 {
        return Err("Seats must be at least 1".to_string());
    }

    if seats > 1000 {
        return Err("Seats is too high (max 1000)".to_string());
    }

    Ok(())
}

/// Validate a fare class label against the accepted set
pub fn validate_class_type(class_type: &str) -> Result<(), String> {
    if class_type.is_empty() {
        return Err("Class type is required".to_string());
    }

    if !CLASS_TYPES.contains(&class_type) {
        return Err(format!(
            "Invalid class type. Must be one of: {}",
            CLASS_TYPES.join(", ")
        ));
    }

    Ok(())
}

/// Validate a list of amenity tags
pub fn validate_amenities(amenities: &[String]) -> Result<(), String> {
    for amenity in amenities {
        if !AMENITIES.contains(&amenity.as_str()) {
            return Err(format!(
                "Invalid amenity \"{}\". Must be one of: {}",
                amenity,
                AMENITIES.join(", ")
            ));
        }
    }

    Ok(())
}

/// Validate a UUID string
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("Invalid {} format", field_name));
    }

    Ok(())
}
