//! Buyer contact details and their validation rules.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Contact details captured on every order.
///
/// Required even for authenticated buyers: the order keeps its own
/// snapshot so later profile edits do not rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub phone_number: String,
    pub email: String,
}

impl ContactInfo {
    /// Creates contact info from its parts.
    pub fn new(
        name: impl Into<String>,
        phone_number: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone_number: phone_number.into(),
            email: email.into(),
        }
    }

    /// Validates all fields, reporting the first offending one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() || !self.name.chars().all(char::is_alphabetic) {
            return Err(ValidationError::new("name", "Incorrect name format."));
        }
        if !is_valid_phone_number(&self.phone_number) {
            return Err(ValidationError::new(
                "phone_number",
                "Incorrect phone number format.",
            ));
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationError::new("email", "Incorrect email format."));
        }
        Ok(())
    }
}

/// Accepts 11 digits, or `+` followed by 11 digits.
pub fn is_valid_phone_number(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let plain = phone.len() == 11 && digits.len() == 11;
    let prefixed = phone.len() == 12 && digits.len() == 11;
    (plain || prefixed) && digits.chars().all(|c| c.is_ascii_digit())
}

/// Accepts exactly 16 digits.
pub fn is_valid_card_number(card_number: &str) -> bool {
    card_number.len() == 16 && card_number.chars().all(|c| c.is_ascii_digit())
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, phone: &str, email: &str) -> ContactInfo {
        ContactInfo::new(name, phone, email)
    }

    #[test]
    fn test_valid_contact() {
        assert!(contact("Alice", "79001234567", "alice@example.com")
            .validate()
            .is_ok());
        assert!(contact("Alice", "+79001234567", "alice@example.com")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_phone_number_formats() {
        assert!(is_valid_phone_number("79001234567"));
        assert!(is_valid_phone_number("+79001234567"));
        assert!(!is_valid_phone_number("7900123456"));
        assert!(!is_valid_phone_number("790012345678"));
        assert!(!is_valid_phone_number("+7900123456"));
        assert!(!is_valid_phone_number("7900123456a"));
        assert!(!is_valid_phone_number("++9001234567"));
    }

    #[test]
    fn test_name_must_be_alphabetic() {
        let err = contact("Alice3", "79001234567", "a@b.c")
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "name");

        let err = contact("", "79001234567", "a@b.c").validate().unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn test_phone_field_reported() {
        let err = contact("Alice", "123", "a@b.c").validate().unwrap_err();
        assert_eq!(err.field, "phone_number");
    }

    #[test]
    fn test_email_needs_both_sides() {
        assert!(contact("Alice", "79001234567", "alice@").validate().is_err());
        assert!(contact("Alice", "79001234567", "@example.com")
            .validate()
            .is_err());
        assert!(contact("Alice", "79001234567", "no-at-sign")
            .validate()
            .is_err());
    }

    #[test]
    fn test_card_number_format() {
        assert!(is_valid_card_number("1234567812345678"));
        assert!(!is_valid_card_number("123456781234567"));
        assert!(!is_valid_card_number("12345678123456789"));
        assert!(!is_valid_card_number("123456781234567x"));
    }
}
