//! Form checks performed before any request leaves the device.

use cloudguard_api::models::FieldErrors;

use crate::api::{LoginCredentials, RegisterCredentials};
use crate::error::{ApiError, Result};

pub const MIN_PASSWORD_LENGTH: usize = 8;

fn reject(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn into_result(errors: FieldErrors) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(errors))
    }
}

fn check_new_password(errors: &mut FieldErrors, password: &str, confirmation: &str) {
    if password.is_empty() {
        reject(errors, "password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        reject(errors, "password", "Password must be at least 8 characters");
    }

    if confirmation.is_empty() {
        reject(errors, "password_confirmation", "Please confirm your password");
    } else if password != confirmation {
        reject(errors, "password_confirmation", "Passwords do not match");
    }
}

pub fn validate_login(credentials: &LoginCredentials) -> Result<()> {
    let mut errors = FieldErrors::new();

    if credentials.email.trim().is_empty() {
        reject(&mut errors, "email", "Email is required");
    }
    if credentials.password.is_empty() {
        reject(&mut errors, "password", "Password is required");
    }

    into_result(errors)
}

pub fn validate_registration(credentials: &RegisterCredentials) -> Result<()> {
    let mut errors = FieldErrors::new();

    if credentials.name.trim().is_empty() {
        reject(&mut errors, "name", "Name is required");
    }
    if credentials.email.trim().is_empty() {
        reject(&mut errors, "email", "Email is required");
    }
    check_new_password(
        &mut errors,
        &credentials.password,
        &credentials.password_confirmation,
    );

    into_result(errors)
}

pub fn validate_email(email: &str) -> Result<()> {
    let mut errors = FieldErrors::new();

    if email.trim().is_empty() {
        reject(&mut errors, "email", "Email is required");
    }

    into_result(errors)
}

pub fn validate_password_change(password: &str, confirmation: &str) -> Result<()> {
    let mut errors = FieldErrors::new();
    check_new_password(&mut errors, password, confirmation);
    into_result(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(password: &str, confirmation: &str) -> RegisterCredentials {
        RegisterCredentials {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: password.into(),
            password_confirmation: confirmation.into(),
            avatar: None,
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(validate_registration(&registration("password123", "password123")).is_ok());
    }

    #[test]
    fn test_mismatched_confirmation() {
        let err = validate_registration(&registration("password123", "password321")).unwrap_err();

        let errors = err.field_errors().unwrap();
        assert_eq!(
            errors["password_confirmation"],
            vec!["Passwords do not match".to_string()]
        );
        assert!(!errors.contains_key("password"));
    }

    #[test]
    fn test_short_password() {
        let err = validate_registration(&registration("short", "short")).unwrap_err();

        assert_eq!(err.to_string(), "Password must be at least 8 characters");
    }

    #[test]
    fn test_empty_registration_reports_every_field() {
        let err = validate_registration(&RegisterCredentials::default()).unwrap_err();

        let errors = err.field_errors().unwrap();
        for field in ["name", "email", "password", "password_confirmation"] {
            assert!(errors.contains_key(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_login_requires_both_fields() {
        let err = validate_login(&LoginCredentials {
            email: " ".into(),
            password: String::new(),
        })
        .unwrap_err();

        let errors = err.field_errors().unwrap();
        assert_eq!(errors["email"], vec!["Email is required".to_string()]);
        assert_eq!(errors["password"], vec!["Password is required".to_string()]);
    }
}
