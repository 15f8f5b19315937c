use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name to the list of messages reported for it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Body of every non-success response.
///
/// `errors` is present for validation failures (422) and may be present for
/// authentication failures (401). `error_id` correlates internal errors with
/// the server log.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
}

impl ErrorResponse {
    /// First message of the first field, in field order.
    pub fn first_field_message(&self) -> Option<&str> {
        self.errors
            .as_ref()?
            .values()
            .flat_map(|messages| messages.iter())
            .map(String::as_str)
            .next()
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_field_message_follows_field_order() {
        let mut errors = FieldErrors::new();
        errors.insert("password".into(), vec!["Too short".into()]);
        errors.insert("email".into(), vec!["Taken".into(), "Invalid".into()]);

        let body = ErrorResponse {
            message: Some("The given data was invalid.".into()),
            errors: Some(errors),
            error_id: None,
        };

        assert_eq!(body.first_field_message(), Some("Taken"));
    }

    #[test]
    fn test_error_body_without_errors() {
        let body: ErrorResponse = serde_json::from_str(r#"{"message":"Invalid credentials"}"#).unwrap();

        assert_eq!(body.message.as_deref(), Some("Invalid credentials"));
        assert!(body.errors.is_none());
        assert!(body.first_field_message().is_none());
    }
}
