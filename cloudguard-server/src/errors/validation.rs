use cloudguard_api::models::FieldErrors;

/// Per-field input errors, answered with 422.
#[derive(Debug, Default, thiserror::Error)]
#[error("{}", first_message(.errors))]
pub struct ValidationError {
    errors: FieldErrors,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut error = Self::new();
        error.add(field, message);
        error
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// The first field message, like Laravel's 422 summary.
    pub fn message(&self) -> String {
        first_message(&self.errors)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn first_message(errors: &FieldErrors) -> String {
    errors
        .values()
        .flat_map(|messages| messages.first())
        .next()
        .cloned()
        .unwrap_or_else(|| String::from("The given data was invalid."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_first_field_message() {
        let mut error = ValidationError::new();
        error.add("password", "The password field is required.");
        error.add("email", "The email field is required.");

        // Fields are ordered by name.
        assert_eq!(error.message(), "The email field is required.");
        assert_eq!(error.errors().len(), 2);
    }

    #[test]
    fn test_empty_validation_passes() {
        assert!(ValidationError::new().into_result().is_ok());
        assert!(ValidationError::field("name", "Required").into_result().is_err());
    }
}
