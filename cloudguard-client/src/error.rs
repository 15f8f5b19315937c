use std::error::Error as StdError;
use std::io;

use cloudguard_api::models::FieldErrors;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Reason a request produced no response at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    ConnectionRefused,
    Generic,
}

impl NetworkErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            NetworkErrorKind::Timeout => {
                "Request timed out. The server is taking too long to respond."
            }
            NetworkErrorKind::ConnectionRefused => {
                "Connection refused. Please ensure the API server is running."
            }
            NetworkErrorKind::Generic => {
                "Network error. Please check your internet connection and that the API server is running."
            }
        }
    }

    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return NetworkErrorKind::Timeout;
        }

        if Self::is_connection_refused(err) {
            return NetworkErrorKind::ConnectionRefused;
        }

        NetworkErrorKind::Generic
    }

    fn is_connection_refused(err: &(dyn StdError + 'static)) -> bool {
        let mut current = Some(err);

        while let Some(err) = current {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                if io_err.kind() == io::ErrorKind::ConnectionRefused {
                    return true;
                }
            }

            let text = err.to_string().to_lowercase();
            if text.contains("connection refused") || text.contains("econnrefused") {
                return true;
            }

            current = err.source();
        }

        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Credential storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Credential file is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No data directory is available for credential storage")]
    NoLocation,
}

/// Normalized outcome of a failed API exchange.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{}", .kind.message())]
    Network {
        kind: NetworkErrorKind,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("{message}")]
    InvalidCredentials { message: String, errors: FieldErrors },

    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("{message}")]
    Unknown { message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn network(kind: NetworkErrorKind) -> Self {
        Self::Network { kind, source: None }
    }

    pub fn invalid_credentials<S: Into<String>>(message: S) -> Self {
        Self::InvalidCredentials {
            message: message.into(),
            errors: FieldErrors::new(),
        }
    }

    /// Builds a validation error whose message is the first field message.
    pub fn validation(errors: FieldErrors) -> Self {
        let message = errors
            .values()
            .flat_map(|messages| messages.iter())
            .next()
            .cloned()
            .unwrap_or_else(|| String::from("Validation failed"));

        Self::Validation { message, errors }
    }

    pub fn server<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    pub fn network_kind(&self) -> Option<NetworkErrorKind> {
        match self {
            ApiError::Network { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, ApiError::InvalidCredentials { .. })
    }

    /// Per-field errors, if the failure carries any.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::InvalidCredentials { errors, .. } | ApiError::Validation { errors, .. }
                if !errors.is_empty() =>
            {
                Some(errors)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ApiError::unknown(format!("Unexpected response from server: {err}"));
        }

        ApiError::Network {
            kind: NetworkErrorKind::classify(&err),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::unknown(format!("Unexpected response from server: {err}"))
    }
}
