mod file;
mod memory;

pub use file::*;
pub use memory::*;

use std::fmt;

use async_trait::async_trait;

use crate::error::StorageError;

/// Keys persisted by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    /// Bearer token of the current session
    Token,
    /// JSON-serialized [`cloudguard_api::models::User`]
    User,
    /// Opaque token used once to renew an expired bearer token
    RefreshToken,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 3] = [
        CredentialKey::Token,
        CredentialKey::User,
        CredentialKey::RefreshToken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::Token => "token",
            CredentialKey::User => "user",
            CredentialKey::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable key-value storage for session credentials.
///
/// Every operation is atomic on its own. Writing several keys is not: a
/// failure between two writes can leave the pair inconsistent, which readers
/// must tolerate.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_item(&self, key: CredentialKey) -> Result<Option<String>, StorageError>;

    async fn set_item(&self, key: CredentialKey, value: &str) -> Result<(), StorageError>;

    async fn remove_item(&self, key: CredentialKey) -> Result<(), StorageError>;

    async fn clear(&self) -> Result<(), StorageError> {
        for key in CredentialKey::ALL {
            self.remove_item(key).await?;
        }

        Ok(())
    }
}
