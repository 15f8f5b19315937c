use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CredentialKey, CredentialStore};
use crate::error::StorageError;

/// Process-local store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<CredentialKey, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStorage {
    async fn get_item(&self, key: CredentialKey) -> Result<Option<String>, StorageError> {
        Ok(self.data.read().await.get(&key).cloned())
    }

    async fn set_item(&self, key: CredentialKey, value: &str) -> Result<(), StorageError> {
        self.data.write().await.insert(key, value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: CredentialKey) -> Result<(), StorageError> {
        self.data.write().await.remove(&key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.data.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let storage = MemoryStorage::new();

        storage.set_item(CredentialKey::Token, "abc").await.unwrap();
        assert_eq!(
            storage.get_item(CredentialKey::Token).await.unwrap(),
            Some("abc".to_string())
        );

        storage.remove_item(CredentialKey::Token).await.unwrap();
        assert!(storage.get_item(CredentialKey::Token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let storage = MemoryStorage::new();

        storage.set_item(CredentialKey::Token, "abc").await.unwrap();
        storage.set_item(CredentialKey::User, "{}").await.unwrap();

        storage.clear().await.unwrap();

        assert!(storage.is_empty().await);
    }
}
