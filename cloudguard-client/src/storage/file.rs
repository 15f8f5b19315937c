use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{CredentialKey, CredentialStore};
use crate::error::StorageError;

const APP_DIR: &str = "cloudguard";
const FILE_NAME: &str = "credentials.json";

/// Credentials kept in a JSON document readable only by the current user.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// target, so readers observe either the old or the new document.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Opens the store in the platform data directory.
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf, StorageError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
            .ok_or(StorageError::NoLocation)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Loads the document for modification, discarding it if unreadable.
    async fn load_for_update(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.load().await {
            Err(StorageError::Serialization(err)) => {
                tracing::warn!(path = ?self.path, "discarding malformed credential file: {}", err);
                Ok(BTreeMap::new())
            }
            result => result,
        }
    }

    async fn persist(&self, data: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        write_private(&temp_path, &serde_json::to_vec(data)?).await?;
        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

/// Writes `bytes` to a freshly created file that only the owner can read.
///
/// A leftover file at `path` is removed first, since the creation mode is
/// not applied to files that already exist.
async fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Err(err) = fs::remove_file(path).await {
        if err.kind() != io::ErrorKind::NotFound {
            return Err(err);
        }
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;

    Ok(())
}

#[async_trait]
impl CredentialStore for FileStorage {
    async fn get_item(&self, key: CredentialKey) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key.as_str()))
    }

    async fn set_item(&self, key: CredentialKey, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;

        let mut data = self.load_for_update().await?;
        data.insert(key.as_str().to_string(), value.to_string());

        self.persist(&data).await
    }

    async fn remove_item(&self, key: CredentialKey) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;

        let mut data = self.load_for_update().await?;
        if data.remove(key.as_str()).is_none() {
            return Ok(());
        }

        self.persist(&data).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;

        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
