use std::sync::Arc;

use crate::api::ApiClient;
use crate::error::Result;
use crate::guard::RouteGuard;
use crate::notification::NotificationStore;
use crate::session::SessionStore;
use crate::settings::Settings;
use crate::storage::{CredentialStore, FileStorage};
use crate::weather::WeatherStore;

/// Everything the navigation root needs, created once at startup.
pub struct AppContext {
    pub session: Arc<SessionStore>,
    pub notifications: NotificationStore,
    pub weather: WeatherStore,
}

impl AppContext {
    /// Opens the credential file and resolves the persisted session.
    pub async fn bootstrap(settings: &Settings) -> Result<Self> {
        let storage = match settings.storage_path() {
            Some(path) => FileStorage::new(path),
            None => FileStorage::open_default()?,
        };
        tracing::debug!(path = ?storage.path(), "using credential file");

        let context = Self::with_storage(settings, Arc::new(storage))?;
        context.session.check_auth().await;

        Ok(context)
    }

    /// Builds the stores without touching the network.
    pub fn with_storage(settings: &Settings, storage: Arc<dyn CredentialStore>) -> Result<Self> {
        let api = ApiClient::new(settings, storage)?;

        let session = Arc::new(SessionStore::new(api.clone()));

        Ok(Self {
            notifications: NotificationStore::new(api.clone()).with_session(session.clone()),
            weather: WeatherStore::new(api).with_session(session.clone()),
            session,
        })
    }

    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.session.subscribe())
    }
}
