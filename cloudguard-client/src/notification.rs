use std::sync::Arc;

use cloudguard_api::models::{Id, NotificationResponse};
use tokio::sync::watch;

use crate::api::ApiClient;
use crate::error::{ApiError, Result};
use crate::session::SessionStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationState {
    pub notifications: Vec<NotificationResponse>,
    pub unread_count: usize,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl NotificationState {
    fn with(notifications: Vec<NotificationResponse>) -> Self {
        let unread_count = notifications.iter().filter(|n| !n.is_read).count();

        Self {
            notifications,
            unread_count,
            is_loading: false,
            error: None,
        }
    }
}

/// Notification inbox mirrored from the backend.
pub struct NotificationStore {
    api: ApiClient,
    state: watch::Sender<NotificationState>,
    session: Option<Arc<SessionStore>>,
}

impl NotificationStore {
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(NotificationState::default());

        Self {
            api,
            state,
            session: None,
        }
    }

    /// Ends `session` whenever the server rejects the credentials.
    pub fn with_session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn snapshot(&self) -> NotificationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.state.subscribe()
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    async fn fail(&self, error: ApiError) -> ApiError {
        tracing::warn!("notification action failed: {}", error);
        self.state.send_modify(|state| {
            state.is_loading = false;
            state.error = Some(error.to_string());
        });

        if error.is_invalid_credentials() {
            if let Some(session) = &self.session {
                session.invalidate().await;
            }
        }

        error
    }

    /// Applies `update` to the current list after a successful request.
    fn apply<F>(&self, update: F)
    where
        F: FnOnce(Vec<NotificationResponse>) -> Vec<NotificationResponse>,
    {
        let notifications = update(self.snapshot().notifications);
        self.state.send_replace(NotificationState::with(notifications));
    }

    pub async fn fetch(&self) -> Result<()> {
        self.begin();

        match self.api.notifications().await {
            Ok(notifications) => {
                self.state.send_replace(NotificationState::with(notifications));
                Ok(())
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    pub async fn mark_as_read(&self, id: Id) -> Result<()> {
        self.begin();

        match self.api.mark_notification_read(id).await {
            Ok(()) => {
                self.apply(|notifications| {
                    notifications
                        .into_iter()
                        .map(|mut n| {
                            if n.id == id {
                                n.is_read = true;
                            }
                            n
                        })
                        .collect()
                });
                Ok(())
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    pub async fn mark_all_as_read(&self) -> Result<()> {
        self.begin();

        match self.api.mark_all_notifications_read().await {
            Ok(()) => {
                self.apply(|notifications| {
                    notifications
                        .into_iter()
                        .map(|mut n| {
                            n.is_read = true;
                            n
                        })
                        .collect()
                });
                Ok(())
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    pub async fn delete(&self, id: Id) -> Result<()> {
        self.begin();

        match self.api.delete_notification(id).await {
            Ok(()) => {
                self.apply(|notifications| {
                    notifications.into_iter().filter(|n| n.id != id).collect()
                });
                Ok(())
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.begin();

        match self.api.clear_notifications().await {
            Ok(()) => {
                self.apply(|_| Vec::new());
                Ok(())
            }
            Err(err) => Err(self.fail(err).await),
        }
    }
}
