//! Authentication session lifecycle.
//!
//! [`SessionStore`] owns the in-memory [`Session`] and the persisted
//! credential pair (`token`, `user`). Every transition publishes one complete
//! replacement of the session through a watch channel, so observers never see
//! an authenticated session without its user and token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use cloudguard_api::models::{
    ChangePasswordRequest, FieldErrors, ResetPasswordRequest, UpdateProfileRequest, User,
};
use tokio::sync::watch;

use crate::api::{ApiClient, AuthSession, LoginCredentials, RegisterCredentials};
use crate::error::{ApiError, Result, StorageError};
use crate::storage::{CredentialKey, CredentialStore};
use crate::validation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Persisted credentials have not been checked yet
    Unknown,
    Authenticated { user: User, token: String },
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    auth: AuthState,
    loading: bool,
    error: Option<String>,
    field_errors: FieldErrors,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            auth: AuthState::Unknown,
            loading: true,
            error: None,
            field_errors: FieldErrors::new(),
        }
    }
}

impl Session {
    fn settled(auth: AuthState) -> Self {
        Self {
            auth,
            loading: false,
            error: None,
            field_errors: FieldErrors::new(),
        }
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    pub fn user(&self) -> Option<&User> {
        match &self.auth {
            AuthState::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match &self.auth {
            AuthState::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated { .. })
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    /// First message reported for `field`.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
        self.field_errors.clear();
    }

    /// Field errors take precedence over the generic message.
    fn fail(&mut self, error: &ApiError) {
        self.loading = false;

        if self.auth == AuthState::Unknown {
            self.auth = AuthState::Unauthenticated;
        }

        match error.field_errors() {
            Some(errors) => {
                self.error = None;
                self.field_errors = errors.clone();
            }
            None => {
                self.error = Some(error.to_string());
                self.field_errors.clear();
            }
        }
    }
}

pub struct SessionStore {
    api: ApiClient,
    storage: Arc<dyn CredentialStore>,
    state: watch::Sender<Session>,
    checking: AtomicBool,
    /// Bumped on every published auth transition.
    generation: AtomicU64,
}

/// Releases the in-flight flag of an auth check, also when the check future
/// is dropped before it completes.
struct CheckGuard<'a> {
    store: &'a SessionStore,
    generation: u64,
    settled: bool,
}

impl Drop for CheckGuard<'_> {
    fn drop(&mut self) {
        if !self.settled && self.store.is_current(self.generation) {
            tracing::debug!("auth check cancelled, settling session");
            self.store.state.send_modify(|session| {
                session.loading = false;
                if session.auth == AuthState::Unknown {
                    session.auth = AuthState::Unauthenticated;
                }
            });
        }

        self.store.checking.store(false, Ordering::Release);
    }
}

impl SessionStore {
    pub fn new(api: ApiClient) -> Self {
        let storage = api.storage().clone();
        let (state, _) = watch::channel(Session::default());

        Self {
            api,
            storage,
            state,
            checking: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|session| {
            session.error = None;
            session.field_errors.clear();
        });
    }

    fn begin(&self) {
        self.state.send_modify(Session::begin);
    }

    fn finish(&self) {
        self.state.send_modify(|session| session.loading = false);
    }

    fn publish(&self, session: Session) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.state.send_replace(session);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    fn fail(&self, error: ApiError) -> ApiError {
        tracing::warn!("session action failed: {}", error);
        self.state.send_modify(|session| session.fail(&error));
        error
    }

    /// Resolves the persisted credential pair into a settled session.
    ///
    /// A call made while another check is in flight returns immediately.
    /// Failures never surface as errors; the session settles as logged out.
    /// A login or logout that lands while the check is running wins over its
    /// result.
    pub async fn check_auth(&self) {
        if self.checking.swap(true, Ordering::AcqRel) {
            tracing::debug!("auth check already in flight, skipping");
            return;
        }

        let mut guard = CheckGuard {
            store: self,
            generation: self.generation.load(Ordering::Acquire),
            settled: false,
        };

        self.begin();
        let auth = self.resolve_persisted(guard.generation).await;
        let authenticated = matches!(auth, AuthState::Authenticated { .. });

        if self.is_current(guard.generation) {
            tracing::info!(authenticated, "auth check finished");
            self.publish(Session::settled(auth));
        } else {
            tracing::debug!(authenticated, "session changed during auth check, dropping result");
        }

        guard.settled = true;
    }

    async fn resolve_persisted(&self, generation: u64) -> AuthState {
        let token = self.storage.get_item(CredentialKey::Token).await;
        let user = self.storage.get_item(CredentialKey::User).await;

        let (token, user) = match (token, user) {
            (Ok(Some(token)), Ok(Some(user))) => (token, user),
            (Ok(None), Ok(None)) => return AuthState::Unauthenticated,
            (Ok(_), Ok(_)) => {
                tracing::warn!("persisted credentials are incomplete, discarding");
                self.discard(generation).await;
                return AuthState::Unauthenticated;
            }
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!("failed to read persisted credentials: {}", err);
                return AuthState::Unauthenticated;
            }
        };

        let user: User = match serde_json::from_str(&user) {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!("persisted user is malformed, discarding: {}", err);
                self.discard(generation).await;
                return AuthState::Unauthenticated;
            }
        };

        match self.api.check_auth().await {
            Ok(response) if response.authenticated => {
                let user = match response.user {
                    Some(fresh) if fresh != user && self.is_current(generation) => {
                        if let Err(err) = self.persist_user(&fresh).await {
                            tracing::warn!("failed to refresh persisted user: {}", err);
                        }
                        fresh
                    }
                    _ => user,
                };

                // A refresh during the check may have replaced the token.
                let token = self.current_token(token).await;

                AuthState::Authenticated { user, token }
            }
            Ok(_) => {
                tracing::info!("persisted token rejected by server");
                self.discard(generation).await;
                AuthState::Unauthenticated
            }
            Err(err) if err.is_invalid_credentials() => {
                tracing::info!("persisted token is no longer valid: {}", err);
                self.discard(generation).await;
                AuthState::Unauthenticated
            }
            Err(err) => {
                tracing::warn!("auth check failed, continuing logged out: {}", err);
                AuthState::Unauthenticated
            }
        }
    }

    pub async fn login(&self, credentials: LoginCredentials) -> Result<()> {
        self.begin();

        if let Err(err) = validation::validate_login(&credentials) {
            return Err(self.fail(err));
        }

        match self.api.login(&credentials).await {
            Ok(session) => self.establish(session).await,
            Err(err) => Err(self.fail(err)),
        }
    }

    pub async fn register(&self, credentials: RegisterCredentials) -> Result<()> {
        self.begin();

        if let Err(err) = validation::validate_registration(&credentials) {
            return Err(self.fail(err));
        }

        match self.api.register(&credentials).await {
            Ok(session) => self.establish(session).await,
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn establish(&self, session: AuthSession) -> Result<()> {
        let persisted = async {
            self.storage
                .set_item(CredentialKey::Token, &session.token)
                .await?;
            self.persist_user(&session.user).await
        }
        .await;

        if let Err(err) = persisted {
            self.forget().await;
            return Err(self.fail(err.into()));
        }

        tracing::info!(user_id = session.user.id, "session established");
        self.publish(Session::settled(AuthState::Authenticated {
            user: session.user,
            token: session.token,
        }));

        Ok(())
    }

    /// Ends the session. Local state is always cleared, whatever the server
    /// answers.
    pub async fn logout(&self) {
        self.begin();

        if let Err(err) = self.api.logout().await {
            tracing::warn!("remote logout failed: {}", err);
        }

        self.forget().await;
        self.publish(Session::settled(AuthState::Unauthenticated));

        tracing::info!("session cleared");
    }

    /// Ends an authenticated session whose credentials the server rejected.
    ///
    /// Stores sharing the [`ApiClient`] call this when a request fails with
    /// `InvalidCredentials`, so the guard stops allowing protected routes.
    pub async fn invalidate(&self) {
        if !self.snapshot().is_authenticated() {
            return;
        }

        tracing::info!("credentials invalidated by server, logging out");
        self.forget().await;
        self.publish(Session::settled(AuthState::Unauthenticated));
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        self.begin();

        let result = match validation::validate_email(email) {
            Ok(()) => self.api.forgot_password(email).await,
            Err(err) => Err(err),
        };

        self.settle(result)
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<()> {
        self.begin();

        let result = match validation::validate_password_change(
            &request.password,
            &request.password_confirmation,
        ) {
            Ok(()) => self.api.reset_password(&request).await,
            Err(err) => Err(err),
        };

        self.settle(result)
    }

    /// Confirms an e-mail address, then reloads the signed-in user.
    ///
    /// The token may belong to another account, so the cached user is only
    /// replaced with what the server reports for the current session.
    pub async fn verify_email(&self, token: &str) -> Result<()> {
        self.begin();

        if let Err(err) = self.api.verify_email(token).await {
            return Err(self.fail(err));
        }

        let Some(bearer) = self.snapshot().token().map(str::to_string) else {
            self.finish();
            return Ok(());
        };

        let fresh = match self.api.check_auth().await {
            Ok(response) if response.authenticated => response.user,
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("failed to reload user after verification: {}", err);
                None
            }
        };

        match fresh {
            Some(user) => {
                let bearer = self.current_token(bearer).await;
                self.replace_user(user, bearer).await
            }
            None => {
                self.finish();
                Ok(())
            }
        }
    }

    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        self.begin();

        let result = match validation::validate_email(email) {
            Ok(()) => self.api.resend_verification(email).await,
            Err(err) => Err(err),
        };

        self.settle_authenticated(result).await
    }

    /// Replaces the user record and re-persists it; the token is untouched.
    pub async fn update_profile(&self, request: UpdateProfileRequest) -> Result<()> {
        self.begin();

        let token = match self.snapshot().token() {
            Some(token) => token.to_string(),
            None => return Err(self.fail(ApiError::invalid_credentials("Unauthenticated."))),
        };

        match self.api.update_profile(&request).await {
            Ok(user) => self.replace_user(user, token).await,
            Err(err) => self.settle_authenticated(Err(err)).await,
        }
    }

    pub async fn change_password(&self, request: ChangePasswordRequest) -> Result<()> {
        self.begin();

        let result = match validation::validate_password_change(
            &request.password,
            &request.password_confirmation,
        ) {
            Ok(()) => self.api.change_password(&request).await,
            Err(err) => Err(err),
        };

        self.settle_authenticated(result).await
    }

    async fn replace_user(&self, user: User, token: String) -> Result<()> {
        if let Err(err) = self.persist_user(&user).await {
            return Err(self.fail(err.into()));
        }

        self.publish(Session::settled(AuthState::Authenticated { user, token }));

        Ok(())
    }

    fn settle(&self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.finish();
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Like [`Self::settle`], but a rejected token ends the session.
    async fn settle_authenticated(&self, result: Result<()>) -> Result<()> {
        match result {
            Err(err) if err.is_invalid_credentials() && self.snapshot().is_authenticated() => {
                self.invalidate().await;
                Err(err)
            }
            result => self.settle(result),
        }
    }

    async fn persist_user(&self, user: &User) -> Result<(), StorageError> {
        let json = serde_json::to_string(user)?;
        self.storage.set_item(CredentialKey::User, &json).await
    }

    /// The persisted token, falling back to `token` when none can be read.
    async fn current_token(&self, token: String) -> String {
        match self.storage.get_item(CredentialKey::Token).await {
            Ok(Some(current)) => current,
            _ => token,
        }
    }

    /// Clears the credentials unless another transition replaced them since
    /// `generation`.
    async fn discard(&self, generation: u64) {
        if self.is_current(generation) {
            self.forget().await;
        } else {
            tracing::debug!("credentials replaced during auth check, keeping them");
        }
    }

    async fn forget(&self) {
        if let Err(err) = self.storage.clear().await {
            tracing::warn!("failed to clear persisted credentials: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn user() -> User {
        User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: None,
            avatar: None,
            email_verified_at: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_initial_session_is_loading_and_unknown() {
        let session = Session::default();

        assert_eq!(session.auth_state(), &AuthState::Unknown);
        assert!(session.is_loading());
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[test]
    fn test_authenticated_session_exposes_user_and_token() {
        let session = Session::settled(AuthState::Authenticated {
            user: user(),
            token: "abc".into(),
        });

        assert!(session.is_authenticated());
        assert_eq!(session.user().map(|u| u.id), Some(1));
        assert_eq!(session.token(), Some("abc"));
        assert!(!session.is_loading());
    }

    #[test]
    fn test_fail_prefers_field_errors() {
        let mut errors = FieldErrors::new();
        errors.insert("email".into(), vec!["Unknown email".into()]);

        let mut session = Session::default();
        session.begin();
        session.fail(&ApiError::InvalidCredentials {
            message: "Invalid credentials".into(),
            errors,
        });

        assert!(session.error().is_none());
        assert_eq!(session.field_error("email"), Some("Unknown email"));
        assert_eq!(session.auth_state(), &AuthState::Unauthenticated);
        assert!(!session.is_loading());
    }

    #[test]
    fn test_fail_keeps_authenticated_state() {
        let mut session = Session::settled(AuthState::Authenticated {
            user: user(),
            token: "abc".into(),
        });

        session.begin();
        session.fail(&ApiError::server(500, "Internal server error"));

        assert!(session.is_authenticated());
        assert_eq!(session.error(), Some("Internal server error"));
    }

    #[test]
    fn test_begin_clears_previous_errors() {
        let mut session = Session::settled(AuthState::Unauthenticated);
        session.fail(&ApiError::invalid_credentials("Invalid credentials"));

        session.begin();

        assert!(session.error().is_none());
        assert!(session.field_errors().is_empty());
        assert!(session.is_loading());
    }
}
