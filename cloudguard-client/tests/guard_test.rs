use std::sync::Arc;

use cloudguard_client::api::LoginCredentials;
use cloudguard_client::{AppContext, GuardDecision, MemoryStorage, Route, RouteGuard};
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{TestSession, auth_body, settings, user_json};

/// Logs in through a fresh context whose refresh token is `"r"`.
async fn signed_in_context(server: &MockServer, storage: Arc<MemoryStorage>) -> AppContext {
    let mut body = auth_body(5, "token-5");
    body["refresh_token"] = json!("r");

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid refresh token"})),
        )
        .expect(1)
        .mount(server)
        .await;

    let context = AppContext::with_storage(&settings(server), storage).unwrap();
    context
        .session
        .login(LoginCredentials {
            email: "a@b.com".into(),
            password: "x".into(),
        })
        .await
        .unwrap();
    assert!(context.session.snapshot().is_authenticated());

    context
}

#[tokio::test]
async fn test_guard_redirects_after_check_auth() {
    let server = MockServer::start().await;
    let session = TestSession::new(&settings(&server));
    let mut guard = RouteGuard::new(session.store.subscribe());

    assert_eq!(guard.decide("/"), GuardDecision::Loading);

    session.store.check_auth().await;

    assert_eq!(
        guard.changed("/").await,
        Some(GuardDecision::Redirect(Route::Login))
    );
    assert_eq!(guard.decide("/auth/login"), GuardDecision::Allow);
}

#[tokio::test]
async fn test_guard_sends_authenticated_user_home() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/check-auth"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"authenticated": true, "user": user_json(1)})),
        )
        .mount(&server)
        .await;

    let session = TestSession::with_persisted(&settings(&server), "token-1", 1).await;
    let guard = RouteGuard::new(session.store.subscribe());

    session.store.check_auth().await;

    assert_eq!(
        guard.decide("/auth/register"),
        GuardDecision::Redirect(Route::Home)
    );
    assert_eq!(guard.decide("/notifications"), GuardDecision::Allow);
}

#[tokio::test]
async fn test_guard_follows_login_and_logout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body(1, "token-1")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Logged out"})))
        .mount(&server)
        .await;

    let session = TestSession::new(&settings(&server));
    let guard = RouteGuard::new(session.store.subscribe());

    session.store.check_auth().await;
    assert_eq!(
        guard.decide("/"),
        GuardDecision::Redirect(Route::Login)
    );

    session
        .store
        .login(cloudguard_client::api::LoginCredentials {
            email: "a@b.com".into(),
            password: "x".into(),
        })
        .await
        .unwrap();
    assert_eq!(guard.decide("/"), GuardDecision::Allow);
    assert_eq!(
        guard.decide("/auth/login"),
        GuardDecision::Redirect(Route::Home)
    );

    session.store.logout().await;
    assert_eq!(
        guard.decide("/"),
        GuardDecision::Redirect(Route::Login)
    );
}

#[tokio::test]
async fn test_bootstrap_on_fresh_install() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/check-auth"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = settings(&server);
    settings.storage.path = Some(
        dir.path()
            .join("credentials.json")
            .to_string_lossy()
            .into_owned(),
    );

    let context = AppContext::bootstrap(&settings).await.unwrap();

    assert!(!context.session.snapshot().is_authenticated());
    assert_eq!(
        context.guard().decide("/"),
        GuardDecision::Redirect(Route::Login)
    );
    assert_eq!(context.notifications.snapshot().unread_count, 0);
}

#[tokio::test]
async fn test_rejected_notification_fetch_ends_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let context = signed_in_context(&server, storage.clone()).await;

    let err = context.notifications.fetch().await.unwrap_err();

    assert!(err.is_invalid_credentials());
    assert!(context.notifications.snapshot().error.is_some());
    assert!(!context.session.snapshot().is_authenticated());
    assert_eq!(
        context.guard().decide("/"),
        GuardDecision::Redirect(Route::Login)
    );
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_rejected_weather_fetch_ends_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex("^/api/weather"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let context = signed_in_context(&server, storage.clone()).await;

    let err = context.weather.fetch(52.52, 13.41).await.unwrap_err();

    assert!(err.is_invalid_credentials());
    assert!(!context.session.snapshot().is_authenticated());
    assert!(storage.is_empty().await);
}
