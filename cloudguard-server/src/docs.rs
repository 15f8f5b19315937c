//! OpenAPI document for the HTTP API, served at `/api/openapi.json`.

use axum::Json;
use cloudguard_api::models::*;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handles;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "CloudGuard API",
        description = "Accounts, notifications and weather for the CloudGuard companion app."
    ),
    paths(
        handles::ping,
        handles::register,
        handles::login,
        handles::refresh_token,
        handles::logout,
        handles::check_auth,
        handles::forgot_password,
        handles::reset_password,
        handles::verify_email,
        handles::resend_verification,
        handles::update_profile,
        handles::change_password,
        handles::get_notifications,
        handles::mark_notification_read,
        handles::mark_all_notifications_read,
        handles::delete_notification,
        handles::clear_notifications,
        handles::get_weather,
    ),
    components(schemas(
        User,
        LoginRequest,
        RegisterRequest,
        AuthResponse,
        RefreshRequest,
        RefreshResponse,
        CheckAuthResponse,
        ForgotPasswordRequest,
        ResetPasswordRequest,
        VerifyEmailRequest,
        ResendVerificationRequest,
        UpdateProfileRequest,
        ProfileResponse,
        ChangePasswordRequest,
        ErrorResponse,
        MessageResponse,
        NotificationKind,
        Severity,
        NotificationResponse,
        CurrentWeather,
        WeatherForecast,
        WeatherResponse,
    )),
    tags(
        (name = "auth", description = "Accounts and sessions"),
        (name = "notification", description = "Per-user notifications"),
        (name = "weather", description = "Cached weather proxy")
    )
)]
pub struct ApiDoc;

pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/login",
            "/api/check-auth",
            "/api/notifications/{id}/read",
            "/api/weather",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
