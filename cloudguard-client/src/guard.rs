use tokio::sync::watch;

use crate::session::Session;

const AUTH_SECTION: &str = "/auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/auth/login",
            Route::Home => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show a loading indicator, do not navigate
    Loading,
    /// Render the requested location
    Allow,
    Redirect(Route),
}

/// True for locations inside the sign-in/sign-up section.
pub fn is_auth_section(location: &str) -> bool {
    let path = location.split(['?', '#']).next().unwrap_or_default();

    path == AUTH_SECTION
        || path
            .strip_prefix(AUTH_SECTION)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn evaluate(session: &Session, location: &str) -> GuardDecision {
    if session.is_loading() {
        return GuardDecision::Loading;
    }

    match (session.is_authenticated(), is_auth_section(location)) {
        (false, false) => GuardDecision::Redirect(Route::Login),
        (true, true) => GuardDecision::Redirect(Route::Home),
        _ => GuardDecision::Allow,
    }
}

/// Navigation-side view of the session.
pub struct RouteGuard {
    session: watch::Receiver<Session>,
}

impl RouteGuard {
    pub fn new(session: watch::Receiver<Session>) -> Self {
        Self { session }
    }

    pub fn decide(&self, location: &str) -> GuardDecision {
        evaluate(&self.session.borrow(), location)
    }

    /// Waits for the next session change and decides again. Returns `None`
    /// once the session store is gone.
    pub async fn changed(&mut self, location: &str) -> Option<GuardDecision> {
        self.session.changed().await.ok()?;
        Some(evaluate(&self.session.borrow_and_update(), location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_section_detection() {
        assert!(is_auth_section("/auth"));
        assert!(is_auth_section("/auth/login"));
        assert!(is_auth_section("/auth/verify-email?token=abc"));
        assert!(!is_auth_section("/authors"));
        assert!(!is_auth_section("/"));
        assert!(!is_auth_section("/notifications"));
    }

    #[test]
    fn test_never_redirects_while_loading() {
        let session = Session::default();

        assert!(session.is_loading());
        assert_eq!(evaluate(&session, "/"), GuardDecision::Loading);
        assert_eq!(evaluate(&session, "/auth/login"), GuardDecision::Loading);
    }
}
