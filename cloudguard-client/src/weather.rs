use std::sync::Arc;

use cloudguard_api::models::{CurrentWeather, WeatherForecast};
use time::OffsetDateTime;
use tokio::sync::watch;

use crate::api::ApiClient;
use crate::error::Result;
use crate::session::SessionStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherState {
    pub current: Option<CurrentWeather>,
    pub hourly: Vec<WeatherForecast>,
    pub daily: Vec<WeatherForecast>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<OffsetDateTime>,
}

pub struct WeatherStore {
    api: ApiClient,
    state: watch::Sender<WeatherState>,
    session: Option<Arc<SessionStore>>,
}

impl WeatherStore {
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(WeatherState::default());

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

    pub fn snapshot(&self) -> WeatherState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WeatherState> {
        self.state.subscribe()
    }

    /// Fetches conditions for a location. The previous report stays visible
    /// when the request fails.
    pub async fn fetch(&self, latitude: f64, longitude: f64) -> Result<()> {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        match self.api.weather(latitude, longitude).await {
            Ok(report) => {
                self.state.send_replace(WeatherState {
                    current: Some(report.current),
                    hourly: report.hourly,
                    daily: report.daily,
                    is_loading: false,
                    error: None,
                    last_updated: Some(OffsetDateTime::now_utc()),
                });
                Ok(())
            }
            Err(err) => {
                tracing::warn!(latitude, longitude, "weather fetch failed: {}", err);
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.error = Some(err.to_string());
                });

                if err.is_invalid_credentials() {
                    if let Some(session) = &self.session {
                        session.invalidate().await;
                    }
                }

                Err(err)
            }
        }
    }
}
