use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub migration_path: Option<String>,
    pub clean_start: bool,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth {
    pub secret: String,
    /// Access token lifetime in seconds
    pub expiration: u64,
    /// Refresh token lifetime in seconds
    pub refresh_expiration: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weather {
    pub base_url: String,
    pub api_key: String,
    pub current_ttl: u64,
    pub forecast_ttl: u64,
    pub daily_ttl: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uploads {
    pub avatar_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub database: Database,
    pub auth: Auth,
    pub weather: Weather,
    pub uploads: Uploads,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let mut settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("configs/default").required(false))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("CLOUDGUARD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        if let Some(migrate) = &settings.database.migration_path {
            if !std::path::Path::new(migrate).is_dir() {
                tracing::warn!("migration path {} is not a directory, skipping", migrate);
                settings.database.migration_path = None;
            }
        }

        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: Server {
                host: String::from("127.0.0.1"),
                port: 8000,
            },
            logger: Logger {
                level: String::from("info"),
            },
            database: Database {
                migration_path: None,
                clean_start: false,
                url: String::from("sqlite://cloudguard.db?mode=rwc"),
            },
            auth: Auth {
                secret: String::from("change-me"),
                expiration: 3600,
                refresh_expiration: 60 * 60 * 24 * 30,
            },
            weather: Weather {
                base_url: String::from("https://api.openweathermap.org/data/2.5"),
                api_key: String::new(),
                current_ttl: 300,
                forecast_ttl: 300,
                daily_ttl: 3600,
            },
            uploads: Uploads {
                avatar_dir: String::from("storage/avatars"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_config() {
        let settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default()).unwrap())
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.weather.current_ttl, 300);
        assert_eq!(settings.weather.daily_ttl, 3600);
        assert!(settings.database.migration_path.is_none());
    }
}
