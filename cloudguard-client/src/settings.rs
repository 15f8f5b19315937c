use std::env;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Api {
    /// Base URL including the `/api` prefix
    pub base_url: String,
    /// Request timeout in milliseconds
    pub timeout: u64,
    /// Reachability probe timeout in milliseconds
    pub ping_timeout: u64,
    /// Sent with login and registration so the backend can label the token
    pub device_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    /// Credential file; the platform data directory is used when unset
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub api: Api,
    pub storage: Storage,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("configs/client").required(false))
            .add_source(File::with_name(&format!("configs/client.{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("CLOUDGUARD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.api.ping_timeout)
    }

    pub fn storage_path(&self) -> Option<PathBuf> {
        self.storage.path.as_ref().map(PathBuf::from)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logger: Logger {
                level: String::from("info"),
            },
            api: Api {
                base_url: String::from("http://127.0.0.1:8000/api"),
                timeout: 60_000,
                ping_timeout: 10_000,
                device_name: format!("{} device", env::consts::OS),
            },
            storage: Storage { path: None },
        }
    }
}
