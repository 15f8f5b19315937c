pub mod api;
pub mod context;
pub mod error;
pub mod guard;
pub mod notification;
pub mod session;
pub mod settings;
pub mod storage;
pub mod validation;
pub mod weather;

pub use api::ApiClient;
pub use context::AppContext;
pub use error::{ApiError, NetworkErrorKind, Result, StorageError};
pub use guard::{GuardDecision, Route, RouteGuard};
pub use notification::{NotificationState, NotificationStore};
pub use session::{AuthState, Session, SessionStore};
pub use settings::Settings;
pub use storage::{CredentialKey, CredentialStore, FileStorage, MemoryStorage};
pub use weather::{WeatherState, WeatherStore};
