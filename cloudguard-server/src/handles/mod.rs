mod auth_handle;
mod notification_handle;
mod weather_handle;

pub use auth_handle::*;
pub use notification_handle::*;
pub use weather_handle::*;
