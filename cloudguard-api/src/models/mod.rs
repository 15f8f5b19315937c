mod auth;
mod error;
mod notification;
mod weather;

pub use auth::*;
pub use error::*;
pub use notification::*;
pub use weather::*;

pub type Id = i32;

pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";
