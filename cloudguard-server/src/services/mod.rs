mod auth_service;
mod cache_service;
mod token_service;
mod weather_service;

pub use auth_service::*;
pub use cache_service::*;
pub use token_service::*;
pub use weather_service::*;
