mod access_token;
mod notification;
mod user;
mod user_token;

pub use access_token::AccessTokenRepository;
pub use notification::NotificationRepository;
pub use user::UserRepository;
pub use user_token::UserTokenRepository;
