mod access_token;
mod notification;
mod user;
mod user_token;

pub use access_token::{AccessToken, AccessTokenTable};
pub use notification::{Notification, NotificationTable};
pub use user::{User, UserTable};
pub use user_token::{UserToken, UserTokenKind, UserTokenTable};

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;

    /// The dependencies of the table
    fn dependencies(&self) -> Vec<&'static str>;
}
