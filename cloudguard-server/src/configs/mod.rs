mod schema;
mod settings;
mod storage;

pub use schema::SchemaManager;
pub use settings::{Auth, Database, Logger, Server, Settings, Uploads, Weather};
pub use storage::Storage;
