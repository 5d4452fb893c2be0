//! Application settings and saved credentials

mod credentials;
mod errors;
mod store;

pub use credentials::{
    db_path, default_db_path, delete_credentials, get_credentials, is_signed_in,
    set_credentials, store_db_path, Credentials, CREDENTIALS_KEY, DB_PATH_KEY,
};
pub use errors::{ConfigError, Result};
pub use store::{default_config_path, ConfigStore, JsonConfigStore, MemoryConfigStore};
