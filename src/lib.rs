// IE Bank - Accounts API
// Exposes all modules for use in the server binary and tests

pub mod api;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use api::{router, AccountList, AppState};
pub use config::ServerConfig;
pub use db::{
    count_accounts, delete_account, get_account, insert_account, list_accounts, open_database,
    setup_database, update_account,
};
pub use entities::{Account, AccountUpdate, NewAccount};
pub use error::ApiError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
