//! Database models, schema and the persistence contract

pub mod init;
pub mod models;
pub mod sqlite_store;
pub mod store;

pub use init::*;
pub use models::*;
pub use sqlite_store::SqliteStore;
pub use store::Store;
