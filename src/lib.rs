//! Music Catalog Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog_store;
pub mod config;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogError, ConsistencyEngine, SqliteCatalogStore, StoreConfig, TracksCache};
pub use config::{AppConfig, CliConfig, FileConfig};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
