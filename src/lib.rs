//! docstack - Named Document Database Connections
//!
//! docstack is a lifecycle-bound component that gives an application one cached,
//! lazily-created driver connection per logical name.
//!
//! # Core Principles
//! - Connections are created on first request, never eagerly
//! - One handle per name per init cycle; repeat requests get the same `Arc`
//! - Configuration is read once per cycle from an explicit provider
//! - Driver errors reach the caller verbatim; nothing is retried or swallowed
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`config`] - Configuration provider, connection settings and default options
//! - [`driver`] - Document driver trait and the `MongoDB` implementation
//! - [`cache`] - The named connection cache
//! - [`lifecycle`] - init/dinit contract for host frameworks
//! - [`output`] - JSON reports printed by the CLI
//!
//! # Example
//! ```rust,no_run
//! # #[cfg(feature = "mongodb")]
//! # async fn example() -> docstack::Result<()> {
//! use std::sync::Arc;
//! use docstack::{ConnectionCache, JsonConfig};
//! use docstack::driver::mongo::MongoDriver;
//!
//! let config = JsonConfig::with_connections(serde_json::json!({
//!     "mongo-1": { "host": "mongodb://localhost:27017/app" }
//! }));
//! let cache = ConnectionCache::new(Arc::new(config), Arc::new(MongoDriver::new()));
//!
//! cache.init().await?;
//! let conn = cache.get_connection("mongo-1").await?;
//! let docs = conn.collection::<serde_json::Value>("docs");
//! # let _ = docs;
//! cache.dinit().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod output;

// Re-export commonly used types for convenience
pub use cache::ConnectionCache;
pub use config::{
    ConfigProvider, ConnectionOptions, ConnectionSettings, JsonConfig, COMPONENT_NAMESPACE,
    DEFAULT_OPTIONS_REVISION,
};
pub use driver::DocumentDriver;
pub use error::{DocstackError, Result};
pub use lifecycle::Lifecycle;
pub use output::{ErrorInfo, Metadata, Outcome, Report};
