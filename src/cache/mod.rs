//! Named Connection Cache
//!
//! [`ConnectionCache`] hands out one driver connection per logical name. Connections
//! are created on first request, validated against the configuration read during
//! `init`, and reused until `dinit`.
//!
//! # Lifecycle
//! `init` → `get_connection`* → `dinit` → `init` → ... Each cycle starts with an
//! empty cache. `get_connection` outside a cycle fails with
//! [`DocstackError::NotInitialized`].
//!
//! # Concurrency
//! Creation is serialized per name: concurrent requests for the same name share
//! a single in-flight connect and receive the same handle. Requests for different
//! names never wait on each other's driver calls. A failed connect caches nothing,
//! so the next request for that name starts over.
//!
//! A connect that finishes after `dinit` still returns its handle to the caller
//! that started it, but the handle never enters the next cycle's cache.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::config::{redact_host, ConfigProvider, ConnectionSettings, COMPONENT_NAMESPACE};
use crate::driver::DocumentDriver;
use crate::error::{DocstackError, Result};
use crate::lifecycle::Lifecycle;

type Slot<H> = Arc<OnceCell<Arc<H>>>;

/// State of one init cycle
struct Cycle<H> {
    /// Raw connection entries, keyed by name
    config: Map<String, Value>,

    /// One slot per name requested so far
    slots: HashMap<String, Slot<H>>,
}

/// Lazily populated cache of named driver connections
pub struct ConnectionCache<D: DocumentDriver> {
    provider: Arc<dyn ConfigProvider>,
    driver: Arc<D>,
    state: Mutex<Option<Cycle<D::Handle>>>,
}

impl<D: DocumentDriver> ConnectionCache<D> {
    /// Create an uninitialized cache
    pub fn new(provider: Arc<dyn ConfigProvider>, driver: Arc<D>) -> Self {
        Self {
            provider,
            driver,
            state: Mutex::new(None),
        }
    }

    /// The driver connections are created with
    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    /// Read the connection map from the configuration provider
    ///
    /// No connection is created. Calling `init` on an initialized cache re-reads
    /// the configuration and keeps the handles already cached.
    pub async fn init(&self) -> Result<()> {
        let config = read_connection_map(self.provider.as_ref())?;
        let configured = config.len();

        let mut state = self.state.lock().await;
        match state.as_mut() {
            Some(cycle) => cycle.config = config,
            None => {
                *state = Some(Cycle {
                    config,
                    slots: HashMap::new(),
                });
            }
        }

        debug!(configured, "connection cache initialized");
        Ok(())
    }

    /// Disconnect everything the driver created and reset to uninitialized
    ///
    /// Local state is reset before the driver is asked to disconnect, so a
    /// disconnect failure still leaves the cache empty and uninitialized.
    pub async fn dinit(&self) -> Result<()> {
        let previous = self.state.lock().await.take();
        let cached = previous.map_or(0, |cycle| {
            cycle.slots.values().filter(|slot| slot.initialized()).count()
        });

        info!(cached, "disconnecting document driver");
        self.driver.disconnect_all().await.map_err(DocstackError::driver_disconnect)
    }

    /// Whether the cache is inside an init cycle
    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Configured connection names, sorted
    pub async fn connection_names(&self) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let cycle = state.as_ref().ok_or(DocstackError::NotInitialized)?;

        let mut names: Vec<String> = cycle.config.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Resolve the settings a connection would be created with, without connecting
    pub async fn settings(&self, name: &str) -> Result<ConnectionSettings> {
        let entry = self.entry(name).await?;
        ConnectionSettings::resolve(name, &entry)
    }

    /// Number of live handles in the current cycle
    pub async fn cached_count(&self) -> usize {
        self.state.lock().await.as_ref().map_or(0, |cycle| {
            cycle.slots.values().filter(|slot| slot.initialized()).count()
        })
    }

    /// Get the connection for `name`, creating it on first use
    ///
    /// # Errors
    /// - [`DocstackError::NotInitialized`] before `init` or after `dinit`
    /// - [`DocstackError::ConnectionNotFound`] when `name` is not configured
    /// - [`DocstackError::InvalidHost`] when the entry has no usable host
    /// - [`DocstackError::ConfigError`] when the entry's options are malformed
    /// - [`DocstackError::DriverConnection`] when the driver fails to connect
    pub async fn get_connection(&self, name: &str) -> Result<Arc<D::Handle>> {
        let (slot, entry) = {
            let mut state = self.state.lock().await;
            let cycle = state.as_mut().ok_or(DocstackError::NotInitialized)?;

            let entry = cycle
                .config
                .get(name)
                .cloned()
                .ok_or_else(|| DocstackError::connection_not_found(name))?;

            let slot = Arc::clone(cycle.slots.entry(name.to_string()).or_default());
            (slot, entry)
        };

        if let Some(handle) = slot.get() {
            debug!(connection = name, "serving cached connection");
            return Ok(Arc::clone(handle));
        }

        let handle = slot.get_or_try_init(|| self.create(name, &entry)).await?;
        Ok(Arc::clone(handle))
    }

    async fn create(&self, name: &str, entry: &Value) -> Result<Arc<D::Handle>> {
        let settings = ConnectionSettings::resolve(name, entry)?;

        debug!(connection = name, host = %redact_host(&settings.host), "creating connection");
        let handle = self
            .driver
            .connect(&settings)
            .await
            .map_err(DocstackError::driver_connection)?;

        debug!(connection = name, "connection established");
        Ok(Arc::new(handle))
    }

    async fn entry(&self, name: &str) -> Result<Value> {
        let state = self.state.lock().await;
        let cycle = state.as_ref().ok_or(DocstackError::NotInitialized)?;
        cycle.config.get(name).cloned().ok_or_else(|| DocstackError::connection_not_found(name))
    }
}

impl<D: DocumentDriver> Lifecycle for ConnectionCache<D> {
    async fn init(&self) -> Result<()> {
        ConnectionCache::init(self).await
    }

    async fn dinit(&self) -> Result<()> {
        ConnectionCache::dinit(self).await
    }
}

/// Read the component's sub-tree as a name → entry map
///
/// A missing, `null` or `false` sub-tree means "no connections configured".
fn read_connection_map(provider: &dyn ConfigProvider) -> Result<Map<String, Value>> {
    match provider.get(COMPONENT_NAMESPACE) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(DocstackError::config_error(format!(
            "Expected an object of named connections under '{COMPONENT_NAMESPACE}', found {}",
            kind(&other)
        ))),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
