//! Shared test helpers: an in-memory document driver
//!
//! `MockDriver` hands out `MockConnection`s backed by one in-memory document
//! store per host, so two connections to the same host see the same data and
//! connections to different hosts never do.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docstack::{
    ConnectionCache, ConnectionOptions, ConnectionSettings, DocumentDriver, JsonConfig,
};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Barrier;

type Store = Arc<Mutex<Vec<Value>>>;

#[derive(Debug, Error)]
pub enum MockError {
    #[error("failed to connect to server {0}")]
    Connect(String),

    #[error("disconnect failed: server went away")]
    Disconnect,
}

/// Connection handle produced by `MockDriver`
#[derive(Debug)]
pub struct MockConnection {
    pub id: usize,
    pub host: String,
    store: Store,
}

impl MockConnection {
    pub fn insert(&self, doc: Value) {
        self.store.lock().unwrap().push(doc);
    }

    pub fn find_all(&self) -> Vec<Value> {
        self.store.lock().unwrap().clone()
    }
}

/// In-memory driver with call accounting and failure injection
#[derive(Default)]
pub struct MockDriver {
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicUsize,
    fail_disconnect: AtomicBool,
    failing_hosts: Mutex<HashSet<String>>,
    stores: Mutex<HashMap<String, Store>>,
    last_options: Mutex<Option<ConnectionOptions>>,
    delay: Option<Duration>,
    barrier: Option<Arc<Barrier>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connect sleeps for `delay` before completing
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every connect waits on `barrier` before completing
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn fail_host(&self, host: &str) {
        self.failing_hosts.lock().unwrap().insert(host.to_string());
    }

    pub fn heal_host(&self, host: &str) {
        self.failing_hosts.lock().unwrap().remove(host);
    }

    pub fn fail_disconnect(&self, fail: bool) {
        self.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<ConnectionOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

impl DocumentDriver for MockDriver {
    type Handle = MockConnection;
    type Error = MockError;

    async fn connect(&self, settings: &ConnectionSettings) -> Result<MockConnection, MockError> {
        let host = settings.host.as_str();
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(settings.effective_options());

        if self.failing_hosts.lock().unwrap().contains(host) {
            return Err(MockError::Connect(host.to_string()));
        }

        let store = Arc::clone(self.stores.lock().unwrap().entry(host.to_string()).or_default());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            id,
            host: host.to_string(),
            store,
        })
    }

    async fn disconnect_all(&self) -> Result<(), MockError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(MockError::Disconnect);
        }
        Ok(())
    }
}

/// The connection map used by most tests
pub fn default_connections() -> Value {
    serde_json::json!({
        "mongo-1": {
            "host": "mongodb://localhost:27017/test-database",
            "options": { "connectTimeoutMS": 2000, "socketTimeoutMS": 2000 }
        },
        "mongo-2": {
            "host": "mongodb://localhost:27018/test-database",
            "options": { "connectTimeoutMS": 2000, "socketTimeoutMS": 2000 }
        },
        "mongo-3": {
            "host": "mongodb://localhost:27019/test-database",
            "options": { "connectTimeoutMS": 2000, "socketTimeoutMS": 2000 }
        }
    })
}

/// Build a cache over `connections` with a fresh driver
pub fn cache_with(
    connections: Value,
    driver: MockDriver,
) -> (ConnectionCache<MockDriver>, Arc<MockDriver>) {
    let driver = Arc::new(driver);
    let config = JsonConfig::with_connections(connections);
    (ConnectionCache::new(Arc::new(config), Arc::clone(&driver)), driver)
}
