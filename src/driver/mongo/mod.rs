//! `MongoDB` Document Driver
//!
//! This module implements the `DocumentDriver` trait with the official `mongodb` crate.
//!
//! # Option Precedence
//! For every typed option, highest first:
//! 1. the entry's own `options`
//! 2. the same setting written as a query parameter in the host URI
//! 3. the default table ([`ConnectionOptions::defaults`])
//!
//! Passthrough options are percent-encoded and appended to the URI before parsing.
//! Options the Rust driver refuses but other `MongoDB` drivers accept, such as
//! `socketTimeoutMS`, are skipped rather than failing the whole connection.
//!
//! # Implementation Notes
//! - Database: URI default database, else `defaultDatabase` option, else `test`
//! - A `ping` is issued before the handle is returned, so unreachable servers fail `connect`
//! - A client whose `ping` fails is shut down at once and never tracked
//! - Every tracked `Client` is shut down by `disconnect_all`

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{redact_host, ConnectionOptions, ConnectionSettings};
use crate::driver::DocumentDriver;

/// Database used when neither the URI nor the options name one
pub const FALLBACK_DATABASE: &str = "test";

/// URI options the Rust driver rejects outright
const IGNORED_OPTIONS: &[&str] = &["socketTimeoutMS"];

/// Errors raised by [`MongoDriver`]
#[derive(Debug, Error)]
pub enum MongoDriverError {
    /// Error reported by the `mongodb` crate
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),

    /// A passthrough option whose value cannot be expressed as a URI parameter
    #[error(
        "Unsupported value for driver option '{key}': \
         only strings, numbers and booleans are passed through"
    )]
    UnsupportedOption { key: String },
}

/// Live `MongoDB` connection bound to one database
#[derive(Debug, Clone)]
pub struct MongoConnection {
    client: Client,
    database: Database,
}

impl MongoConnection {
    /// The underlying driver client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The database this connection is bound to
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// A typed collection in the bound database
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database.collection::<T>(name)
    }

    /// Round-trip a `ping` command to the server
    pub async fn ping(&self) -> Result<(), MongoDriverError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

/// Document driver backed by the `mongodb` crate
#[derive(Debug, Default)]
pub struct MongoDriver {
    clients: Mutex<Vec<Client>>,
}

impl MongoDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clients created and not yet disconnected
    pub async fn open_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

impl DocumentDriver for MongoDriver {
    type Handle = MongoConnection;
    type Error = MongoDriverError;

    async fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<MongoConnection, MongoDriverError> {
        let client_options = build_client_options(settings).await?;
        let database_name = client_options
            .default_database
            .clone()
            .unwrap_or_else(|| FALLBACK_DATABASE.to_string());

        let client = Client::with_options(client_options)?;
        let connection = MongoConnection {
            database: client.database(&database_name),
            client,
        };

        if let Err(e) = connection.ping().await {
            connection.client.shutdown().immediate(true).await;
            return Err(e);
        }

        self.clients.lock().await.push(connection.client.clone());

        debug!(
            host = %redact_host(&settings.host),
            database = %database_name,
            "mongodb client ready"
        );
        Ok(connection)
    }

    async fn disconnect_all(&self) -> Result<(), MongoDriverError> {
        let clients = std::mem::take(&mut *self.clients.lock().await);
        let count = clients.len();

        // Forced: open cursors and sessions held by callers must not block teardown
        for client in clients {
            client.shutdown().immediate(true).await;
        }

        debug!(count, "mongodb clients shut down");
        Ok(())
    }
}

/// Build driver options from the host URI and the entry's settings
async fn build_client_options(
    settings: &ConnectionSettings,
) -> Result<ClientOptions, MongoDriverError> {
    let uri = with_passthrough(&settings.host, &settings.options.extra)?;

    let mut client_options = ClientOptions::parse(uri.as_str()).await?;
    apply_options(&mut client_options, &settings.options, Layer::Override);
    apply_options(
        &mut client_options,
        &ConnectionOptions::defaults(),
        Layer::Fallback,
    );
    Ok(client_options)
}

/// How an option layer treats values already present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    /// Replace whatever the URI set
    Override,
    /// Fill only what is still unset
    Fallback,
}

fn put<T>(slot: &mut Option<T>, value: Option<T>, layer: Layer) {
    if value.is_some() && (layer == Layer::Override || slot.is_none()) {
        *slot = value;
    }
}

/// Copy one layer of typed options onto the parsed client options
fn apply_options(target: &mut ClientOptions, options: &ConnectionOptions, layer: Layer) {
    put(&mut target.app_name, options.app_name.clone(), layer);
    put(
        &mut target.connect_timeout,
        options.connect_timeout(),
        layer,
    );
    put(
        &mut target.server_selection_timeout,
        options.server_selection_timeout(),
        layer,
    );
    put(&mut target.max_pool_size, options.max_pool_size, layer);
    put(&mut target.min_pool_size, options.min_pool_size, layer);
    put(&mut target.max_idle_time, options.max_idle_time(), layer);
    put(
        &mut target.direct_connection,
        options.direct_connection,
        layer,
    );
    put(&mut target.retry_reads, options.retry_reads, layer);
    put(&mut target.retry_writes, options.retry_writes, layer);

    // The URI path names the database; the option only fills in when it is absent
    put(
        &mut target.default_database,
        options.default_database.clone(),
        Layer::Fallback,
    );
}

/// Append passthrough options to the URI query string
fn with_passthrough(host: &str, extra: &Map<String, Value>) -> Result<String, MongoDriverError> {
    let mut params = Vec::with_capacity(extra.len());
    for (key, value) in extra {
        if IGNORED_OPTIONS.iter().any(|ignored| ignored.eq_ignore_ascii_case(key)) {
            debug!(option = %key, "skipping option not supported by the mongodb driver");
            continue;
        }

        let rendered = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(MongoDriverError::UnsupportedOption { key: key.clone() });
            }
        };
        params.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(&rendered)
        ));
    }

    if params.is_empty() {
        return Ok(host.to_string());
    }

    let mut uri = host.to_string();
    if uri.contains('?') {
        if !uri.ends_with('?') && !uri.ends_with('&') {
            uri.push('&');
        }
    } else {
        let authority_start = uri.find("://").map_or(0, |i| i + 3);
        if !uri[authority_start..].contains('/') {
            uri.push('/');
        }
        uri.push('?');
    }
    uri.push_str(&params.join("&"));
    Ok(uri)
}
