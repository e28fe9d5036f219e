//! CLI Report Format
//!
//! Every `docstack` invocation prints exactly one [`Report`] as a single JSON line.
//!
//! ```text
//! {"ok":true, "command":"ping","connection":"mongo-1","data":{...},"meta":{...}}
//! {"ok":false,"command":"list","error":{"code":"CONFIG_ERROR","message":"..."},"meta":{...}}
//! ```
//!
//! `connection` is omitted for commands that do not target one connection. `meta`
//! is present on failures too, so a caller can always tell which default option
//! table the binary was built with.

use serde::Serialize;

use crate::config::DEFAULT_OPTIONS_REVISION;
use crate::error::{DocstackError, Result};

/// Outcome of one CLI command
#[derive(Debug, Serialize)]
pub struct Report<T> {
    pub ok: bool,

    pub command: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,

    #[serde(flatten)]
    pub outcome: Outcome<T>,

    pub meta: Metadata,
}

/// Either the command's data or the error that stopped it
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    Success { data: T },
    Failure { error: ErrorInfo },
}

impl<T> Report<T> {
    /// Build a report from a command result
    pub fn from_result(
        command: impl Into<String>,
        connection: Option<String>,
        result: Result<T>,
        meta: Metadata,
    ) -> Self {
        let outcome = match result {
            Ok(data) => Outcome::Success { data },
            Err(e) => Outcome::Failure {
                error: ErrorInfo::from(&e),
            },
        };

        Self {
            ok: matches!(outcome, Outcome::Success { .. }),
            command: command.into(),
            connection,
            outcome,
            meta,
        }
    }
}

/// Stable error code plus the error's display text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl From<&DocstackError> for ErrorInfo {
    fn from(err: &DocstackError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Wall time of the whole command, teardown included
    pub execution_ms: u64,

    /// Revision of the default option table connections were resolved with
    pub options_revision: u32,
}

impl Metadata {
    #[must_use]
    pub fn new(execution_ms: u64) -> Self {
        Self {
            execution_ms,
            options_revision: DEFAULT_OPTIONS_REVISION,
        }
    }
}
