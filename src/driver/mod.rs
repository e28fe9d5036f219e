//! Document Driver Trait
//!
//! This module defines the seam between the connection cache and the database driver.
//! The cache never looks inside a handle; it only stores and hands out `Arc`s of it.
//!
//! # Bulk Disconnect
//! [`DocumentDriver::disconnect_all`] covers every connection the driver instance has
//! created, not only the ones a particular cache holds. Components that share one
//! driver instance also share that scope.

use std::future::Future;

use crate::config::ConnectionSettings;

// Driver-specific implementations
#[cfg(feature = "mongodb")]
pub mod mongo;

/// Database driver trait
///
/// Implementations own connection establishment, pooling and teardown.
pub trait DocumentDriver: Send + Sync {
    /// Live connection handle
    type Handle: Send + Sync + 'static;

    /// Driver failure, propagated to callers verbatim
    type Error: std::error::Error + Send + Sync + 'static;

    /// Establish a connection
    ///
    /// `settings.host` is passed exactly as configured. `settings.options` holds
    /// only what the entry wrote; drivers layer it over their own endpoint
    /// parameters and fill the rest from [`ConnectionSettings::effective_options`].
    fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> impl Future<Output = std::result::Result<Self::Handle, Self::Error>> + Send;

    /// Disconnect every connection this driver instance created
    fn disconnect_all(&self) -> impl Future<Output = std::result::Result<(), Self::Error>> + Send;
}
