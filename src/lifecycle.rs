//! Component Lifecycle
//!
//! Host frameworks drive components through `init` and `dinit`. A component must
//! accept any number of `init` → `dinit` cycles, each starting from clean state.

use std::future::Future;

use crate::error::Result;

/// A component with an init/dinit lifecycle
pub trait Lifecycle: Send + Sync {
    /// Prepare the component for use
    fn init(&self) -> impl Future<Output = Result<()>> + Send;

    /// Release resources and return to the uninitialized state
    ///
    /// Local state must be reset even when releasing remote resources fails.
    fn dinit(&self) -> impl Future<Output = Result<()>> + Send;
}
