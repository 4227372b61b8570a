//! Initializer trait for preparing a destination before a run

use eyre::Result;

/// Prepares the destination of a pipeline before anything is loaded
///
/// Implementations must be idempotent: calling `initialize` on an already
/// prepared destination is safe and leaves it in the same state.
pub trait Initializer: Send + Sync {
    /// Ensure the destination exists and is ready for a fresh load
    ///
    /// # Errors
    /// Returns an error if the destination cannot be reached or prepared
    fn initialize(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}
