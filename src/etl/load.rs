//! Destination side of a pipeline

use async_trait::async_trait;
use eyre::Result;

/// Writes transformed records to the destination
///
/// A DAG retry hands the same buffered records to `load` again, after the
/// destination has already been prepared by the setup stage.
///
/// # Example
/// ```no_run
/// use users_etl::etl::Loader;
/// use async_trait::async_trait;
/// use eyre::Result;
///
/// struct CountingLoader;
///
/// #[async_trait]
/// impl Loader for CountingLoader {
///     type Item = String;
///
///     async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
///         Ok(items.len())
///     }
/// }
/// ```
#[async_trait]
pub trait Loader: Send + Sync {
    /// The type of items to load
    type Item: Send;

    /// Write `items` in order and return how many were written
    ///
    /// # Errors
    /// The first item the destination rejects aborts the rest of the batch.
    async fn load(&self, items: Vec<Self::Item>) -> Result<usize>;
}
