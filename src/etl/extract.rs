//! Source side of a pipeline

use eyre::Result;

/// Reads every record of a source for one run
///
/// The whole source is materialized before anything downstream starts, in
/// source order. A DAG retry calls `extract` again from scratch, so an
/// implementation must not consume or move its source.
///
/// # Example
/// ```no_run
/// use users_etl::etl::Extractor;
/// use eyre::Result;
/// use std::path::PathBuf;
///
/// struct LinesExtractor {
///     path: PathBuf,
/// }
///
/// impl Extractor for LinesExtractor {
///     type Item = String;
///
///     async fn extract(&self) -> Result<Vec<Self::Item>> {
///         let content = std::fs::read_to_string(&self.path)?;
///         Ok(content.lines().map(String::from).collect())
///     }
/// }
/// ```
pub trait Extractor: Send + Sync {
    /// The type of items extracted
    type Item: Send;

    /// Read the complete source
    ///
    /// # Errors
    /// A missing source or any record that cannot be decoded fails the whole
    /// extraction; partial results are never returned.
    fn extract(&self) -> impl std::future::Future<Output = Result<Vec<Self::Item>>> + Send;
}
