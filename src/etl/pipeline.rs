//! Pipeline orchestration for ETL operations

use super::{Extractor, Initializer, Loader, Transformer};
use eyre::Result;

/// ETL Pipeline that orchestrates Setup, Extract, Transform, and Load
///
/// Every stage is also exposed on its own so a scheduler can run, retry and
/// report each one as a separate task while passing outputs along by value.
///
/// # Type Parameters
/// - `S`: Initializer type (prepares the destination)
/// - `E`: Extractor type
/// - `T`: Transformer type (must transform from E::Item)
/// - `L`: Loader type (must load T::Output)
///
/// # Example
/// ```no_run
/// use users_etl::etl::{IdentityTransformer, Pipeline};
/// use users_etl::storage::{CsvReader, UsersLoader, UsersTable};
///
/// # async fn example() -> eyre::Result<()> {
/// let table = UsersTable::new("etl_data.db");
/// let pipeline = Pipeline::new(
///     table.clone(),
///     CsvReader::new("users.csv"),
///     IdentityTransformer::new(),
///     UsersLoader::new(table),
/// );
///
/// let count = pipeline.run().await?;
/// println!("Loaded {} users", count);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<S, E, T, L> {
    initializer: S,
    extractor: E,
    transformer: T,
    loader: L,
}

impl<S, E, T, L> Pipeline<S, E, T, L>
where
    S: Initializer,
    E: Extractor,
    T: Transformer<Input = E::Item>,
    L: Loader<Item = T::Output>,
{
    /// Create a new pipeline
    pub fn new(initializer: S, extractor: E, transformer: T, loader: L) -> Self {
        Self {
            initializer,
            extractor,
            transformer,
            loader,
        }
    }

    /// Prepare the destination
    pub async fn setup(&self) -> Result<()> {
        log::debug!("Preparing destination...");
        self.initializer.initialize().await
    }

    /// Extract all items from the source
    pub async fn extract(&self) -> Result<Vec<E::Item>> {
        log::debug!("Extracting from source...");
        let items = self.extractor.extract().await?;
        log::info!("Extracted {} items", items.len());
        Ok(items)
    }

    /// Transform extracted items
    pub fn transform(&self, items: Vec<E::Item>) -> Result<Vec<T::Output>> {
        log::debug!("Transforming items...");
        let transformed = self.transformer.transform_many(items)?;
        log::info!("Transformed {} items", transformed.len());
        Ok(transformed)
    }

    /// Load transformed items to the destination
    pub async fn load(&self, items: Vec<T::Output>) -> Result<usize> {
        log::debug!("Loading to destination...");
        let count = self.loader.load(items).await?;
        log::info!("Loaded {} items", count);
        Ok(count)
    }

    /// Run the complete ETL pipeline
    ///
    /// Steps:
    /// 1. Prepare the destination
    /// 2. Extract items from source
    /// 3. Transform each item
    /// 4. Load items to destination
    ///
    /// Returns the number of items loaded
    ///
    /// # Errors
    /// Returns an error if any stage fails. Stages after the failing one are
    /// not run.
    pub async fn run(&self) -> Result<usize> {
        log::info!("Starting ETL pipeline");

        self.setup().await?;

        let items = self.extract().await?;
        if items.is_empty() {
            log::warn!("No items extracted, pipeline complete");
            return Ok(0);
        }

        let transformed = self.transform(items)?;
        self.load(transformed).await
    }
}
