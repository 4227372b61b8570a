//! Record transformation between extract and load

use eyre::Result;

/// Maps extracted records to the records handed to the loader
///
/// Runs on the full extracted batch, after extraction has finished and
/// before anything is written. This is where record-level rules belong.
///
/// # Example
/// ```no_run
/// use users_etl::etl::Transformer;
/// use users_etl::UserRecord;
/// use eyre::Result;
///
/// struct LowercaseEmail;
///
/// impl Transformer for LowercaseEmail {
///     type Input = UserRecord;
///     type Output = UserRecord;
///
///     fn transform(&self, mut input: Self::Input) -> Result<Self::Output> {
///         input.email = input.email.to_lowercase();
///         Ok(input)
///     }
/// }
/// ```
pub trait Transformer: Send + Sync {
    /// Input item type
    type Input: Send;

    /// Output item type after transformation
    type Output: Send;

    /// Map one record
    ///
    /// # Errors
    /// A rejected record fails the batch it belongs to.
    fn transform(&self, input: Self::Input) -> Result<Self::Output>;

    /// Map a batch, one output per input in the same order
    fn transform_many(&self, inputs: Vec<Self::Input>) -> Result<Vec<Self::Output>> {
        inputs.into_iter().map(|i| self.transform(i)).collect()
    }
}

/// Identity transformer that passes items through unchanged
///
/// This is the placeholder stage of the users pipeline; business rules go in
/// a replacement transformer without touching extraction or loading.
pub struct IdentityTransformer<T> {
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T> Default for IdentityTransformer<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> IdentityTransformer<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Send> Transformer for IdentityTransformer<T> {
    type Input = T;
    type Output = T;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        Ok(input)
    }

    fn transform_many(&self, inputs: Vec<Self::Input>) -> Result<Vec<Self::Output>> {
        log::debug!("Passing {} item(s) through unchanged", inputs.len());
        Ok(inputs)
    }
}
