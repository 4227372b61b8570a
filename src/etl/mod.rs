//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides trait definitions for the stages of a pipeline run:
//! preparing a destination, extracting from a source, transforming items,
//! and loading them into the destination.

mod extract;
mod load;
mod pipeline;
mod setup;
mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::Pipeline;
pub use setup::Initializer;
pub use transform::{IdentityTransformer, Transformer};
