//! Users ETL
//!
//! A scheduled pipeline that extracts user records from a CSV file, passes
//! them through a transformation stage and loads them into SQLite.

pub mod cli;
pub mod etl;
pub mod schedule;
pub mod storage;
pub mod users;

// Re-exports for convenience
pub use etl::{Extractor, IdentityTransformer, Initializer, Loader, Pipeline, Transformer};
pub use schedule::{Dag, DagConfig, DagRun, RunState, Scheduler, TaskId, TaskState};
pub use storage::{CsvReader, UsersLoader, UsersTable};
pub use users::{COLUMNS, StoredUser, UserRecord};
