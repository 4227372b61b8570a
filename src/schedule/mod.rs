//! DAG registration, task execution and scheduling
//!
//! A [`Dag`] binds a pipeline to its [`DagConfig`] and runs the pipeline's
//! stages as ordered tasks with retries. A [`Scheduler`] decides which
//! intervals are due and runs them one at a time.

mod config;
mod dag;
mod scheduler;

pub use config::{DagConfig, DefaultArgs, PathsConfig, ScheduleConfig};
pub use dag::{Dag, DagRun, RunKind, RunState, TaskId, TaskInstance, TaskState};
pub use scheduler::{Scheduler, due_logical_dates, next_wakeup};
