//! Running a pipeline as an ordered set of tasks
//!
//! Tasks run strictly in [`TaskId::ORDER`]. The output of each stage is kept
//! for the duration of the run and handed to the next stage by value, so a
//! retried task sees the same input as its first attempt.

use super::DagConfig;
use crate::etl::{Extractor, Initializer, Loader, Pipeline, Transformer};

use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use std::fmt;
use std::future::Future;

/// Tasks of the users DAG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    Start,
    SetupDatabase,
    Extract,
    Transform,
    Load,
    End,
}

impl TaskId {
    /// Execution order; each task depends on the one before it
    pub const ORDER: [TaskId; 6] = [
        TaskId::Start,
        TaskId::SetupDatabase,
        TaskId::Extract,
        TaskId::Transform,
        TaskId::Load,
        TaskId::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::Start => "start",
            TaskId::SetupDatabase => "setup_database",
            TaskId::Extract => "extract",
            TaskId::Transform => "transform",
            TaskId::Load => "load",
            TaskId::End => "end",
        }
    }

    /// Start and end do no work
    pub fn is_marker(&self) -> bool {
        matches!(self, TaskId::Start | TaskId::End)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Success,
    Failed,
    UpstreamFailed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskState::Pending => "pending",
            TaskState::Success => "success",
            TaskState::Failed => "failed",
            TaskState::UpstreamFailed => "upstream_failed",
        })
    }
}

/// One task within one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInstance {
    pub task_id: TaskId,
    pub state: TaskState,
    /// Attempts made so far (0 if the task never started)
    pub try_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Success,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Running => "running",
            RunState::Success => "success",
            RunState::Failed => "failed",
        })
    }
}

/// What triggered a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Manual,
    Scheduled,
}

impl RunKind {
    fn prefix(&self) -> &'static str {
        match self {
            RunKind::Manual => "manual",
            RunKind::Scheduled => "scheduled",
        }
    }
}

/// Outcome of one execution of the DAG
#[derive(Debug)]
pub struct DagRun {
    pub dag_id: String,
    pub run_id: String,
    pub logical_date: DateTime<Utc>,
    pub state: RunState,
    pub tasks: Vec<TaskInstance>,
    /// Records loaded, set when the run succeeds
    pub loaded: Option<usize>,
    /// Error of the task that failed the run
    pub error: Option<eyre::Report>,
}

impl DagRun {
    fn new(dag_id: &str, kind: RunKind, logical_date: DateTime<Utc>) -> Self {
        Self {
            dag_id: dag_id.to_string(),
            run_id: format!("{}__{}", kind.prefix(), logical_date.to_rfc3339()),
            logical_date,
            state: RunState::Running,
            tasks: TaskId::ORDER
                .iter()
                .map(|&task_id| TaskInstance {
                    task_id,
                    state: TaskState::Pending,
                    try_number: 0,
                })
                .collect(),
            loaded: None,
            error: None,
        }
    }

    pub fn task(&self, task_id: TaskId) -> Option<&TaskInstance> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    pub fn is_success(&self) -> bool {
        self.state == RunState::Success
    }

    /// The task that failed the run, if any
    pub fn failed_task(&self) -> Option<TaskId> {
        self.tasks
            .iter()
            .find(|t| t.state == TaskState::Failed)
            .map(|t| t.task_id)
    }

    /// Convert into the number of loaded records, or the run's error
    pub fn into_result(self) -> Result<usize> {
        match self.state {
            RunState::Success => Ok(self.loaded.unwrap_or(0)),
            _ => {
                let task = self
                    .failed_task()
                    .map(|t| t.as_str())
                    .unwrap_or("unknown");
                let message = format!("DAG run {} failed at task {}", self.run_id, task);
                Err(match self.error {
                    Some(err) => err.wrap_err(message),
                    None => eyre!(message),
                })
            }
        }
    }

    fn record(&mut self, task_id: TaskId, state: TaskState, try_number: u32) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.task_id == task_id) {
            task.state = state;
            task.try_number = try_number;
        }
    }

    fn finish(&mut self, outcome: Result<usize>) {
        match outcome {
            Ok(count) => {
                self.state = RunState::Success;
                self.loaded = Some(count);
            }
            Err(err) => {
                for task in self.tasks.iter_mut() {
                    if task.state == TaskState::Pending {
                        task.state = TaskState::UpstreamFailed;
                    }
                }
                self.state = RunState::Failed;
                self.error = Some(err);
            }
        }
    }
}

/// A pipeline registered with its schedule and task arguments
pub struct Dag<S, E, T, L> {
    config: DagConfig,
    pipeline: Pipeline<S, E, T, L>,
}

impl<S, E, T, L> Dag<S, E, T, L>
where
    S: Initializer,
    E: Extractor,
    E::Item: Clone,
    T: Transformer<Input = E::Item>,
    T::Output: Clone,
    L: Loader<Item = T::Output>,
{
    /// Bind a pipeline to its configuration
    pub fn register(config: DagConfig, pipeline: Pipeline<S, E, T, L>) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "Registered DAG '{}': {} (owner: {}, retries: {}, retry delay: {}s)",
            config.dag_id,
            config.description,
            config.default_args.owner,
            config.default_args.retries,
            config.default_args.retry_delay_secs,
        );
        Ok(Self { config, pipeline })
    }

    pub fn config(&self) -> &DagConfig {
        &self.config
    }

    pub fn tasks(&self) -> &'static [TaskId] {
        &TaskId::ORDER
    }

    /// Execute every task once, in order, retrying failed tasks
    ///
    /// The returned run carries the per-task states; a failure never panics
    /// or escapes as an `Err`.
    pub async fn run(&self, logical_date: DateTime<Utc>, kind: RunKind) -> DagRun {
        let mut run = DagRun::new(&self.config.dag_id, kind, logical_date);
        log::info!("Starting DAG run {}", run.run_id);

        let outcome = self.execute(&mut run).await;
        run.finish(outcome);

        if let Some(err) = &run.error {
            log::error!("DAG run {} failed: {:#}", run.run_id, err);
        } else {
            log::info!(
                "DAG run {} succeeded, {} record(s) loaded",
                run.run_id,
                run.loaded.unwrap_or(0)
            );
        }

        run
    }

    async fn execute(&self, run: &mut DagRun) -> Result<usize> {
        let pipeline = &self.pipeline;

        self.marker(run, TaskId::Start);

        self.attempt(run, TaskId::SetupDatabase, move || pipeline.setup())
            .await?;

        let extracted = self
            .attempt(run, TaskId::Extract, move || pipeline.extract())
            .await?;

        let transformed = self
            .attempt(run, TaskId::Transform, move || {
                std::future::ready(pipeline.transform(extracted.clone()))
            })
            .await?;

        let loaded = self
            .attempt(run, TaskId::Load, move || pipeline.load(transformed.clone()))
            .await?;

        self.marker(run, TaskId::End);
        Ok(loaded)
    }

    fn marker(&self, run: &mut DagRun, task_id: TaskId) {
        log::debug!("Task {} reached", task_id);
        run.record(task_id, TaskState::Success, 1);
    }

    async fn attempt<O, F, Fut>(&self, run: &mut DagRun, task_id: TaskId, mut op: F) -> Result<O>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<O>>,
    {
        let args = &self.config.default_args;
        let max_tries = args.retries.saturating_add(1);
        let mut try_number = 0;

        loop {
            try_number += 1;
            log::info!("Running task {} (try {}/{})", task_id, try_number, max_tries);

            match op().await {
                Ok(output) => {
                    run.record(task_id, TaskState::Success, try_number);
                    return Ok(output);
                }
                Err(err) if try_number < max_tries => {
                    log::warn!(
                        "Task {} failed: {:#}; retrying in {}s",
                        task_id,
                        err,
                        args.retry_delay_secs
                    );
                    tokio::time::sleep(args.retry_delay()).await;
                }
                Err(err) => {
                    run.record(task_id, TaskState::Failed, try_number);
                    return Err(err.wrap_err(format!("Task {} failed", task_id)));
                }
            }
        }
    }
}
