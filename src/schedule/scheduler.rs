//! Interval scheduling
//!
//! Interval `k` covers `[start + k * interval, start + (k + 1) * interval)`.
//! It becomes due once it has fully elapsed and its run is stamped with the
//! interval's start as the logical date.

use super::{Dag, DagRun, RunKind, ScheduleConfig};
use crate::etl::{Extractor, Initializer, Loader, Transformer};

use chrono::{DateTime, TimeDelta, Utc};
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::future::Future;

/// Logical dates of the intervals due at `now`, oldest first
///
/// Intervals up to and including `last` are skipped. Without catch-up only
/// the most recent due interval is returned.
pub fn due_logical_dates(
    schedule: &ScheduleConfig,
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    let Some(interval) = schedule.interval() else {
        return Vec::new();
    };
    let secs = interval.num_seconds();

    let start = schedule.start();
    let elapsed = (now - start).num_seconds();
    if elapsed < secs {
        return Vec::new();
    }

    let latest = elapsed / secs - 1;
    let mut first = match last {
        Some(last) if last >= start => (last - start).num_seconds() / secs + 1,
        _ => 0,
    };
    if !schedule.catchup {
        first = first.max(latest);
    }

    (first..=latest)
        .map_while(|k| interval_boundary(start, secs, k))
        .collect()
}

/// When the interval containing `now` ends and becomes due
///
/// `None` if the interval is invalid or its end is not representable.
pub fn next_wakeup(schedule: &ScheduleConfig, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let secs = schedule.interval()?.num_seconds();
    let start = schedule.start();
    let elapsed = (now - start).num_seconds();
    let current = if elapsed < 0 { 0 } else { elapsed / secs };
    interval_boundary(start, secs, current.checked_add(1)?)
}

/// Start of interval `k`
fn interval_boundary(start: DateTime<Utc>, secs: i64, k: i64) -> Option<DateTime<Utc>> {
    k.checked_mul(secs)
        .and_then(TimeDelta::try_seconds)
        .and_then(|offset| start.checked_add_signed(offset))
}

/// Runs due intervals of a DAG, one run at a time
pub struct Scheduler<S, E, T, L> {
    dag: Dag<S, E, T, L>,
    last_logical_date: Option<DateTime<Utc>>,
}

impl<S, E, T, L> Scheduler<S, E, T, L>
where
    S: Initializer,
    E: Extractor,
    E::Item: Clone,
    T: Transformer<Input = E::Item>,
    T::Output: Clone,
    L: Loader<Item = T::Output>,
{
    pub fn new(dag: Dag<S, E, T, L>) -> Self {
        Self {
            dag,
            last_logical_date: None,
        }
    }

    pub fn dag(&self) -> &Dag<S, E, T, L> {
        &self.dag
    }

    /// Logical date of the last run started by this scheduler
    pub fn last_logical_date(&self) -> Option<DateTime<Utc>> {
        self.last_logical_date
    }

    pub fn due(&self, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        due_logical_dates(&self.dag.config().schedule, self.last_logical_date, now)
    }

    /// Run every interval due at `now`, in order
    ///
    /// A failed run is logged and does not prevent later intervals from
    /// running.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Vec<DagRun> {
        let mut runs = Vec::new();

        for logical_date in self.due(now) {
            let run = self.dag.run(logical_date, RunKind::Scheduled).await;
            self.last_logical_date = Some(logical_date);

            if !run.is_success() {
                log::warn!(
                    "Scheduled run {} {}",
                    run.run_id.bright_black(),
                    run.state.red()
                );
            }
            runs.push(run);
        }

        runs
    }

    /// Keep running due intervals until interrupted with Ctrl-C
    pub async fn run_forever(&mut self) -> Result<()> {
        self.run_until(async {
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")
        })
        .await
    }

    /// Keep running due intervals until `shutdown` completes
    ///
    /// `shutdown` is polled while a run is in progress as well as while
    /// waiting for the next interval; a run in progress is abandoned.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let config = self.dag.config();
        log::info!(
            "Scheduling DAG '{}' every {}s from {} (catchup: {})",
            config.dag_id.cyan(),
            config.schedule.interval_secs,
            config.schedule.start_date,
            config.schedule.catchup
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = self.tick(Utc::now()) => {}
                signal = &mut shutdown => {
                    signal?;
                    log::info!("Scheduler stopped during a run");
                    return Ok(());
                }
            }

            let now = Utc::now();
            let Some(wakeup) = next_wakeup(&self.dag.config().schedule, now) else {
                eyre::bail!(
                    "Next interval of DAG '{}' is out of range",
                    self.dag.config().dag_id
                );
            };
            let wait = (wakeup - now).to_std().unwrap_or_default();
            log::info!("Next run due at {}", wakeup.to_rfc3339().bright_black());

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                signal = &mut shutdown => {
                    signal?;
                    log::info!("Scheduler stopped");
                    return Ok(());
                }
            }
        }
    }
}
