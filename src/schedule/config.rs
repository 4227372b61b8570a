//! DAG configuration
//!
//! The configuration is stored as YAML. Every key is optional; missing keys
//! take their defaults.
//!
//! Example format:
//! ```yaml
//! dag_id: users_etl_pipeline
//! description: ETL pipeline for users data
//! schedule:
//!   interval_secs: 86400
//!   start_date: 2025-04-22
//!   catchup: false
//! default_args:
//!   owner: etl
//!   depends_on_past: false
//!   email_on_failure: false
//!   email_on_retry: false
//!   retries: 1
//!   retry_delay_secs: 300
//! paths:
//!   input: users.csv
//!   database: etl_data.db
//! ```

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level DAG configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DagConfig {
    /// Identifier used in run ids and logs
    pub dag_id: String,
    pub description: String,
    pub schedule: ScheduleConfig,
    /// Arguments applied to every task
    pub default_args: DefaultArgs,
    pub paths: PathsConfig,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            dag_id: "users_etl_pipeline".to_string(),
            description: "ETL pipeline for users data".to_string(),
            schedule: ScheduleConfig::default(),
            default_args: DefaultArgs::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl DagConfig {
    /// Read configuration from a YAML file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read DAG config: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse DAG config YAML: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a YAML file
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write DAG config: {}", path.display()))?;

        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize DAG config to YAML")
    }

    /// Check values that would make the DAG unschedulable
    pub fn validate(&self) -> Result<()> {
        if self.dag_id.trim().is_empty() {
            eyre::bail!("DAG config has an empty dag_id");
        }
        let first_due = self
            .schedule
            .interval()
            .and_then(|interval| self.schedule.start().checked_add_signed(interval));
        if first_due.is_none() {
            eyre::bail!(
                "DAG '{}' has an invalid schedule interval of {}s",
                self.dag_id,
                self.schedule.interval_secs
            );
        }
        if seconds(self.default_args.retry_delay_secs).is_none() {
            eyre::bail!(
                "DAG '{}' has an invalid retry delay of {}s",
                self.dag_id,
                self.default_args.retry_delay_secs
            );
        }
        Ok(())
    }
}

/// When runs happen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Length of one schedule interval
    pub interval_secs: u64,
    /// First interval starts at midnight UTC on this date
    pub start_date: NaiveDate,
    /// Run every missed interval instead of only the latest one
    pub catchup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 24 * 60 * 60,
            start_date: NaiveDate::from_ymd_opt(2025, 4, 22).unwrap_or_default(),
            catchup: false,
        }
    }
}

impl ScheduleConfig {
    /// Interval length, `None` when zero or too large to represent
    pub fn interval(&self) -> Option<TimeDelta> {
        seconds(self.interval_secs).filter(|interval| *interval > TimeDelta::zero())
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start_date.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

fn seconds(secs: u64) -> Option<TimeDelta> {
    i64::try_from(secs).ok().and_then(TimeDelta::try_seconds)
}

/// Arguments applied to every task of the DAG
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DefaultArgs {
    pub owner: String,
    pub depends_on_past: bool,
    pub email_on_failure: bool,
    pub email_on_retry: bool,
    /// Extra attempts after a task's first failure
    pub retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for DefaultArgs {
    fn default() -> Self {
        Self {
            owner: "etl".to_string(),
            depends_on_past: false,
            email_on_failure: false,
            email_on_retry: false,
            retries: 1,
            retry_delay_secs: 5 * 60,
        }
    }
}

impl DefaultArgs {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Input file and target database locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub input: PathBuf,
    pub database: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("users.csv"),
            database: PathBuf::from("etl_data.db"),
        }
    }
}
