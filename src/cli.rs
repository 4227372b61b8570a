//! CLI helper functions

use crate::{
    etl::{IdentityTransformer, Pipeline},
    schedule::{Dag, DagConfig, DagRun, PathsConfig, RunKind, Scheduler, TaskId},
    storage::{CsvReader, UsersLoader, UsersTable},
    users::{StoredUser, UserRecord},
};
use chrono::Utc;
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// The users pipeline: CSV → identity → SQLite
pub type UsersPipeline =
    Pipeline<UsersTable, CsvReader, IdentityTransformer<UserRecord>, UsersLoader>;

pub type UsersDag = Dag<UsersTable, CsvReader, IdentityTransformer<UserRecord>, UsersLoader>;

/// Build the users pipeline for the configured paths
pub fn users_pipeline(paths: &PathsConfig) -> UsersPipeline {
    let table = UsersTable::new(&paths.database);
    Pipeline::new(
        table.clone(),
        CsvReader::new(&paths.input),
        IdentityTransformer::new(),
        UsersLoader::new(table),
    )
}

/// Register the users DAG
pub fn users_dag(config: DagConfig) -> Result<UsersDag> {
    let pipeline = users_pipeline(&config.paths);
    Dag::register(config, pipeline)
}

/// Load the DAG configuration, applying path overrides
///
/// Without a config file the defaults are used.
pub fn load_config(
    config_path: Option<&Path>,
    input: Option<PathBuf>,
    database: Option<PathBuf>,
) -> Result<DagConfig> {
    let mut config = match config_path {
        Some(path) => {
            log::debug!("Reading DAG config from {}", path.display());
            DagConfig::read(path)?
        }
        None => DagConfig::default(),
    };

    if let Some(input) = input {
        config.paths.input = input;
    }
    if let Some(database) = database {
        config.paths.database = database;
    }

    Ok(config)
}

/// Trigger one manual run of the users DAG now
pub async fn run_once(config: DagConfig) -> Result<DagRun> {
    log::info!(
        "Running {} from {} into {}",
        config.dag_id.cyan(),
        config.paths.input.display().bright_black(),
        config.paths.database.display().bright_black()
    );

    let dag = users_dag(config)?;
    let run = dag.run(Utc::now(), RunKind::Manual).await;

    for task in &run.tasks {
        log::debug!(
            "  {} {} (tries: {})",
            task.task_id,
            task.state,
            task.try_number
        );
    }

    Ok(run)
}

/// Create the users table and clear it
pub fn setup_database(config: &DagConfig) -> Result<()> {
    let table = UsersTable::new(&config.paths.database);
    table.setup()?;
    log::info!(
        "✓ Users table ready in {}",
        table.path().display().bright_black()
    );
    Ok(())
}

/// Run the scheduler until interrupted
pub async fn schedule(config: DagConfig) -> Result<()> {
    let dag = users_dag(config)?;
    Scheduler::new(dag).run_forever().await
}

/// Rows currently stored in the users table
pub fn list_users(config: &DagConfig) -> Result<Vec<StoredUser>> {
    let table = UsersTable::new(&config.paths.database);
    if !table.path().exists() {
        eyre::bail!("Database not found: {}", table.path().display());
    }
    table.fetch_all()
}

/// Task order and effective configuration, as printed by `show`
pub fn describe(config: &DagConfig) -> Result<String> {
    let tasks = TaskId::ORDER
        .iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(" >> ");

    Ok(format!("# tasks: {}\n{}", tasks, config.to_yaml()?))
}

/// Write the default configuration to a new file
pub fn init_config(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        eyre::bail!("Config file already exists: {}", path.display());
    }

    DagConfig::default()
        .write(path)
        .with_context(|| format!("Failed to initialize config at {}", path.display()))?;

    log::info!("✓ Wrote default config to {}", path.display().bright_black());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_defaults_and_overrides() {
        let config = load_config(None, Some(PathBuf::from("in.csv")), None).unwrap();
        assert_eq!(config.paths.input, PathBuf::from("in.csv"));
        assert_eq!(config.paths.database, PathBuf::from("etl_data.db"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.yml");
        assert!(load_config(Some(path.as_path()), None, None).is_err());
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dag.yml");

        init_config(&path).unwrap();
        assert_eq!(DagConfig::read(&path).unwrap(), DagConfig::default());
        assert!(init_config(&path).is_err());
    }

    #[test]
    fn test_describe_lists_tasks() {
        let text = describe(&DagConfig::default()).unwrap();
        assert!(text.starts_with(
            "# tasks: start >> setup_database >> extract >> transform >> load >> end"
        ));
        assert!(text.contains("dag_id: users_etl_pipeline"));
    }

    #[test]
    fn test_list_users_without_database() {
        let temp = TempDir::new().unwrap();
        let mut config = DagConfig::default();
        config.paths.database = temp.path().join("missing.db");

        assert!(list_users(&config).is_err());
    }
}
