//! Integration tests for the users pipeline
//!
//! These run the real CSV extractor and SQLite loader against files in a
//! temporary directory.

use eyre::Result;
use std::path::Path;
use tempfile::TempDir;
use users_etl::cli::{run_once, users_pipeline};
use users_etl::etl::Transformer;
use users_etl::schedule::{DagConfig, PathsConfig, RunState, TaskId, TaskState};
use users_etl::{IdentityTransformer, UserRecord, UsersTable};

const HEADER: &str = "id,first_name,last_name,email,gender,ip_address";

fn write_users(path: &Path, rows: &[&str]) -> Result<()> {
    let mut content = format!("{}\n", HEADER);
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    std::fs::write(path, content)?;
    Ok(())
}

fn paths(dir: &TempDir) -> PathsConfig {
    PathsConfig {
        input: dir.path().join("users.csv"),
        database: dir.path().join("etl_data.db"),
    }
}

fn config(paths: PathsConfig) -> DagConfig {
    let mut config = DagConfig::default();
    config.default_args.retry_delay_secs = 0;
    config.paths = paths;
    config
}

fn ann() -> UserRecord {
    UserRecord::new(1, "Ann", "Lee", "ann@x.com", "F", "1.2.3.4")
}

fn bo() -> UserRecord {
    UserRecord::new(2, "Bo", "Ray", "bo@x.com", "M", "5.6.7.8")
}

#[tokio::test]
async fn test_end_to_end_two_users() -> Result<()> {
    let dir = TempDir::new()?;
    let paths = paths(&dir);
    write_users(
        &paths.input,
        &["1,Ann,Lee,ann@x.com,F,1.2.3.4", "2,Bo,Ray,bo@x.com,M,5.6.7.8"],
    )?;

    let count = users_pipeline(&paths).run().await?;
    assert_eq!(count, 2);

    let rows = UsersTable::new(&paths.database).fetch_all()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].record, ann());
    assert_eq!(rows[1].record, bo());
    assert!(rows.iter().all(|row| !row.created_at.is_empty()));

    Ok(())
}

#[tokio::test]
async fn test_every_field_round_trips() -> Result<()> {
    let dir = TempDir::new()?;
    let paths = paths(&dir);
    let lines: Vec<String> = (1..=50)
        .map(|id| {
            format!(
                "{id},First{id},Last{id},user{id}@example.com,{},10.0.0.{id}",
                if id % 2 == 0 { "Female" } else { "Male" }
            )
        })
        .collect();
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
    write_users(&paths.input, &lines)?;

    let count = users_pipeline(&paths).run().await?;
    assert_eq!(count, 50);

    let expected = users_etl::CsvReader::new(&paths.input).read()?;
    let stored: Vec<UserRecord> = UsersTable::new(&paths.database)
        .fetch_all()?
        .into_iter()
        .map(|row| row.record)
        .collect();
    assert_eq!(stored, expected);

    Ok(())
}

#[tokio::test]
async fn test_rerun_is_idempotent() -> Result<()> {
    let dir = TempDir::new()?;
    let paths = paths(&dir);
    write_users(
        &paths.input,
        &["1,Ann,Lee,ann@x.com,F,1.2.3.4", "2,Bo,Ray,bo@x.com,M,5.6.7.8"],
    )?;
    let table = UsersTable::new(&paths.database);

    users_pipeline(&paths).run().await?;
    let first: Vec<UserRecord> = table.fetch_all()?.into_iter().map(|r| r.record).collect();

    users_pipeline(&paths).run().await?;
    let second: Vec<UserRecord> = table.fetch_all()?.into_iter().map(|r| r.record).collect();

    assert_eq!(first, second);
    assert_eq!(table.count()?, 2);

    Ok(())
}

#[tokio::test]
async fn test_rerun_replaces_previous_contents() -> Result<()> {
    let dir = TempDir::new()?;
    let paths = paths(&dir);
    let table = UsersTable::new(&paths.database);

    write_users(
        &paths.input,
        &["1,Ann,Lee,ann@x.com,F,1.2.3.4", "2,Bo,Ray,bo@x.com,M,5.6.7.8"],
    )?;
    users_pipeline(&paths).run().await?;

    write_users(&paths.input, &["2,Bo,Ray,bo@new.com,M,5.6.7.8"])?;
    users_pipeline(&paths).run().await?;

    let rows = table.fetch_all()?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record.email, "bo@new.com");

    Ok(())
}

#[tokio::test]
async fn test_duplicate_ids_fail_the_run() -> Result<()> {
    let dir = TempDir::new()?;
    let paths = paths(&dir);
    write_users(
        &paths.input,
        &["1,Ann,Lee,ann@x.com,F,1.2.3.4", "1,Bo,Ray,bo@x.com,M,5.6.7.8"],
    )?;

    let run = run_once(config(paths.clone())).await?;

    assert_eq!(run.state, RunState::Failed);
    assert_eq!(run.failed_task(), Some(TaskId::Load));
    // Retried once, same input both times
    assert_eq!(run.task(TaskId::Load).map(|t| t.try_number), Some(2));
    assert_eq!(UsersTable::new(&paths.database).count()?, 0);

    Ok(())
}

#[tokio::test]
async fn test_missing_input_fails_at_extract() -> Result<()> {
    let dir = TempDir::new()?;
    let paths = paths(&dir);
    write_users(&paths.input, &["1,Ann,Lee,ann@x.com,F,1.2.3.4"])?;
    users_pipeline(&paths).run().await?;
    std::fs::remove_file(&paths.input)?;

    let run = run_once(config(paths.clone())).await?;

    assert_eq!(run.state, RunState::Failed);
    assert_eq!(run.failed_task(), Some(TaskId::Extract));
    assert_eq!(
        run.task(TaskId::Load).map(|t| t.state),
        Some(TaskState::UpstreamFailed)
    );
    // Setup already truncated the table before extraction failed
    assert_eq!(UsersTable::new(&paths.database).count()?, 0);
    assert!(run.into_result().is_err());

    Ok(())
}

#[tokio::test]
async fn test_missing_column_fails_before_load() -> Result<()> {
    let dir = TempDir::new()?;
    let paths = paths(&dir);
    std::fs::write(&paths.input, "id,first_name,last_name,email\n1,Ann,Lee,ann@x.com\n")?;

    let run = run_once(config(paths)).await?;

    assert_eq!(run.failed_task(), Some(TaskId::Extract));
    let message = format!("{:#}", run.into_result().unwrap_err());
    assert!(message.contains("gender"));
    assert!(message.contains("ip_address"));

    Ok(())
}

#[tokio::test]
async fn test_empty_input_loads_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let paths = paths(&dir);
    write_users(&paths.input, &[])?;

    let run = run_once(config(paths.clone())).await?;

    assert!(run.is_success());
    assert_eq!(run.loaded, Some(0));
    assert_eq!(UsersTable::new(&paths.database).count()?, 0);

    Ok(())
}

#[test]
fn test_identity_transformer_law() -> Result<()> {
    let records = vec![bo(), ann(), bo()];
    let output = IdentityTransformer::new().transform_many(records.clone())?;

    assert_eq!(output.len(), records.len());
    assert_eq!(output, records);

    Ok(())
}
