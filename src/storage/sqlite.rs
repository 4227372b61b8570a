//! SQLite `users` table operations
//!
//! Every operation opens its own connection; nothing is shared between the
//! setup and load stages of a run. The truncate committed by setup and the
//! inserts committed by load are separate transactions, so a run that fails
//! in between leaves the table empty until the next successful run.

use crate::etl::{Initializer, Loader};
use crate::users::{StoredUser, UserRecord};

use async_trait::async_trait;
use eyre::{Context, Result};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};

const CREATE_USERS: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        first_name TEXT,
        last_name TEXT,
        email TEXT,
        gender TEXT,
        ip_address TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )";

const INSERT_USER: &str = "
    INSERT INTO users (id, first_name, last_name, email, gender, ip_address)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const SELECT_USERS: &str = "
    SELECT id, first_name, last_name, email, gender, ip_address, created_at
    FROM users
    ORDER BY id";

/// The `users` table in a SQLite database file
#[derive(Debug, Clone)]
pub struct UsersTable {
    path: PathBuf,
}

impl UsersTable {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        Connection::open(&self.path)
            .with_context(|| format!("Failed to open database: {}", self.path.display()))
    }

    /// Create the table if needed and delete every existing row
    pub fn setup(&self) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute_batch(CREATE_USERS)
            .context("Failed to create users table")?;
        let removed = tx
            .execute("DELETE FROM users", [])
            .context("Failed to clear users table")?;

        tx.commit().context("Failed to commit users table setup")?;

        log::debug!("Cleared {} existing row(s) from users", removed);
        Ok(())
    }

    /// Insert every record in one transaction, committed after the last insert
    ///
    /// The first failing insert aborts the rest and nothing is committed.
    pub fn insert_all(&self, records: &[UserRecord]) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx
                .prepare(INSERT_USER)
                .context("Failed to prepare users insert")?;

            for record in records {
                stmt.execute(params![
                    record.id,
                    record.first_name,
                    record.last_name,
                    record.email,
                    record.gender,
                    record.ip_address,
                ])
                .with_context(|| format!("Failed to insert user with id {}", record.id))?;
            }
        }

        tx.commit().context("Failed to commit users insert")?;
        Ok(records.len())
    }

    /// Number of rows currently in the table
    pub fn count(&self) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .context("Failed to count users")?;
        Ok(count as usize)
    }

    /// All rows, ordered by id
    pub fn fetch_all(&self) -> Result<Vec<StoredUser>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(SELECT_USERS)
            .context("Failed to query users")?;

        let rows = stmt.query_map([], |row| {
            Ok(StoredUser {
                record: UserRecord {
                    id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    email: row.get(3)?,
                    gender: row.get(4)?,
                    ip_address: row.get(5)?,
                },
                created_at: row.get(6)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to read users")
    }
}

impl Initializer for UsersTable {
    async fn initialize(&self) -> Result<()> {
        log::info!("Setting up users table in {}", self.path.display());
        self.setup()
    }
}

/// Loads user records into a [`UsersTable`]
#[derive(Debug, Clone)]
pub struct UsersLoader {
    table: UsersTable,
}

impl UsersLoader {
    pub fn new(table: UsersTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl Loader for UsersLoader {
    type Item = UserRecord;

    async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
        log::info!("Loading data to {}", self.table.path().display());

        let count = self.table.insert_all(&items)?;

        log::info!("Successfully loaded {} user record(s) into the database", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ann() -> UserRecord {
        UserRecord::new(1, "Ann", "Lee", "ann@x.com", "F", "1.2.3.4")
    }

    fn bo() -> UserRecord {
        UserRecord::new(2, "Bo", "Ray", "bo@x.com", "M", "5.6.7.8")
    }

    fn table(dir: &TempDir) -> UsersTable {
        UsersTable::new(dir.path().join("etl_data.db"))
    }

    #[test]
    fn test_setup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);

        table.setup().unwrap();
        table.setup().unwrap();

        assert_eq!(table.count().unwrap(), 0);
    }

    #[test]
    fn test_setup_clears_rows() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        table.setup().unwrap();
        table.insert_all(&[ann(), bo()]).unwrap();
        assert_eq!(table.count().unwrap(), 2);

        table.setup().unwrap();

        assert_eq!(table.count().unwrap(), 0);
    }

    #[test]
    fn test_setup_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let table = UsersTable::new(dir.path().join("nested/data/etl.db"));

        table.setup().unwrap();

        assert!(table.path().exists());
    }

    #[test]
    fn test_insert_and_fetch() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        table.setup().unwrap();

        let count = table.insert_all(&[bo(), ann()]).unwrap();
        assert_eq!(count, 2);

        let rows = table.fetch_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record, ann());
        assert_eq!(rows[1].record, bo());
        assert!(rows.iter().all(|row| !row.created_at.is_empty()));
    }

    #[test]
    fn test_duplicate_ids_roll_back() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        table.setup().unwrap();

        let mut duplicate = bo();
        duplicate.id = 1;
        let err = table.insert_all(&[ann(), duplicate]).unwrap_err();

        assert!(err.to_string().contains("id 1"));
        assert_eq!(table.count().unwrap(), 0);
    }

    #[test]
    fn test_collision_with_leftover_rows() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        table.setup().unwrap();
        table.insert_all(&[ann()]).unwrap();

        assert!(table.insert_all(&[bo(), ann()]).is_err());

        let rows = table.fetch_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record, ann());
    }

    #[test]
    fn test_insert_without_setup_fails() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);

        assert!(table.insert_all(&[ann()]).is_err());
    }

    #[tokio::test]
    async fn test_initializer_and_loader() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        let loader = UsersLoader::new(table.clone());

        table.initialize().await.unwrap();
        let count = loader.load(vec![ann(), bo()]).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(table.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_load_nothing() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        table.initialize().await.unwrap();

        let count = UsersLoader::new(table.clone()).load(vec![]).await.unwrap();

        assert_eq!(count, 0);
        assert_eq!(table.count().unwrap(), 0);
    }
}
