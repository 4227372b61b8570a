//! CSV input file operations

use crate::etl::Extractor;
use crate::users::{COLUMNS, UserRecord};

use eyre::{Context, Result};
use std::path::{Path, PathBuf};

/// Read user records from a CSV file with a header row
///
/// Columns are matched by name, so their order in the file does not matter
/// and extra columns are ignored.
#[derive(Debug, Clone)]
pub struct CsvReader {
    path: PathBuf,
}

impl CsvReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record, in file order
    ///
    /// # Errors
    /// Fails if the file is absent, a required column is missing from the
    /// header, or a row cannot be parsed.
    pub fn read(&self) -> Result<Vec<UserRecord>> {
        let mut reader = ::csv::ReaderBuilder::new()
            .trim(::csv::Trim::Headers)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header: {}", self.path.display()))?
            .clone();

        let missing: Vec<&str> = COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .collect();
        if !missing.is_empty() {
            eyre::bail!(
                "CSV file {} is missing required column(s): {}",
                self.path.display(),
                missing.join(", ")
            );
        }

        reader
            .deserialize::<UserRecord>()
            .enumerate()
            .map(|(index, row)| {
                // Header is line 1
                row.with_context(|| {
                    format!(
                        "Failed to parse line {} of {}",
                        index + 2,
                        self.path.display()
                    )
                })
            })
            .collect()
    }
}

impl Extractor for CsvReader {
    type Item = UserRecord;

    async fn extract(&self) -> Result<Vec<Self::Item>> {
        log::info!("Extracting data from {}", self.path.display());
        self.read()
    }
}
