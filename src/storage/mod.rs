//! File and database storage
//!
//! This module handles the pipeline's I/O:
//! - CSV input file reading
//! - SQLite `users` table setup and loading

mod csv;
mod sqlite;

pub use self::csv::CsvReader;
pub use self::sqlite::{UsersLoader, UsersTable};
