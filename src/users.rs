//! User records flowing through the pipeline

use serde::Deserialize;

/// Columns every input file must provide, in insert order
pub const COLUMNS: [&str; 6] = [
    "id",
    "first_name",
    "last_name",
    "email",
    "gender",
    "ip_address",
];

/// One row of the input file and of the `users` table
///
/// Values are carried verbatim from the source; nothing is validated beyond
/// `id` being an integer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub ip_address: String,
}

impl UserRecord {
    pub fn new(
        id: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        gender: impl Into<String>,
        ip_address: impl Into<String>,
    ) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            gender: gender.into(),
            ip_address: ip_address.into(),
        }
    }
}

/// A user row read back from the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub record: UserRecord,
    /// Assigned by the store when the row was inserted
    pub created_at: String,
}
