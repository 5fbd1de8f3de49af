use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by record persistence.
pub enum RecordStoreError {
    /// Database directory could not be created.
    #[error("failed to create database directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not open the database.
    #[error("failed to open database '{path}': {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    /// Schema migration failed.
    #[error("failed to run schema migration: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A statement failed.
    #[error("{operation} failed: {source}")]
    Query {
        /// What was being done.
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Store is not accepting requests.
    #[error("record store unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },
}

impl RecordStoreError {
    pub(crate) fn query(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Query { operation, source }
    }
}
