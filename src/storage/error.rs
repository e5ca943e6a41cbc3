//! Failures of the alert store
//!
//! Callers treat every variant the same way: the single alert operation is
//! abandoned and logged, and the next monitoring round retries it.

use std::fmt;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    /// The store could not be opened (bad path, unsupported backend)
    Open(String),

    Query(String),

    /// Schema migrations did not apply
    Migration(String),

    /// A row could not be mapped to or from an [`Alert`](crate::alerts::Alert)
    InvalidRecord(String),

    Io(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Open(msg) => write!(f, "cannot open alert store: {msg}"),
            StorageError::Query(msg) => write!(f, "alert query failed: {msg}"),
            StorageError::Migration(msg) => write!(f, "alert schema migration failed: {msg}"),
            StorageError::InvalidRecord(msg) => write!(f, "invalid alert record: {msg}"),
            StorageError::Io(err) => write!(f, "alert store I/O: {err}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

#[cfg(feature = "storage-sqlite")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io_err) => StorageError::Io(io_err),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::InvalidRecord(err.to_string())
            }
            _ => StorageError::Query(err.to_string()),
        }
    }
}

#[cfg(feature = "storage-sqlite")]
impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StorageError::Migration(err.to_string())
    }
}
