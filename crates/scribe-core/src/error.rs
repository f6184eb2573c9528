//! Error types for scribe-core

use thiserror::Error;

/// Result type alias using scribe-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// `SQLITE_BUSY` primary result code
const SQLITE_BUSY: i32 = 5;
/// `SQLITE_LOCKED` primary result code
const SQLITE_LOCKED: i32 = 6;

/// Errors that can occur in scribe-core storage operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// The store is busy or locked by another writer
    #[error("Database is locked: {0}")]
    Locked(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is store contention that may clear up on retry.
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }
}

impl From<libsql::Error> for Error {
    fn from(error: libsql::Error) -> Self {
        if is_contention(&error) {
            Self::Locked(error.to_string())
        } else {
            Self::LibSql(error)
        }
    }
}

fn is_contention(error: &libsql::Error) -> bool {
    if let libsql::Error::SqliteFailure(code, _) = error {
        // Extended result codes keep the primary code in the low byte.
        let primary = *code & 0xff;
        if primary == SQLITE_BUSY || primary == SQLITE_LOCKED {
            return true;
        }
    }

    let message = error.to_string().to_ascii_lowercase();
    message.contains("database is locked") || message.contains("database table is locked")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_and_locked_codes_map_to_locked() {
        let busy = Error::from(libsql::Error::SqliteFailure(5, "busy".to_string()));
        assert!(busy.is_locked());

        // SQLITE_BUSY_SNAPSHOT = 517
        let busy_snapshot = Error::from(libsql::Error::SqliteFailure(517, "snap".to_string()));
        assert!(busy_snapshot.is_locked());

        let locked = Error::from(libsql::Error::SqliteFailure(6, "locked".to_string()));
        assert!(locked.is_locked());
    }

    #[test]
    fn locked_message_maps_to_locked() {
        let error = Error::from(libsql::Error::SqliteFailure(
            1,
            "database is locked".to_string(),
        ));
        assert!(error.is_locked());
    }

    #[test]
    fn constraint_failure_is_not_locked() {
        let error = Error::from(libsql::Error::SqliteFailure(
            19,
            "FOREIGN KEY constraint failed".to_string(),
        ));
        assert!(!error.is_locked());
        assert!(matches!(error, Error::LibSql(_)));
    }
}
