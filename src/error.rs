//! Error types for the queue, vote and history stores

use thiserror::Error;

/// Result type used by the store layer
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the store layer
#[derive(Error, Debug)]
pub enum Error {
    /// A unique key (catalog URL, username) already exists
    #[error("Duplicate {entity}: {key}")]
    DuplicateKey { entity: &'static str, key: String },

    /// Voting on, or dequeuing, something that does not exist
    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    /// The playback backend reported a slot id that matches no queue entry
    #[error("No queue entry matches backend slot {slot_id}")]
    BestEffortMismatch { slot_id: i64 },

    /// A multi-step write could not complete and was rolled back
    #[error("Transaction aborted: {0}")]
    TransactionAborted(#[source] sqlx::Error),

    /// A priority at `i64::MAX` leaves no room for the next entry
    #[error("Queue priority {0} leaves no room for later entries")]
    PriorityOverflow(i64),

    /// Vote direction outside of -1, 0, 1
    #[error("Invalid vote direction: {0}")]
    InvalidDirection(i64),

    /// Requested row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    /// Classify a raw sqlx error raised while writing `entity` keyed by `key`.
    pub fn from_write(err: sqlx::Error, entity: &'static str, key: impl Into<String>) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Error::DuplicateKey {
                    entity,
                    key: key.into(),
                };
            }
            if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                return Error::ReferentialIntegrity(format!("{} {}: {}", entity, key.into(), db_err));
            }
        }
        Error::Database(err)
    }

    /// Wrap a failure that happened inside a unit of work.
    ///
    /// Integrity errors keep their classification, everything else becomes
    /// `TransactionAborted`.
    pub fn aborted(err: Error) -> Self {
        match err {
            Error::Database(e) => Error::TransactionAborted(e),
            other => other,
        }
    }

    /// True if this is a unique-key conflict.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::DuplicateKey { .. })
    }
}
