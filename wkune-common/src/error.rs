//! Common error types for WKUNE

use thiserror::Error;

/// Common result type for WKUNE operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across WKUNE
///
/// The first group are domain outcomes: recoverable, reported to the caller
/// as a typed failure and rendered as a user-facing message. The second group
/// are infrastructure failures that abort the in-flight operation.
#[derive(Error, Debug)]
pub enum Error {
    /// No live session has this code
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// No member with this id in the session
    #[error("Member not found: {0}")]
    MemberNotFound(String),

    /// Observers cannot add items, set readiness, or accept items
    #[error("Observers cannot {0}")]
    ObserverForbidden(&'static str),

    /// Items are frozen once the member is marked ready
    #[error("Cannot change items after marking ready")]
    AlreadyReady,

    /// Normalized item is empty or already in the member's list
    #[error("Item is empty or a duplicate")]
    EmptyOrDuplicateItem,

    /// Item index outside the member's list
    #[error("Invalid item index {index} (member has {len} items)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Member insert raced another insert for the same identity
    #[error("Could not join session {0}")]
    JoinConflict(String),

    /// Operation not available in the session's current phase
    #[error("Not allowed in phase {0}")]
    WrongPhase(String),

    /// Operation reserved for the session creator
    #[error("Only the session creator can {0}")]
    NotCreator(&'static str),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored list column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for outcomes the caller can recover from by changing the request.
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            Error::Database(_)
                | Error::Serialization(_)
                | Error::Io(_)
                | Error::Config(_)
                | Error::Internal(_)
        )
    }
}
