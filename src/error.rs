//! Error taxonomy for the sync engine.
//!
//! Any error from any updater aborts the whole batch: the transaction is
//! rolled back and no events are published. The message always names the
//! offending entity so a client can locate it in the batch it sent.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A referenced entity does not exist (the list behind a share, the
    /// user behind an invitation, ...).
    #[error("not found: {0}")]
    NotFound(String),

    /// Ownership or authority violation, e.g. mutating another user's list.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Structurally invalid or policy-violating payload.
    #[error("validation: {0}")]
    Validation(String),

    /// Internal consistency violation between stored entities.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl SyncError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        SyncError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        SyncError::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        SyncError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        SyncError::Conflict(msg.into())
    }
}
