//! Unified error types for the GiftLink core.
//!
//! Two of these variants are expected, recoverable outcomes that route handlers
//! surface directly to users: [`Error::Validation`] (malformed input, rejected
//! before any mutation) and [`Error::Guard`] (a legal-but-disallowed lifecycle
//! transition, also rejected with no mutation). [`Error::Compensation`] is the
//! one unrecoverable case - a points debit succeeded, the following state
//! mutation failed, and the compensating credit failed too. It represents real
//! balance drift and is logged before being surfaced.

use thiserror::Error;

/// Errors produced by the GiftLink core.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input, with one message per offending field.
    #[error("Validation failed: {}", details.join("; "))]
    Validation { details: Vec<String> },

    /// A disallowed transition: wrong actor, wrong state, insufficient points,
    /// quota exceeded, duplicate pending request, or self-request. The reason
    /// string is user-facing and displayed by the calling UI as-is.
    #[error("{reason}")]
    Guard { reason: String },

    /// Unknown item id in both the current and the legacy store, or the item
    /// has been soft-deleted.
    #[error("Item not found: {id}")]
    ItemNotFound { id: String },

    #[error("User not found: {id}")]
    UserNotFound { id: String },

    /// A debit succeeded but both the follow-up mutation and the compensating
    /// credit failed. The user is under-credited by `amount` points.
    #[error("Compensation failed: {amount} points not returned to user {user_id}")]
    Compensation { user_id: String, amount: i64 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl Error {
    /// Shorthand for a [`Error::Guard`] with the given user-facing reason.
    pub fn guard(reason: impl Into<String>) -> Self {
        Self::Guard {
            reason: reason.into(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
