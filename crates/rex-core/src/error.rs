//! # Error Module
//!
//! The single error type of the engine.

use crate::PostId;
use thiserror::Error;

/// Errors produced by the staging engine and its stores.
///
/// `NotFound` and `Forbidden` are always raised before any mutation, so a
/// failing call never leaves a partial write behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RexError {
    /// The targeted content item does not exist.
    #[error("content item {0} not found")]
    NotFound(PostId),

    /// The caller lacks a capability the operation needs.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A field could not be interpreted (unknown status, bad post type, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A snapshot could not be encoded or decoded.
    #[error("format error: {0}")]
    Format(String),
}

impl RexError {
    pub(crate) fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// Wrap a backend error (redb, I/O) as a storage failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}
