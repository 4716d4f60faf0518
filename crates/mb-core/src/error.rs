//! # AppError
//!
//! Centralized error handling for the message board.
//! Maps store and input failures to the taxonomy the HTTP layer folds into text.

use thiserror::Error;

/// The primary error type for all mb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Identifier does not resolve to a stored record (e.g., Thread, Reply)
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, String),

    /// Malformed identifier or missing required field
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Store failure (e.g., DB down, constraint violation)
    #[error("internal service error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// The entity name carried by a `NotFound`, if this is one.
    pub fn missing_entity(&self) -> Option<&'static str> {
        match self {
            AppError::NotFound(entity, _) => Some(*entity),
            _ => None,
        }
    }
}

/// A specialized Result type for message board logic.
pub type Result<T> = std::result::Result<T, AppError>;
