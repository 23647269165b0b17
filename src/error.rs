//! # Error Types
//!
//! This module defines error types used throughout the docflow library.

use thiserror::Error;

use crate::field::FieldError;

/// Main error type for docflow operations
#[derive(Debug, Error)]
pub enum DocflowError {
    /// Backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Request never produced a response (connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response or stored JSON could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Field failed validation
    #[error("Invalid field: {0}")]
    Field(#[from] FieldError),

    /// Workflow action not allowed from the current status
    #[error("Workflow error: {0}")]
    Workflow(String),

    /// Viewer lacks the task role required for an operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Write attempted against a completed document
    #[error("Document is immutable: {0}")]
    Immutable(String),

    /// Unknown field, document or template id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Overlay rendering error
    #[error("Render error: {0}")]
    Render(String),

    /// Image processing error
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocflowError {
    /// HTTP status carried by an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            DocflowError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
