//! Error types for renderer and backend construction.
//!
//! Only construction is fallible. Frame rendering has no recoverable errors:
//! capacity pressure is handled by the flush policy and integration bugs
//! (unbalanced group stacks, unregistered queue ids) are fatal usage errors
//! that panic.

use std::fmt;

/// Errors that can occur while setting up the renderer or a backend.
#[derive(Debug)]
pub enum RenderError {
    /// A descriptor field is out of its valid range.
    InvalidDescriptor {
        /// Description of the offending field.
        message: String,
    },

    /// No suitable GPU adapter or device could be acquired.
    BackendUnavailable {
        /// Description from the graphics layer.
        message: String,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidDescriptor { message } => {
                write!(f, "invalid renderer descriptor: {}", message)
            }
            RenderError::BackendUnavailable { message } => {
                write!(f, "graphics backend unavailable: {}", message)
            }
        }
    }
}

impl std::error::Error for RenderError {}

/// Result type alias for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;
