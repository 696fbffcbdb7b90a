//! Error taxonomy for API access and response decoding.
//!
//! Only transport and shape failures are errors. Bad individual cells are
//! handled by [`crate::models::Field`] coercion and never show up here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdbError {
    /// Network failure, timeout, or a non-success HTTP status.
    #[error("request failed: {0}")]
    Transport(String),
    /// The body could not be parsed as JSON.
    #[error("failed to decode response as JSON: {0}")]
    Decode(String),
    /// Parsed JSON does not look like an IDB table.
    #[error("unexpected response shape: {0}")]
    Shape(String),
    /// Well-formed response without any data rows.
    #[error("no data returned for {0}")]
    NoData(String),
    /// A country code that cannot be a GENC code; rejected before any request.
    #[error("invalid country code {0:?}")]
    InvalidCode(String),
}

/// Coarse classification used to pick the user-facing error path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fetch rejected or body unreadable.
    Transport,
    /// Response (or request) does not have a usable shape; the detail view shows "not found".
    Shape,
}

impl IdbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdbError::Transport(_) | IdbError::Decode(_) => ErrorKind::Transport,
            IdbError::Shape(_) | IdbError::NoData(_) | IdbError::InvalidCode(_) => ErrorKind::Shape,
        }
    }
}
