//! Error types shared across the RDLT pipeline.

use thiserror::Error;

/// An error raised while building or transforming an RDLT.
#[derive(Debug, Error)]
pub enum RdltError {
    #[error("invalid topology: {reason}")]
    InvalidTopology { reason: String },

    #[error("duplicate vertex: {id}")]
    DuplicateVertex { id: String },

    #[error("invalid constraint on {edge}: {reason}")]
    InvalidConstraint { edge: String, reason: String },

    #[error("unbounded reuse in RBS '{center}': {reason}")]
    UnboundedReuse { center: String, reason: String },

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl RdltError {
    pub fn topology(reason: impl Into<String>) -> Self {
        RdltError::InvalidTopology {
            reason: reason.into(),
        }
    }
}

/// Result type for RDLT operations.
pub type RdltResult<T> = Result<T, RdltError>;
