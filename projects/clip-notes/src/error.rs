//! Error taxonomy shared by the annotation engine.

use thiserror::Error;

pub type AnnotateResult<T> = Result<T, AnnotateError>;

#[derive(Debug, Error)]
pub enum AnnotateError {
    /// Geometry fed a non-positive or non-finite size, usually because the
    /// content metadata has not loaded yet.
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    /// A capture or replay context with zero display area.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("invalid comment: {0}")]
    InvalidComment(String),

    #[error("preview sampling failed: {0}")]
    SampleFailed(String),

    /// A newer sample request or a teardown superseded this one.
    #[error("preview sampling abandoned")]
    SampleAbandoned,

    #[error("persistence failed: {0}")]
    PersistenceFailed(String),
}

impl AnnotateError {
    pub fn invalid_dimension(msg: impl Into<String>) -> Self {
        Self::InvalidDimension(msg.into())
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateGeometry(msg.into())
    }

    pub fn invalid_comment(msg: impl Into<String>) -> Self {
        Self::InvalidComment(msg.into())
    }

    pub fn sample_failed(msg: impl Into<String>) -> Self {
        Self::SampleFailed(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceFailed(msg.into())
    }
}
