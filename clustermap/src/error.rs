//! Error types used by the crate.

use thiserror::Error;

/// Clustering engine error type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClusterError {
    /// Cluster radius must be a positive finite number of pixels.
    #[error("cluster radius must be positive, got {0}")]
    InvalidRadius(f64),
    /// Icon cache must be able to hold at least one badge.
    #[error("icon cache capacity must be positive, got {0}")]
    InvalidCapacity(usize),
    /// Size buckets must be positive and strictly increasing.
    #[error("invalid size buckets: {0}")]
    InvalidBuckets(String),
    /// Maximum clustering zoom must be a number.
    #[error("invalid max cluster zoom: {0}")]
    InvalidZoom(f64),
    /// Visible region padding must be a non-negative finite number.
    #[error("invalid visible region padding: {0}")]
    InvalidPadding(f64),
    /// The engine was created outside of a tokio runtime.
    #[error("clustering engine requires a running tokio runtime")]
    NoRuntime,
    /// Failed to render a badge image.
    #[error("failed to render badge: {0}")]
    Render(String),
    /// Clustering pass failed on the compute context.
    #[error("clustering failed: {0}")]
    Compute(String),
    /// The engine has been disposed.
    #[error("engine is disposed")]
    Disposed,
}
