//! Crate-level error type, composed from each component's own error.

use thiserror::Error;

use crate::codec::CodecError;

/// Failures a [`crate::node::Node`] can report to its caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    /// The proposer's secret-sharing encoding failed.
    #[error("propose failed: {0}")]
    Codec(#[from] CodecError),
}
