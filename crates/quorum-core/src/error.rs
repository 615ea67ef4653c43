//! Error types for threshold signing operations

use crate::session::SessionState;
use crate::ParticipantIndex;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating keys, signing or aggregating
///
/// Signature verification is deliberately absent: an invalid signature is an
/// expected outcome and is reported as `false` by [`crate::verify`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Threshold or participant count out of bounds
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Fewer distinct-index signature shares than the threshold
    #[error("Insufficient shares: required {required}, got {got}")]
    InsufficientShares { required: usize, got: usize },

    /// Nonce or commitment absent for the requested operation
    #[error("Missing state: {0}")]
    MissingState(String),

    /// Wrong-length, out-of-range or off-curve value
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A signature share does not satisfy its participant's verification equation
    #[error("Invalid signature share from participant {index}")]
    InvalidShare { index: ParticipantIndex },

    /// Session driven out of order
    #[error("Invalid session transition from {from:?} to {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },

    /// Arithmetic failure with negligible probability (identity nonce point etc.)
    #[error("Cryptographic error: {0}")]
    Crypto(String),
}
