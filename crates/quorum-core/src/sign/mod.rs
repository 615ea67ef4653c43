//! Threshold signing module
//!
//! One signing session runs in three local steps per participant plus one
//! aggregation step:
//!
//! 1. [`commit`] draws a single-use nonce `k_i` and broadcasts `R_i = k_i·G`
//! 2. [`sign`] computes `z_i = k_i + c·x_i` against the full commitment set
//! 3. [`combine`] checks every `z_i`, interpolates them at zero and emits the
//!    signature
//!
//! The challenge `c` is derived by the session context from the message and the
//! commitment set in canonical order, so partial signers and the aggregator
//! always agree on it.

mod aggregate;
pub(crate) mod context;
mod nonce;
mod partial;

pub use aggregate::combine;
pub use nonce::{commit, commit_with_rng};
pub use partial::sign;
