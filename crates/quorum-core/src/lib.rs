//! # Quorum Core
//!
//! Engine for `t`-of-`n` threshold Schnorr signatures over secp256k1.
//!
//! This crate provides:
//! - Share generation with Feldman commitments, and proactive refresh
//! - Single-use nonce commitments
//! - Partial signing and Lagrange-based aggregation
//! - Verification that fails closed
//! - Session state machines and authorization request binding
//!
//! ## Scheme
//!
//! Shares are evaluations `x_i = f(i)` of a random polynomial whose constant
//! term is the group secret; the group key is `Y = f(0)·G`. For a signing set
//! `S` with Lagrange weights `λ_i` at zero, the session nonce point is
//! `R = Σ λ_i·R_i`, the challenge is `c = H(h ‖ R ‖ Y)` and each participant
//! contributes `z_i = k_i + c·x_i`. The aggregate `z = Σ λ_i·z_i` satisfies
//! `z·G = R + c·Y`, which the verifier checks as `H(h ‖ z·G − c·Y ‖ Y) = c`.
//!
//! ## Example
//!
//! ```rust
//! use quorum_core::{combine, commit, generate, sign, verify};
//!
//! let set = generate(5, 3).unwrap();
//! let signers = [1, 2, 4].map(|i| set.share(i).unwrap());
//!
//! let (nonces, commitments): (Vec<_>, Vec<_>) = signers.iter().map(|s| commit(s)).unzip();
//! let shares: Vec<_> = signers
//!     .iter()
//!     .zip(nonces)
//!     .map(|(share, nonce)| sign(b"test", share, nonce, &commitments, set.public_shares()).unwrap())
//!     .collect();
//!
//! let signature = combine(b"test", &shares, &commitments, set.public_shares(), 3).unwrap();
//! assert!(verify(b"test", &signature, set.group_public_key()));
//! ```

pub mod authz;
pub mod encoding;
pub mod error;
pub mod keygen;
mod math;
pub mod params;
pub mod session;
pub mod sign;
pub mod types;
mod verify;

pub use error::{Error, Result};
pub use keygen::{generate, verify_share, KeyShareSet, PublicKeyPackage};
pub use params::GroupParams;
pub use session::{session_message, SessionState, SignerSession, SigningSession};
pub use sign::{combine, commit, sign};
pub use types::{
    Commitment, GroupPublicKey, ParticipantIndex, PublicShare, SecretShare, SessionId, Signature,
    SignatureShare, SigningNonce,
};
pub use verify::{verify, verify_encoded};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
