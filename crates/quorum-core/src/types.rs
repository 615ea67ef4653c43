//! Core types shared by key generation, signing and verification

use crate::encoding::{self, bytes32_hex, point_xy, scalar_hex};
use crate::Result;
use k256::{ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// 1-based index of a participant within its group
pub type ParticipantIndex = u16;

/// Monotonic identifier of one signing session
pub type SessionId = u64;

/// A participant's private share `f(i)` of the group secret
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretShare {
    /// Participant index `i`
    pub index: ParticipantIndex,

    /// Share value `f(i) mod order`
    #[serde(with = "scalar_hex")]
    pub(crate) value: Scalar,
}

impl SecretShare {
    /// Rebuild a share from its boundary encoding
    pub fn from_bytes(index: ParticipantIndex, value: &[u8]) -> Result<Self> {
        Ok(Self {
            index,
            value: encoding::scalar_from_bytes(value)?,
        })
    }

    /// Public commitment `value·G` matching this share
    pub fn public_share(&self) -> PublicShare {
        PublicShare {
            index: self.index,
            point: ProjectivePoint::GENERATOR * self.value,
        }
    }
}

impl fmt::Debug for SecretShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretShare")
            .field("index", &self.index)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Public commitment `share·G` for one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicShare {
    /// Participant index
    pub index: ParticipantIndex,

    /// Point `share·G`
    #[serde(with = "point_xy")]
    pub point: ProjectivePoint,
}

/// Public key of the jointly held secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupPublicKey(#[serde(with = "point_xy")] pub(crate) ProjectivePoint);

impl GroupPublicKey {
    /// Decode from affine coordinates, rejecting off-curve points
    pub fn from_coordinates(x: &[u8], y: &[u8]) -> Result<Self> {
        encoding::point_from_coordinates(x, y).map(Self)
    }

    /// Affine `(x, y)` coordinates
    pub fn to_coordinates(&self) -> Result<([u8; 32], [u8; 32])> {
        encoding::point_to_coordinates(&self.0)
    }

    /// Underlying curve point
    pub fn as_point(&self) -> &ProjectivePoint {
        &self.0
    }

    /// Compressed SEC1 encoding, for display
    pub fn to_hex(&self) -> String {
        use k256::elliptic_curve::sec1::ToEncodedPoint;
        hex::encode(self.0.to_affine().to_encoded_point(true).as_bytes())
    }
}

/// Public half of a nonce commitment, broadcast to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    /// Committing participant
    pub participant_index: ParticipantIndex,

    /// Point `nonce·G`
    #[serde(with = "point_xy")]
    pub point: ProjectivePoint,
}

/// Secret half of a nonce commitment
///
/// Neither `Clone` nor `Copy` and not serializable: [`crate::sign`] takes it
/// by value, so a nonce can feed at most one signature share. The secret is
/// wiped when the value is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningNonce {
    pub(crate) participant_index: ParticipantIndex,
    pub(crate) secret: Scalar,
    #[zeroize(skip)]
    pub(crate) commitment: ProjectivePoint,
}

impl SigningNonce {
    /// Participant this nonce was drawn for
    pub fn participant_index(&self) -> ParticipantIndex {
        self.participant_index
    }

    /// The public commitment paired with this nonce
    pub fn commitment(&self) -> Commitment {
        Commitment {
            participant_index: self.participant_index,
            point: self.commitment,
        }
    }
}

impl fmt::Debug for SigningNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningNonce")
            .field("participant_index", &self.participant_index)
            .finish_non_exhaustive()
    }
}

/// One participant's contribution `z_i = k_i + c·x_i`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureShare {
    /// Participant index
    pub index: ParticipantIndex,

    /// Share value
    #[serde(with = "scalar_hex")]
    pub value: Scalar,
}

impl SignatureShare {
    /// Rebuild a share from its boundary encoding
    pub fn from_bytes(index: ParticipantIndex, value: &[u8]) -> Result<Self> {
        Ok(Self {
            index,
            value: encoding::scalar_from_bytes(value)?,
        })
    }
}

/// Aggregated threshold Schnorr signature
///
/// `r` is the interpolated response scalar, `s` the challenge it was computed
/// against, and `recovery_id` the parity of the group nonce point's `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Response scalar
    #[serde(with = "bytes32_hex")]
    pub r: [u8; 32],
    /// Challenge scalar
    #[serde(with = "bytes32_hex")]
    pub s: [u8; 32],
    /// Group nonce `y` parity (0 or 1)
    pub recovery_id: u8,
}

impl Signature {
    /// Create a new signature
    pub fn new(r: [u8; 32], s: [u8; 32], recovery_id: u8) -> Self {
        Self { r, s, recovery_id }
    }

    /// Convert to bytes (r || s || v)
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.recovery_id;
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_share_debug_is_redacted() {
        let share = SecretShare {
            index: 3,
            value: Scalar::from(12345u64),
        };
        let rendered = format!("{:?}", share);
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("3039"));
    }

    #[test]
    fn test_public_share_json() {
        let share = SecretShare {
            index: 2,
            value: Scalar::from(99u64),
        };
        let public = share.public_share();
        let json = serde_json::to_string(&public).unwrap();
        let back: PublicShare = serde_json::from_str(&json).unwrap();
        assert_eq!(back, public);
    }

    #[test]
    fn test_secret_share_rejects_out_of_range() {
        assert!(SecretShare::from_bytes(1, &[0xff; 32]).is_err());
        assert!(SecretShare::from_bytes(1, &[0x01; 16]).is_err());
    }

    #[test]
    fn test_signature_bytes_layout() {
        let sig = Signature::new([1u8; 32], [2u8; 32], 1);
        let bytes = sig.to_bytes();
        assert_eq!(&bytes[..32], &[1u8; 32]);
        assert_eq!(&bytes[32..64], &[2u8; 32]);
        assert_eq!(bytes[64], 1);
    }
}
