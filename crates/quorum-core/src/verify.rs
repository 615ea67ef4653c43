//! Signature verification
//!
//! Verification never errors: malformed encodings, off-curve keys and failed
//! equations all come back as `false`.

use crate::encoding::{point_from_coordinates, scalar_from_bytes, scalar_to_bytes, y_is_odd};
use crate::sign::context::{challenge, message_hash};
use crate::{GroupPublicKey, Result, Signature};
use k256::ProjectivePoint;
use subtle::ConstantTimeEq;
use tracing::debug;

/// Check an aggregated signature against the group public key
///
/// Recomputes the group nonce point `R' = r·G − s·Y` and accepts iff
/// `H(h ‖ R' ‖ Y)` equals `s` and the parity of `R'.y` equals the recovery id.
pub fn verify(message: &[u8], signature: &Signature, group_public_key: &GroupPublicKey) -> bool {
    match check(message, signature, &group_public_key.0) {
        Ok(valid) => valid,
        Err(e) => {
            debug!(error = %e, "Rejecting malformed signature");
            false
        }
    }
}

/// [`verify`] over raw boundary encodings
///
/// `r` and `s` are 32-byte big-endian scalars; the key is given as affine
/// coordinates.
pub fn verify_encoded(
    message: &[u8],
    r: &[u8],
    s: &[u8],
    recovery_id: u8,
    key_x: &[u8],
    key_y: &[u8],
) -> bool {
    let decoded = (|| -> Result<(Signature, ProjectivePoint)> {
        let signature = Signature::new(
            scalar_to_bytes(&scalar_from_bytes(r)?),
            scalar_to_bytes(&scalar_from_bytes(s)?),
            recovery_id,
        );
        Ok((signature, point_from_coordinates(key_x, key_y)?))
    })();

    match decoded {
        Ok((signature, key)) => verify(message, &signature, &GroupPublicKey(key)),
        Err(e) => {
            debug!(error = %e, "Rejecting malformed signature encoding");
            false
        }
    }
}

fn check(message: &[u8], signature: &Signature, group_key: &ProjectivePoint) -> Result<bool> {
    if *group_key == ProjectivePoint::IDENTITY || signature.recovery_id > 1 {
        return Ok(false);
    }

    let r = scalar_from_bytes(&signature.r)?;
    let s = scalar_from_bytes(&signature.s)?;

    let nonce_point = ProjectivePoint::GENERATOR * r - *group_key * s;
    if nonce_point == ProjectivePoint::IDENTITY {
        return Ok(false);
    }

    let expected = scalar_to_bytes(&challenge(&message_hash(message), &nonce_point, group_key));
    let challenge_matches = bool::from(expected.ct_eq(&signature.s));
    let parity_matches = u8::from(y_is_odd(&nonce_point)) == signature.recovery_id;

    Ok(challenge_matches && parity_matches)
}
