//! Signature share aggregation

use super::context::SessionContext;
use crate::encoding::{scalar_to_bytes, y_is_odd};
use crate::{
    Commitment, Error, ParticipantIndex, PublicShare, Result, Signature, SignatureShare,
};
use k256::{ProjectivePoint, Scalar};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Combine signature shares into a single signature
///
/// Every committed participant must have contributed exactly one share, and
/// at least `threshold` distinct participants must be present. Each share is
/// checked against its participant's public share before interpolation, so a
/// bad contribution is attributed instead of silently producing an invalid
/// signature.
///
/// # Returns
/// `r` = `Σ λ_i·z_i`, `s` = the session challenge, `recovery_id` = parity of
/// the group nonce point. Verification recomputes the nonce point as
/// `r·G − s·Y` and checks it hashes back to `s`.
#[instrument(skip_all, fields(shares = signature_shares.len(), threshold = threshold))]
pub fn combine(
    message: &[u8],
    signature_shares: &[SignatureShare],
    commitments: &[Commitment],
    public_shares: &[PublicShare],
    threshold: ParticipantIndex,
) -> Result<Signature> {
    let mut by_index: BTreeMap<ParticipantIndex, Scalar> = BTreeMap::new();
    let mut duplicated = false;
    for share in signature_shares {
        duplicated |= by_index.insert(share.index, share.value).is_some();
    }

    if by_index.len() < threshold as usize {
        return Err(Error::InsufficientShares {
            required: threshold as usize,
            got: by_index.len(),
        });
    }
    if duplicated {
        return Err(Error::MalformedInput(
            "Signature shares contain a duplicate index".into(),
        ));
    }

    let context = SessionContext::new(message, commitments, public_shares)?;

    if let Some(stray) = by_index.keys().find(|index| context.commitment(**index).is_none()) {
        return Err(Error::MalformedInput(format!(
            "Signature share from participant {} without a commitment",
            stray
        )));
    }
    if let Some(absent) = context.indices().find(|index| !by_index.contains_key(index)) {
        return Err(Error::MissingState(format!(
            "No signature share from committed participant {}",
            absent
        )));
    }

    let mut combined = Scalar::ZERO;
    for (index, value) in &by_index {
        verify_signature_share(&context, *index, value)?;
        let lambda = context
            .lambda(*index)
            .ok_or_else(|| Error::MissingState(format!("No Lagrange weight for participant {}", index)))?;
        combined += *value * lambda;
    }
    debug!("Signature shares verified and interpolated");

    let recovery_id = u8::from(y_is_odd(&context.group_commitment));
    let signature = Signature::new(
        scalar_to_bytes(&combined),
        scalar_to_bytes(&context.challenge),
        recovery_id,
    );

    info!(
        signers = ?context.indices().collect::<Vec<_>>(),
        r = hex::encode(signature.r),
        s = hex::encode(signature.s),
        "Signature aggregated"
    );

    Ok(signature)
}

/// `z_i·G == R_i + c·Y_i`
fn verify_signature_share(
    context: &SessionContext,
    index: ParticipantIndex,
    value: &Scalar,
) -> Result<()> {
    let (commitment, public_share) = match (context.commitment(index), context.public_share(index)) {
        (Some(commitment), Some(public_share)) => (commitment, public_share),
        _ => return Err(Error::MissingState(format!("Participant {} is not in the session", index))),
    };

    let lhs = ProjectivePoint::GENERATOR * value;
    let rhs = *commitment + *public_share * context.challenge;
    if lhs != rhs {
        return Err(Error::InvalidShare { index });
    }
    Ok(())
}
