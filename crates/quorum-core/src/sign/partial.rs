//! Partial signature computation

use super::context::SessionContext;
use crate::{
    Commitment, Error, PublicShare, Result, SecretShare, SignatureShare, SigningNonce,
};
use k256::ProjectivePoint;
use tracing::{debug, instrument};

/// Compute one participant's signature share `z_i = k_i + c·x_i`
///
/// Consumes `nonce`, so it cannot be used again whatever the outcome.
///
/// # Arguments
/// * `message` - Message being signed
/// * `share` - This participant's secret share
/// * `nonce` - Nonce drawn by [`crate::commit`] for this session
/// * `commitments` - Commitments of every session participant, any order
/// * `public_shares` - Public shares covering every session participant
///
/// # Errors
/// [`Error::MissingState`] when the nonce was drawn for another participant or
/// another session, or when this participant has no commitment in the set.
#[instrument(skip_all, fields(participant = share.index, signers = commitments.len()))]
pub fn sign(
    message: &[u8],
    share: &SecretShare,
    nonce: SigningNonce,
    commitments: &[Commitment],
    public_shares: &[PublicShare],
) -> Result<SignatureShare> {
    if nonce.participant_index != share.index {
        return Err(Error::MissingState(format!(
            "No nonce committed for participant {}",
            share.index
        )));
    }

    let context = SessionContext::new(message, commitments, public_shares)?;

    let committed = context.commitment(share.index).ok_or_else(|| {
        Error::MissingState(format!(
            "Participant {} has no commitment in this session",
            share.index
        ))
    })?;
    if *committed != nonce.commitment {
        return Err(Error::MissingState(format!(
            "Nonce of participant {} does not belong to this session",
            share.index
        )));
    }

    let expected_public = context
        .public_share(share.index)
        .ok_or_else(|| Error::MalformedInput(format!("No public share for participant {}", share.index)))?;
    if ProjectivePoint::GENERATOR * share.value != *expected_public {
        return Err(Error::MalformedInput(format!(
            "Share of participant {} does not match its public share",
            share.index
        )));
    }

    let value = nonce.secret + context.challenge * share.value;
    debug!("Signature share computed");

    Ok(SignatureShare {
        index: share.index,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::generate;
    use crate::sign::commit;

    #[test]
    fn test_share_satisfies_verification_equation() {
        let set = generate(3, 2).unwrap();
        let signers = [&set.shares()[0], &set.shares()[2]];
        let (nonce_a, commitment_a) = commit(signers[0]);
        let (nonce_b, commitment_b) = commit(signers[1]);
        let commitments = [commitment_a, commitment_b];

        let share = sign(b"hello", signers[0], nonce_a, &commitments, set.public_shares()).unwrap();
        drop(nonce_b);

        let context = SessionContext::new(b"hello", &commitments, set.public_shares()).unwrap();
        let lhs = ProjectivePoint::GENERATOR * share.value;
        let rhs = commitment_a.point + set.public_shares()[0].point * context.challenge;
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_nonce_from_other_participant_is_missing_state() {
        let set = generate(3, 2).unwrap();
        let (nonce_a, commitment_a) = commit(&set.shares()[0]);
        let (_nonce_b, commitment_b) = commit(&set.shares()[1]);

        let result = sign(
            b"m",
            &set.shares()[1],
            nonce_a,
            &[commitment_a, commitment_b],
            set.public_shares(),
        );
        assert!(matches!(result, Err(Error::MissingState(_))));
    }

    #[test]
    fn test_nonce_from_other_session_is_missing_state() {
        let set = generate(3, 2).unwrap();
        let (stale, _) = commit(&set.shares()[0]);
        let (_fresh, commitment_a) = commit(&set.shares()[0]);
        let (_nonce_b, commitment_b) = commit(&set.shares()[1]);

        let result = sign(
            b"m",
            &set.shares()[0],
            stale,
            &[commitment_a, commitment_b],
            set.public_shares(),
        );
        assert!(matches!(result, Err(Error::MissingState(_))));
    }

    #[test]
    fn test_signer_absent_from_commitments_is_missing_state() {
        let set = generate(3, 2).unwrap();
        let (nonce_a, _) = commit(&set.shares()[0]);
        let (_nonce_b, commitment_b) = commit(&set.shares()[1]);
        let (_nonce_c, commitment_c) = commit(&set.shares()[2]);

        let result = sign(
            b"m",
            &set.shares()[0],
            nonce_a,
            &[commitment_b, commitment_c],
            set.public_shares(),
        );
        assert!(matches!(result, Err(Error::MissingState(_))));
    }

    #[test]
    fn test_share_must_match_public_share() {
        let set = generate(3, 2).unwrap();
        let other = generate(3, 2).unwrap();
        let (nonce_a, commitment_a) = commit(&set.shares()[0]);
        let (_nonce_b, commitment_b) = commit(&set.shares()[1]);

        let result = sign(
            b"m",
            &set.shares()[0],
            nonce_a,
            &[commitment_a, commitment_b],
            other.public_shares(),
        );
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }
}
