//! Per-session nonce commitment

use crate::math::random_nonzero_scalar;
use crate::{Commitment, SecretShare, SigningNonce};
use k256::ProjectivePoint;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use tracing::debug;

/// Draw a fresh single-use nonce for `share` and its public commitment
///
/// The [`SigningNonce`] must be handed to exactly one [`crate::sign`] call;
/// the [`Commitment`] is broadcast to the rest of the session.
pub fn commit(share: &SecretShare) -> (SigningNonce, Commitment) {
    commit_with_rng(share, &mut OsRng)
}

/// [`commit`] with an explicit randomness source
pub fn commit_with_rng<R: RngCore + CryptoRng>(
    share: &SecretShare,
    rng: &mut R,
) -> (SigningNonce, Commitment) {
    let secret = random_nonzero_scalar(rng);
    let point = ProjectivePoint::GENERATOR * secret;

    let nonce = SigningNonce {
        participant_index: share.index,
        secret,
        commitment: point,
    };
    let commitment = nonce.commitment();

    debug!(participant = share.index, "Nonce committed");
    (nonce, commitment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::point_to_sec1;
    use crate::keygen::generate;
    use std::collections::HashSet;

    #[test]
    fn test_commitment_matches_nonce() {
        let set = generate(3, 2).unwrap();
        let share = &set.shares()[0];
        let (nonce, commitment) = commit(share);

        assert_eq!(commitment.participant_index, share.index);
        assert_eq!(nonce.participant_index(), share.index);
        assert_eq!(commitment.point, ProjectivePoint::GENERATOR * nonce.secret);
    }

    #[test]
    fn test_nonces_never_repeat() {
        let set = generate(2, 2).unwrap();
        let share = &set.shares()[0];

        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let (_nonce, commitment) = commit(share);
            assert!(seen.insert(point_to_sec1(&commitment.point).as_bytes().to_vec()));
        }
        assert_eq!(seen.len(), 1000);
    }
}
