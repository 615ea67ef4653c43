//! Proactive share refresh
//!
//! Adds a random polynomial with zero constant term to every share. The group
//! key is unchanged, while shares from before and after the refresh no longer
//! interpolate to the same secret, which limits the window in which a
//! compromised share is useful.

use super::shares::evaluate_shares;
use super::KeyShareSet;
use crate::math::random_nonzero_scalar;
use crate::{Result, SecretShare};
use k256::{ProjectivePoint, Scalar};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use tracing::{info, instrument};
use zeroize::Zeroizing;

/// Refresh all shares of a set using OS randomness
pub fn refresh(set: &KeyShareSet) -> Result<KeyShareSet> {
    refresh_with_rng(set, &mut OsRng)
}

/// Refresh all shares of a set from the given randomness source
#[instrument(skip(set, rng), fields(total = set.total(), threshold = set.threshold()))]
pub fn refresh_with_rng<R: RngCore + CryptoRng>(set: &KeyShareSet, rng: &mut R) -> Result<KeyShareSet> {
    let threshold = set.threshold();

    let mut delta = Zeroizing::new(Vec::with_capacity(threshold as usize));
    delta.push(Scalar::ZERO);
    for _ in 1..threshold {
        delta.push(random_nonzero_scalar(&mut *rng));
    }

    let delta_shares = evaluate_shares(&delta, set.params);
    let shares: Vec<SecretShare> = set
        .shares
        .iter()
        .zip(&delta_shares)
        .map(|(old, update)| SecretShare {
            index: old.index,
            value: old.value + update.value,
        })
        .collect();

    let coefficient_commitments: Vec<ProjectivePoint> = set
        .coefficient_commitments
        .iter()
        .zip(delta.iter())
        .map(|(commitment, coef)| *commitment + ProjectivePoint::GENERATOR * coef)
        .collect();
    let public_shares = shares.iter().map(SecretShare::public_share).collect();

    info!(
        group_public_key = %set.group_public_key.to_hex(),
        "Key shares refreshed"
    );

    Ok(KeyShareSet {
        params: set.params,
        shares,
        public_shares,
        coefficient_commitments,
        group_public_key: set.group_public_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::{generate, verify_share};

    #[test]
    fn test_refresh_keeps_group_key_and_changes_shares() {
        let set = generate(5, 3).unwrap();
        let refreshed = refresh(&set).unwrap();

        assert_eq!(refreshed.group_public_key(), set.group_public_key());
        assert_eq!(refreshed.coefficient_commitments()[0], set.coefficient_commitments()[0]);
        for (old, new) in set.public_shares().iter().zip(refreshed.public_shares()) {
            assert_eq!(old.index, new.index);
            assert_ne!(old.point, new.point);
        }
        for share in refreshed.shares() {
            verify_share(share, refreshed.coefficient_commitments()).unwrap();
        }
    }

    #[test]
    fn test_refresh_single_threshold_is_identity() {
        let set = generate(3, 1).unwrap();
        let refreshed = refresh(&set).unwrap();
        assert_eq!(refreshed.public_shares(), set.public_shares());
    }
}
