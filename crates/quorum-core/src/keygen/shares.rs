//! Share generation and Feldman share verification

use super::KeyShareSet;
use crate::math::{evaluate_polynomial, random_nonzero_scalar};
use crate::{Error, GroupParams, GroupPublicKey, ParticipantIndex, Result, SecretShare};
use k256::{ProjectivePoint, Scalar};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use tracing::{debug, info, instrument};
use zeroize::Zeroizing;

/// Generate a fresh `threshold`-of-`total` key share set
///
/// Fails with [`Error::InvalidParameters`] unless `1 <= threshold <= total <= 50`,
/// before any randomness is drawn.
#[instrument]
pub fn generate(total: ParticipantIndex, threshold: ParticipantIndex) -> Result<KeyShareSet> {
    let params = GroupParams::new(total, threshold)?;
    Ok(generate_with_rng(params, &mut OsRng))
}

/// Generate a key share set from the given randomness source
#[instrument(skip(rng))]
pub fn generate_with_rng<R: RngCore + CryptoRng>(params: GroupParams, rng: &mut R) -> KeyShareSet {
    debug!("Sampling secret polynomial");
    let coefficients = generate_secret_polynomial(params.threshold(), rng);

    let coefficient_commitments: Vec<ProjectivePoint> = coefficients
        .iter()
        .map(|coef| ProjectivePoint::GENERATOR * coef)
        .collect();
    let group_public_key = GroupPublicKey(coefficient_commitments[0]);

    let shares = evaluate_shares(&coefficients, params);
    let public_shares = shares.iter().map(SecretShare::public_share).collect();

    info!(
        total = params.total(),
        threshold = params.threshold(),
        group_public_key = %group_public_key.to_hex(),
        "Key shares generated"
    );

    KeyShareSet {
        params,
        shares,
        public_shares,
        coefficient_commitments,
        group_public_key,
    }
}

/// Check a received share against the dealer's coefficient commitments
///
/// `x_i·G` must equal `Σ_j A_j·i^j`.
pub fn verify_share(share: &SecretShare, coefficient_commitments: &[ProjectivePoint]) -> Result<()> {
    if coefficient_commitments.is_empty() {
        return Err(Error::MalformedInput("Empty coefficient commitments".into()));
    }
    if share.index == 0 {
        return Err(Error::MalformedInput("Participant index 0 is reserved".into()));
    }

    let expected = ProjectivePoint::GENERATOR * share.value;
    let x = Scalar::from(share.index as u64);
    let actual = coefficient_commitments
        .iter()
        .rev()
        .fold(ProjectivePoint::IDENTITY, |acc, commitment| acc * x + commitment);

    if expected != actual {
        return Err(Error::InvalidShare { index: share.index });
    }
    Ok(())
}

/// Random polynomial of degree `threshold - 1`, wiped on drop
pub(crate) fn generate_secret_polynomial<R: RngCore + CryptoRng>(
    threshold: ParticipantIndex,
    rng: &mut R,
) -> Zeroizing<Vec<Scalar>> {
    Zeroizing::new(
        (0..threshold)
            .map(|_| random_nonzero_scalar(&mut *rng))
            .collect(),
    )
}

#[cfg(feature = "multi-thread")]
pub(crate) fn evaluate_shares(coefficients: &[Scalar], params: GroupParams) -> Vec<SecretShare> {
    use rayon::prelude::*;

    let indices: Vec<ParticipantIndex> = params.indices().collect();
    indices
        .par_iter()
        .map(|&index| SecretShare {
            index,
            value: evaluate_polynomial(coefficients, index),
        })
        .collect()
}

#[cfg(not(feature = "multi-thread"))]
pub(crate) fn evaluate_shares(coefficients: &[Scalar], params: GroupParams) -> Vec<SecretShare> {
    params
        .indices()
        .map(|index| SecretShare {
            index,
            value: evaluate_polynomial(coefficients, index),
        })
        .collect()
}
