//! Scalar sampling, polynomial evaluation and Lagrange interpolation

use crate::{Error, ParticipantIndex, Result};
use k256::{elliptic_curve::PrimeField, Scalar};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

/// Draw a uniformly random scalar in `[1, order - 1]`
///
/// Candidates `>= order` (and zero) are discarded and redrawn instead of
/// being reduced, so the result carries no modulo bias.
pub(crate) fn random_nonzero_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut bytes);
        let candidate = Option::<Scalar>::from(Scalar::from_repr(bytes.into()));
        if let Some(scalar) = candidate {
            if !bool::from(scalar.is_zero()) {
                bytes.zeroize();
                return scalar;
            }
        }
    }
}

/// Evaluate a polynomial at `x` (Horner's rule)
pub(crate) fn evaluate_polynomial(coefficients: &[Scalar], x: ParticipantIndex) -> Scalar {
    let x_scalar = Scalar::from(x as u64);
    coefficients
        .iter()
        .rev()
        .fold(Scalar::ZERO, |acc, coef| acc * x_scalar + coef)
}

/// Lagrange coefficients at evaluation point 0 for the given indices
///
/// `L_i = Π_{j≠i} x_j / (x_j − x_i)`, equivalently `Π_{j≠i} (−x_j)·(x_i − x_j)^{-1}`.
/// All denominators are inverted together with a single field inversion.
/// Indices must be nonzero and pairwise distinct.
pub(crate) fn lagrange_coefficients(indices: &[ParticipantIndex]) -> Result<Vec<Scalar>> {
    if indices.is_empty() {
        return Err(Error::MalformedInput("No indices to interpolate".into()));
    }
    if indices.contains(&0) {
        return Err(Error::MalformedInput("Participant index 0 is reserved".into()));
    }

    let xs: Vec<Scalar> = indices.iter().map(|&i| Scalar::from(i as u64)).collect();

    let mut numerators = Vec::with_capacity(xs.len());
    let mut denominators = Vec::with_capacity(xs.len());
    for (i, x_i) in xs.iter().enumerate() {
        let mut numerator = Scalar::ONE;
        let mut denominator = Scalar::ONE;
        for (j, x_j) in xs.iter().enumerate() {
            if i != j {
                numerator *= x_j;
                denominator *= *x_j - x_i;
            }
        }
        numerators.push(numerator);
        denominators.push(denominator);
    }

    let inverses = batch_invert(&denominators)
        .ok_or_else(|| Error::MalformedInput("Duplicate participant index".into()))?;

    Ok(numerators
        .into_iter()
        .zip(inverses)
        .map(|(numerator, inverse)| numerator * inverse)
        .collect())
}

/// Montgomery batch inversion; `None` if any element is zero
fn batch_invert(values: &[Scalar]) -> Option<Vec<Scalar>> {
    let mut prefix = Vec::with_capacity(values.len());
    let mut acc = Scalar::ONE;
    for value in values {
        prefix.push(acc);
        acc *= value;
    }

    let mut inverse = Option::<Scalar>::from(acc.invert())?;

    let mut out = vec![Scalar::ZERO; values.len()];
    for i in (0..values.len()).rev() {
        out[i] = prefix[i] * inverse;
        inverse *= values[i];
    }
    Some(out)
}
