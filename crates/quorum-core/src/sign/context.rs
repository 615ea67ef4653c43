//! Session context shared by partial signers and the aggregator
//!
//! Both sides build the context from the same commitments and public shares,
//! so they derive the same signing set, Lagrange weights, group nonce point
//! and challenge. Commitments are put into canonical order (ascending index)
//! here, which makes the caller's ordering irrelevant.

use crate::encoding::point_to_sec1;
use crate::math::lagrange_coefficients;
use crate::params::{CHALLENGE_TAG, MESSAGE_TAG};
use crate::{Commitment, Error, ParticipantIndex, PublicShare, Result};
use k256::{
    elliptic_curve::{bigint::U256, ops::Reduce},
    ProjectivePoint, Scalar,
};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Hash of the signed message
pub(crate) type MessageHash = [u8; 32];

pub(crate) fn message_hash(message: &[u8]) -> MessageHash {
    let mut hasher = Sha256::new();
    hasher.update(MESSAGE_TAG);
    hasher.update(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Schnorr challenge `c = H(tag ‖ h ‖ R ‖ Y) mod order`
pub(crate) fn challenge(
    hash: &MessageHash,
    group_commitment: &ProjectivePoint,
    group_key: &ProjectivePoint,
) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(CHALLENGE_TAG);
    hasher.update(hash);
    hasher.update(point_to_sec1(group_commitment).as_bytes());
    hasher.update(point_to_sec1(group_key).as_bytes());
    <Scalar as Reduce<U256>>::reduce_bytes(&hasher.finalize())
}

/// Canonical view of one signing session
#[derive(Debug)]
pub(crate) struct SessionContext {
    /// Committed nonce points by participant, in ascending index order
    commitments: BTreeMap<ParticipantIndex, ProjectivePoint>,
    /// Public shares of the signing set
    public_shares: BTreeMap<ParticipantIndex, ProjectivePoint>,
    /// Lagrange coefficient at zero of each signer
    lambdas: BTreeMap<ParticipantIndex, Scalar>,
    /// `R = Σ λ_i·R_i`
    pub group_commitment: ProjectivePoint,
    /// Challenge bound to the message and the commitment set
    pub challenge: Scalar,
}

impl SessionContext {
    pub fn new(message: &[u8], commitments: &[Commitment], public_shares: &[PublicShare]) -> Result<Self> {
        let mut committed = BTreeMap::new();
        for commitment in commitments {
            if commitment.point == ProjectivePoint::IDENTITY {
                return Err(Error::MalformedInput(format!(
                    "Identity commitment from participant {}",
                    commitment.participant_index
                )));
            }
            if committed
                .insert(commitment.participant_index, commitment.point)
                .is_some()
            {
                return Err(Error::MalformedInput(format!(
                    "Duplicate commitment from participant {}",
                    commitment.participant_index
                )));
            }
        }
        if committed.is_empty() {
            return Err(Error::MissingState("No commitments in session".into()));
        }

        let mut published = BTreeMap::new();
        for share in public_shares {
            if published.insert(share.index, share.point).is_some() {
                return Err(Error::MalformedInput(format!(
                    "Duplicate public share for participant {}",
                    share.index
                )));
            }
        }

        let indices: Vec<ParticipantIndex> = committed.keys().copied().collect();
        let lambdas: BTreeMap<_, _> = indices
            .iter()
            .copied()
            .zip(lagrange_coefficients(&indices)?)
            .collect();

        let mut session_public_shares = BTreeMap::new();
        for index in &indices {
            let point = published.get(index).ok_or_else(|| {
                Error::MalformedInput(format!("No public share for participant {}", index))
            })?;
            session_public_shares.insert(*index, *point);
        }

        let group_commitment = weighted_sum(&committed, &lambdas);
        // Y = Σ λ_i·Y_i, the group key as seen by this session's public shares
        let group_key = weighted_sum(&session_public_shares, &lambdas);
        if group_commitment == ProjectivePoint::IDENTITY {
            return Err(Error::Crypto("Group commitment is the identity".into()));
        }

        let challenge = challenge(&message_hash(message), &group_commitment, &group_key);

        Ok(Self {
            commitments: committed,
            public_shares: session_public_shares,
            lambdas,
            group_commitment,
            challenge,
        })
    }

    /// Indices of the signing set, ascending
    pub fn indices(&self) -> impl Iterator<Item = ParticipantIndex> + '_ {
        self.commitments.keys().copied()
    }

    pub fn commitment(&self, index: ParticipantIndex) -> Option<&ProjectivePoint> {
        self.commitments.get(&index)
    }

    pub fn public_share(&self, index: ParticipantIndex) -> Option<&ProjectivePoint> {
        self.public_shares.get(&index)
    }

    pub fn lambda(&self, index: ParticipantIndex) -> Option<&Scalar> {
        self.lambdas.get(&index)
    }
}

fn weighted_sum(
    points: &BTreeMap<ParticipantIndex, ProjectivePoint>,
    lambdas: &BTreeMap<ParticipantIndex, Scalar>,
) -> ProjectivePoint {
    points
        .iter()
        .fold(ProjectivePoint::IDENTITY, |acc, (index, point)| {
            acc + *point * lambdas[index]
        })
}
