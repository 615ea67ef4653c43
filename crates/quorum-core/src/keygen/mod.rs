//! Key generation module
//!
//! A dealer samples a random degree-`t-1` polynomial, evaluates it once per
//! participant and publishes Feldman commitments to its coefficients. Only the
//! shares and their public images leave this module; the constant term is
//! wiped before [`generate`] returns.

mod key_refresh;
mod shares;

pub use key_refresh::{refresh, refresh_with_rng};
pub use shares::{generate, generate_with_rng, verify_share};

use crate::encoding::points_xy;
use crate::{
    Error, GroupParams, GroupPublicKey, ParticipantIndex, PublicShare, Result, SecretShare,
};
use k256::ProjectivePoint;
use serde::{Deserialize, Serialize};

/// Output of one group formation: private shares plus everything public
///
/// Immutable once built; a refresh produces a new set.
#[derive(Debug, Clone)]
pub struct KeyShareSet {
    pub(crate) params: GroupParams,
    pub(crate) shares: Vec<SecretShare>,
    pub(crate) public_shares: Vec<PublicShare>,
    pub(crate) coefficient_commitments: Vec<ProjectivePoint>,
    pub(crate) group_public_key: GroupPublicKey,
}

impl KeyShareSet {
    /// Reassemble a complete set from its public package and all `n` shares
    ///
    /// Every share is checked against the coefficient commitments and the
    /// published public shares.
    pub fn from_parts(package: PublicKeyPackage, mut shares: Vec<SecretShare>) -> Result<Self> {
        let params = package.params()?;
        if package.coefficient_commitments.len() != params.threshold() as usize {
            return Err(Error::MalformedInput(format!(
                "Expected {} coefficient commitments, got {}",
                params.threshold(),
                package.coefficient_commitments.len()
            )));
        }
        if package.coefficient_commitments[0] != *package.group_public_key.as_point() {
            return Err(Error::MalformedInput(
                "Group key does not match the constant-term commitment".into(),
            ));
        }

        shares.sort_by_key(|share| share.index);
        let indices: Vec<ParticipantIndex> = shares.iter().map(|share| share.index).collect();
        if indices != params.indices().collect::<Vec<_>>() {
            return Err(Error::MissingState(format!(
                "Expected shares for participants 1..={}, got {:?}",
                params.total(),
                indices
            )));
        }

        let mut public_shares = package.public_shares;
        public_shares.sort_by_key(|public| public.index);
        if public_shares.len() != shares.len() {
            return Err(Error::MalformedInput(format!(
                "Expected {} public shares, got {}",
                shares.len(),
                public_shares.len()
            )));
        }
        for (share, public) in shares.iter().zip(&public_shares) {
            verify_share(share, &package.coefficient_commitments)?;
            if share.public_share() != *public {
                return Err(Error::InvalidShare { index: share.index });
            }
        }

        Ok(Self {
            params,
            shares,
            public_shares,
            coefficient_commitments: package.coefficient_commitments,
            group_public_key: package.group_public_key,
        })
    }

    /// Group parameters
    pub fn params(&self) -> GroupParams {
        self.params
    }

    /// Signing threshold `t`
    pub fn threshold(&self) -> ParticipantIndex {
        self.params.threshold()
    }

    /// Number of participants `n`
    pub fn total(&self) -> ParticipantIndex {
        self.params.total()
    }

    /// Private shares, ordered by index
    pub fn shares(&self) -> &[SecretShare] {
        &self.shares
    }

    /// Private share of one participant
    pub fn share(&self, index: ParticipantIndex) -> Option<&SecretShare> {
        self.shares.iter().find(|share| share.index == index)
    }

    /// Public shares, ordered by index
    pub fn public_shares(&self) -> &[PublicShare] {
        &self.public_shares
    }

    /// Feldman commitments `a_j·G` to the polynomial coefficients
    pub fn coefficient_commitments(&self) -> &[ProjectivePoint] {
        &self.coefficient_commitments
    }

    /// Group public key `a_0·G`
    pub fn group_public_key(&self) -> &GroupPublicKey {
        &self.group_public_key
    }

    /// Everything in the set that may be published
    pub fn public_package(&self) -> PublicKeyPackage {
        PublicKeyPackage {
            total: self.total(),
            threshold: self.threshold(),
            group_public_key: self.group_public_key,
            public_shares: self.public_shares.clone(),
            coefficient_commitments: self.coefficient_commitments.clone(),
        }
    }

    /// Hand the private shares out for distribution
    pub fn into_shares(self) -> Vec<SecretShare> {
        self.shares
    }
}

/// Public view of a [`KeyShareSet`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyPackage {
    /// Number of participants
    pub total: ParticipantIndex,
    /// Signing threshold
    pub threshold: ParticipantIndex,
    /// Group public key
    pub group_public_key: GroupPublicKey,
    /// Per-participant public shares
    pub public_shares: Vec<PublicShare>,
    /// Feldman coefficient commitments
    #[serde(with = "points_xy")]
    pub coefficient_commitments: Vec<ProjectivePoint>,
}

impl PublicKeyPackage {
    /// Validated group parameters
    pub fn params(&self) -> Result<GroupParams> {
        GroupParams::new(self.total, self.threshold)
    }
}
