//! Group parameters and the read-only cryptographic context

use crate::{Error, ParticipantIndex, Result};
use serde::{Deserialize, Serialize};

/// Largest group the engine accepts
pub const MAX_PARTICIPANTS: ParticipantIndex = 50;

/// Domain tag for hashing the signed message
pub const MESSAGE_TAG: &[u8] = b"quorum-sig/v1/message";

/// Domain tag for the Schnorr challenge
pub const CHALLENGE_TAG: &[u8] = b"quorum-sig/v1/challenge";

/// Domain tag binding a session identifier to the signed payload
pub const SESSION_TAG: &[u8] = b"quorum-sig/v1/session";

/// Domain tag for authorization request encoding
pub const AUTHORIZATION_TAG: &[u8] = b"quorum-sig/v1/authorization";

/// Validated `t`-of-`n` group configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParams {
    total: ParticipantIndex,
    threshold: ParticipantIndex,
}

impl GroupParams {
    /// Create group parameters, rejecting anything outside `1 <= t <= n <= 50`
    pub fn new(total: ParticipantIndex, threshold: ParticipantIndex) -> Result<Self> {
        if total == 0 {
            return Err(Error::InvalidParameters(
                "Group must have at least one participant".into(),
            ));
        }
        if total > MAX_PARTICIPANTS {
            return Err(Error::InvalidParameters(format!(
                "Group size {} exceeds maximum of {}",
                total, MAX_PARTICIPANTS
            )));
        }
        if threshold == 0 {
            return Err(Error::InvalidParameters(
                "Threshold must be at least 1".into(),
            ));
        }
        if threshold > total {
            return Err(Error::InvalidParameters(format!(
                "Threshold {} cannot exceed number of participants {}",
                threshold, total
            )));
        }

        Ok(Self { total, threshold })
    }

    /// Number of participants `n`
    pub fn total(&self) -> ParticipantIndex {
        self.total
    }

    /// Signing threshold `t`
    pub fn threshold(&self) -> ParticipantIndex {
        self.threshold
    }

    /// Participant indices `1..=n`
    pub fn indices(&self) -> impl Iterator<Item = ParticipantIndex> {
        1..=self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(GroupParams::new(1, 1).is_ok());
        assert!(GroupParams::new(50, 50).is_ok());
        assert!(GroupParams::new(5, 3).is_ok());

        for (n, t) in [(0, 0), (0, 1), (5, 0), (3, 4), (51, 2), (51, 51)] {
            assert!(
                matches!(GroupParams::new(n, t), Err(Error::InvalidParameters(_))),
                "({n}, {t}) should be rejected"
            );
        }
    }

    #[test]
    fn test_indices_are_one_based() {
        let params = GroupParams::new(4, 2).unwrap();
        assert_eq!(params.indices().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }
}
