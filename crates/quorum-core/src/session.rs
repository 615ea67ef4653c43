//! Signing session state machines
//!
//! ```text
//! Created → Committed → PartiallySigned → Aggregated → { Verified | Rejected }
//! ```
//!
//! [`SignerSession`] is the participant side: it holds the nonce between
//! commit and sign and gives it up exactly once. [`SigningSession`] is the
//! coordinator side: it collects commitments and signature shares and ends in
//! a terminal state. Neither has a transition back into signing; a failed or
//! abandoned session is dropped and a new one started.
//!
//! Both sides sign [`session_message`] of the session identifier and the
//! payload, so a signature produced in one session does not verify for the
//! same payload in another.

use crate::params::SESSION_TAG;
use crate::sign::{combine, commit_with_rng, sign};
use crate::{
    verify, Commitment, Error, GroupParams, GroupPublicKey, ParticipantIndex, PublicShare, Result,
    SecretShare, SessionId, Signature, SignatureShare, SigningNonce,
};
use k256::ProjectivePoint;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Bytes signed for `payload` in session `session_id`
pub fn session_message(session_id: SessionId, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(SESSION_TAG.len() + 8 + payload.len());
    out.extend_from_slice(SESSION_TAG);
    out.extend_from_slice(&session_id.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Lifecycle state of a signing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Created,
    Committed,
    PartiallySigned,
    Aggregated,
    Verified,
    Rejected,
}

impl SessionState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Verified | SessionState::Rejected)
    }
}

/// One participant's view of a signing session
pub struct SignerSession<'a> {
    session_id: SessionId,
    share: &'a SecretShare,
    nonce: Option<SigningNonce>,
    state: SessionState,
}

impl<'a> SignerSession<'a> {
    /// Start a session for `share`
    pub fn new(session_id: SessionId, share: &'a SecretShare) -> Self {
        Self {
            session_id,
            share,
            nonce: None,
            state: SessionState::Created,
        }
    }

    /// Session identifier
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Draw this session's nonce and return the commitment to broadcast
    pub fn commit(&mut self) -> Result<Commitment> {
        self.commit_with_rng(&mut OsRng)
    }

    /// [`SignerSession::commit`] with an explicit randomness source
    pub fn commit_with_rng<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<Commitment> {
        if self.state != SessionState::Created {
            return Err(Error::InvalidTransition {
                from: self.state,
                to: SessionState::Committed,
            });
        }

        let (nonce, commitment) = commit_with_rng(self.share, rng);
        self.nonce = Some(nonce);
        self.state = SessionState::Committed;
        Ok(commitment)
    }

    /// Produce this participant's signature share over `payload`
    ///
    /// The payload is bound to this session's identifier before signing.
    /// The nonce is released on the first call whether or not signing
    /// succeeds; any later call fails with [`Error::MissingState`].
    #[instrument(skip_all, fields(session_id = self.session_id, participant = self.share.index))]
    pub fn sign(
        &mut self,
        payload: &[u8],
        commitments: &[Commitment],
        public_shares: &[PublicShare],
    ) -> Result<SignatureShare> {
        if self.state == SessionState::Created {
            return Err(Error::MissingState(format!(
                "Participant {} has not committed in session {}",
                self.share.index, self.session_id
            )));
        }

        let nonce = self.nonce.take().ok_or_else(|| {
            Error::MissingState(format!(
                "Nonce of participant {} already consumed in session {}",
                self.share.index, self.session_id
            ))
        })?;

        let message = session_message(self.session_id, payload);
        let share = sign(&message, self.share, nonce, commitments, public_shares)?;
        self.state = SessionState::PartiallySigned;
        Ok(share)
    }
}

/// Coordinator view of a signing session
#[derive(Debug)]
pub struct SigningSession {
    session_id: SessionId,
    payload: Vec<u8>,
    message: Vec<u8>,
    threshold: ParticipantIndex,
    public_shares: Vec<PublicShare>,
    commitments: Vec<Commitment>,
    signature_shares: Vec<SignatureShare>,
    signature: Option<Signature>,
    state: SessionState,
}

impl SigningSession {
    /// Start collecting commitments for `payload`
    ///
    /// `public_shares` must hold exactly one share for each of `1..=n`, and
    /// `threshold` must be valid for that `n`.
    pub fn new(
        session_id: SessionId,
        payload: impl Into<Vec<u8>>,
        threshold: ParticipantIndex,
        public_shares: Vec<PublicShare>,
    ) -> Result<Self> {
        let total = ParticipantIndex::try_from(public_shares.len()).map_err(|_| {
            Error::InvalidParameters(format!("{} public shares", public_shares.len()))
        })?;
        let params = GroupParams::new(total, threshold)?;

        let mut indices: Vec<ParticipantIndex> =
            public_shares.iter().map(|share| share.index).collect();
        indices.sort_unstable();
        if indices != params.indices().collect::<Vec<_>>() {
            return Err(Error::MalformedInput(format!(
                "Public shares must cover participants 1..={}, got {:?}",
                total, indices
            )));
        }

        let payload: Vec<u8> = payload.into();
        Ok(Self {
            session_id,
            message: session_message(session_id, &payload),
            payload,
            threshold,
            public_shares,
            commitments: Vec::new(),
            signature_shares: Vec::new(),
            signature: None,
            state: SessionState::Created,
        })
    }

    /// Session identifier
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Payload being signed
    pub fn message(&self) -> &[u8] {
        &self.payload
    }

    /// Bytes the aggregated signature covers, see [`session_message`]
    pub fn signed_message(&self) -> &[u8] {
        &self.message
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Aggregated signature, once available
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Record one participant's commitment
    ///
    /// Only members of the group may commit, so every commitment counted at
    /// [`SigningSession::seal_commitments`] can also be signed for.
    pub fn add_commitment(&mut self, commitment: Commitment) -> Result<()> {
        self.expect_state(&[SessionState::Created], SessionState::Created)?;
        if !self
            .public_shares
            .iter()
            .any(|share| share.index == commitment.participant_index)
        {
            return Err(Error::MalformedInput(format!(
                "Participant {} is not a member of the group",
                commitment.participant_index
            )));
        }
        if commitment.point == ProjectivePoint::IDENTITY {
            return Err(Error::MalformedInput(format!(
                "Identity commitment from participant {}",
                commitment.participant_index
            )));
        }
        if self
            .commitments
            .iter()
            .any(|existing| existing.participant_index == commitment.participant_index)
        {
            return Err(Error::MalformedInput(format!(
                "Participant {} already committed in session {}",
                commitment.participant_index, self.session_id
            )));
        }
        self.commitments.push(commitment);
        Ok(())
    }

    /// Freeze the commitment set and return it for distribution to signers
    pub fn seal_commitments(&mut self) -> Result<Vec<Commitment>> {
        self.expect_state(&[SessionState::Created], SessionState::Committed)?;
        if self.commitments.len() < self.threshold as usize {
            return Err(Error::InsufficientShares {
                required: self.threshold as usize,
                got: self.commitments.len(),
            });
        }

        self.commitments.sort_by_key(|commitment| commitment.participant_index);
        self.state = SessionState::Committed;
        info!(
            session_id = self.session_id,
            signers = self.commitments.len(),
            "Commitments sealed"
        );
        Ok(self.commitments.clone())
    }

    /// Record one participant's signature share
    pub fn add_signature_share(&mut self, share: SignatureShare) -> Result<()> {
        self.expect_state(
            &[SessionState::Committed, SessionState::PartiallySigned],
            SessionState::PartiallySigned,
        )?;
        if !self
            .commitments
            .iter()
            .any(|commitment| commitment.participant_index == share.index)
        {
            return Err(Error::MalformedInput(format!(
                "Participant {} did not commit in session {}",
                share.index, self.session_id
            )));
        }
        if self.signature_shares.iter().any(|existing| existing.index == share.index) {
            return Err(Error::MalformedInput(format!(
                "Duplicate signature share from participant {}",
                share.index
            )));
        }

        self.signature_shares.push(share);
        self.state = SessionState::PartiallySigned;
        Ok(())
    }

    /// Combine the collected shares
    #[instrument(skip(self), fields(session_id = self.session_id))]
    pub fn aggregate(&mut self) -> Result<Signature> {
        self.expect_state(&[SessionState::PartiallySigned], SessionState::Aggregated)?;
        let signature = combine(
            &self.message,
            &self.signature_shares,
            &self.commitments,
            &self.public_shares,
            self.threshold,
        )?;

        self.signature = Some(signature);
        self.state = SessionState::Aggregated;
        Ok(signature)
    }

    /// Verify the aggregated signature and close the session
    pub fn verify(&mut self, group_public_key: &GroupPublicKey) -> Result<bool> {
        self.expect_state(&[SessionState::Aggregated], SessionState::Verified)?;
        let valid = self
            .signature
            .as_ref()
            .map(|signature| verify(&self.message, signature, group_public_key))
            .unwrap_or(false);

        self.state = if valid {
            SessionState::Verified
        } else {
            warn!(session_id = self.session_id, "Aggregated signature rejected");
            SessionState::Rejected
        };
        Ok(valid)
    }

    fn expect_state(&self, allowed: &[SessionState], to: SessionState) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::generate;

    #[test]
    fn test_full_lifecycle() {
        let set = generate(4, 3).unwrap();
        let mut coordinator =
            SigningSession::new(7, b"deploy".to_vec(), 3, set.public_shares().to_vec()).unwrap();
        let mut signers: Vec<_> = [1, 3, 4]
            .iter()
            .map(|i| SignerSession::new(7, set.share(*i).unwrap()))
            .collect();

        for signer in &mut signers {
            coordinator.add_commitment(signer.commit().unwrap()).unwrap();
            assert_eq!(signer.state(), SessionState::Committed);
        }
        let commitments = coordinator.seal_commitments().unwrap();
        assert_eq!(coordinator.state(), SessionState::Committed);

        for signer in &mut signers {
            let share = signer
                .sign(coordinator.message(), &commitments, set.public_shares())
                .unwrap();
            coordinator.add_signature_share(share).unwrap();
            assert_eq!(signer.state(), SessionState::PartiallySigned);
        }

        coordinator.aggregate().unwrap();
        assert_eq!(coordinator.state(), SessionState::Aggregated);
        assert!(coordinator.verify(set.group_public_key()).unwrap());
        assert_eq!(coordinator.state(), SessionState::Verified);
        assert!(coordinator.state().is_terminal());

        assert!(matches!(coordinator.aggregate(), Err(Error::InvalidTransition { .. })));
        assert!(matches!(
            coordinator.verify(set.group_public_key()),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_signer_cannot_recommit_or_resign() {
        let set = generate(2, 2).unwrap();
        let mut a = SignerSession::new(1, &set.shares()[0]);
        let mut b = SignerSession::new(1, &set.shares()[1]);

        assert!(matches!(
            a.sign(b"m", &[], set.public_shares()),
            Err(Error::MissingState(_))
        ));

        let commitments = vec![a.commit().unwrap(), b.commit().unwrap()];
        assert_eq!(
            a.commit(),
            Err(Error::InvalidTransition {
                from: SessionState::Committed,
                to: SessionState::Committed,
            })
        );

        a.sign(b"m", &commitments, set.public_shares()).unwrap();
        assert!(matches!(
            a.sign(b"m", &commitments, set.public_shares()),
            Err(Error::MissingState(_))
        ));
        assert!(matches!(a.commit(), Err(Error::InvalidTransition { .. })));
    }

    #[test]
    fn test_failed_sign_still_consumes_nonce() {
        let set = generate(3, 2).unwrap();
        let mut a = SignerSession::new(2, &set.shares()[0]);
        let mut b = SignerSession::new(2, &set.shares()[1]);
        let commitment_a = a.commit().unwrap();
        let commitment_b = b.commit().unwrap();

        // missing public shares make the first attempt fail
        assert!(a.sign(b"m", &[commitment_a, commitment_b], &[]).is_err());
        assert!(matches!(
            a.sign(b"m", &[commitment_a, commitment_b], set.public_shares()),
            Err(Error::MissingState(_))
        ));
    }

    #[test]
    fn test_seal_requires_threshold_commitments() {
        let set = generate(3, 3).unwrap();
        let mut coordinator =
            SigningSession::new(3, b"m".to_vec(), 3, set.public_shares().to_vec()).unwrap();
        let mut a = SignerSession::new(3, &set.shares()[0]);
        coordinator.add_commitment(a.commit().unwrap()).unwrap();

        assert_eq!(
            coordinator.seal_commitments(),
            Err(Error::InsufficientShares { required: 3, got: 1 })
        );
        assert!(matches!(
            coordinator.add_signature_share(SignatureShare {
                index: 1,
                value: k256::Scalar::ONE,
            }),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_rejected_is_terminal() {
        let set = generate(2, 2).unwrap();
        let other = generate(2, 2).unwrap();
        let mut coordinator =
            SigningSession::new(9, b"m".to_vec(), 2, set.public_shares().to_vec()).unwrap();
        let mut signers: Vec<_> = set.shares().iter().map(|s| SignerSession::new(9, s)).collect();

        for signer in &mut signers {
            coordinator.add_commitment(signer.commit().unwrap()).unwrap();
        }
        let commitments = coordinator.seal_commitments().unwrap();
        for signer in &mut signers {
            let share = signer.sign(b"m", &commitments, set.public_shares()).unwrap();
            coordinator.add_signature_share(share).unwrap();
        }
        coordinator.aggregate().unwrap();

        assert!(!coordinator.verify(other.group_public_key()).unwrap());
        assert_eq!(coordinator.state(), SessionState::Rejected);
        assert!(coordinator.state().is_terminal());
    }

    fn signed_in_session(
        set: &crate::KeyShareSet,
        session_id: SessionId,
        payload: &[u8],
    ) -> Signature {
        let mut coordinator =
            SigningSession::new(session_id, payload, 2, set.public_shares().to_vec()).unwrap();
        let mut signers: Vec<_> = [1, 3]
            .iter()
            .map(|i| SignerSession::new(session_id, set.share(*i).unwrap()))
            .collect();
        for signer in &mut signers {
            coordinator.add_commitment(signer.commit().unwrap()).unwrap();
        }
        let commitments = coordinator.seal_commitments().unwrap();
        for signer in &mut signers {
            let share = signer.sign(payload, &commitments, set.public_shares()).unwrap();
            coordinator.add_signature_share(share).unwrap();
        }
        let signature = coordinator.aggregate().unwrap();
        assert!(coordinator.verify(set.group_public_key()).unwrap());
        signature
    }

    #[test]
    fn test_signature_does_not_carry_over_between_sessions() {
        let set = generate(3, 2).unwrap();
        let first = signed_in_session(&set, 1, b"deploy");
        let second = signed_in_session(&set, 2, b"deploy");

        let key = set.group_public_key();
        assert!(verify(&session_message(1, b"deploy"), &first, key));
        assert!(!verify(&session_message(2, b"deploy"), &first, key));
        assert!(!verify(b"deploy", &first, key));
        assert!(verify(&session_message(2, b"deploy"), &second, key));
        assert!(!verify(&session_message(1, b"deploy"), &second, key));
    }

    #[test]
    fn test_signers_from_another_session_do_not_aggregate() {
        let set = generate(3, 2).unwrap();
        let mut coordinator =
            SigningSession::new(2, b"deploy".to_vec(), 2, set.public_shares().to_vec()).unwrap();
        let mut signers: Vec<_> = set.shares()[..2]
            .iter()
            .map(|share| SignerSession::new(1, share))
            .collect();
        for signer in &mut signers {
            coordinator.add_commitment(signer.commit().unwrap()).unwrap();
        }
        let commitments = coordinator.seal_commitments().unwrap();
        for signer in &mut signers {
            let share = signer
                .sign(coordinator.message(), &commitments, set.public_shares())
                .unwrap();
            coordinator.add_signature_share(share).unwrap();
        }
        assert!(matches!(coordinator.aggregate(), Err(Error::InvalidShare { .. })));
    }

    #[test]
    fn test_new_checks_group_parameters() {
        let set = generate(3, 2).unwrap();
        let public_shares = set.public_shares().to_vec();

        assert!(matches!(
            SigningSession::new(1, b"m".to_vec(), 0, public_shares.clone()),
            Err(Error::InvalidParameters(_))
        ));
        assert!(matches!(
            SigningSession::new(1, b"m".to_vec(), 4, public_shares.clone()),
            Err(Error::InvalidParameters(_))
        ));
        assert!(matches!(
            SigningSession::new(1, b"m".to_vec(), 2, Vec::new()),
            Err(Error::InvalidParameters(_))
        ));

        let doubled = vec![public_shares[0], public_shares[0], public_shares[2]];
        assert!(matches!(
            SigningSession::new(1, b"m".to_vec(), 2, doubled),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_only_members_may_commit() {
        let set = generate(3, 2).unwrap();
        let mut coordinator =
            SigningSession::new(4, b"m".to_vec(), 2, set.public_shares().to_vec()).unwrap();
        let point = ProjectivePoint::GENERATOR;

        for outsider in [0, 4] {
            assert!(matches!(
                coordinator.add_commitment(Commitment { participant_index: outsider, point }),
                Err(Error::MalformedInput(_))
            ));
        }
        assert!(matches!(
            coordinator.add_commitment(Commitment {
                participant_index: 1,
                point: ProjectivePoint::IDENTITY,
            }),
            Err(Error::MalformedInput(_))
        ));

        coordinator
            .add_commitment(Commitment { participant_index: 1, point })
            .unwrap();
        assert_eq!(
            coordinator.seal_commitments(),
            Err(Error::InsufficientShares { required: 2, got: 1 })
        );
    }
}
