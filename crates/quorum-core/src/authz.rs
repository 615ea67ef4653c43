//! Authorization requests and access validation
//!
//! The registry asks the group to sign an [`AuthorizationRequest`]; the
//! resulting [`AccessProof`] is later presented to a cloud connector, which
//! only learns whether access is granted.
//!
//! Every request carries a session identifier from a [`SessionCounter`]. The
//! request is signed as [`session_message`] of that identifier, and a
//! [`ReplayGuard`] refuses a second proof for the same identifier.

use crate::params::AUTHORIZATION_TAG;
use crate::session::session_message;
use crate::{verify, Error, GroupPublicKey, Result, SessionId, Signature};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Identifiers kept below the highest one a [`ReplayGuard`] has accepted
pub const DEFAULT_REPLAY_WINDOW: u64 = 4096;

/// Request to authorize one action by a principal on a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Provider-native resource name
    pub resource_id: String,
    /// Principal requesting access
    pub principal_id: String,
    /// Action to perform
    pub action: String,
    /// Session-unique identifier bound into the signed message
    pub session_id: SessionId,
}

impl AuthorizationRequest {
    /// Create a new request
    pub fn new(
        resource_id: impl Into<String>,
        principal_id: impl Into<String>,
        action: impl Into<String>,
        session_id: SessionId,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            principal_id: principal_id.into(),
            action: action.into(),
            session_id,
        }
    }

    /// Encoded request fields, without the session binding
    ///
    /// Fields are length-prefixed so distinct requests never encode alike.
    pub fn payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            AUTHORIZATION_TAG.len()
                + 12
                + self.resource_id.len()
                + self.principal_id.len()
                + self.action.len(),
        );
        out.extend_from_slice(AUTHORIZATION_TAG);
        for field in [&self.resource_id, &self.principal_id, &self.action] {
            out.extend_from_slice(&(field.len() as u32).to_be_bytes());
            out.extend_from_slice(field.as_bytes());
        }
        out
    }

    /// Bytes the group signs: the payload bound to the request's session
    ///
    /// Equal to what a [`crate::SigningSession`] with the same identifier
    /// signs for [`AuthorizationRequest::payload`].
    pub fn message(&self) -> Vec<u8> {
        session_message(self.session_id, &self.payload())
    }
}

/// Thread-safe source of strictly increasing session identifiers
#[derive(Debug)]
pub struct SessionCounter {
    next: AtomicU64,
}

impl SessionCounter {
    /// Counter whose first identifier is `start`
    pub fn new(start: SessionId) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Counter resuming after the last identifier already issued
    pub fn resume_after(last: SessionId) -> Self {
        Self::new(last.saturating_add(1))
    }

    /// Issue the next identifier
    ///
    /// Fails once the identifier space is used up instead of wrapping; the
    /// largest identifier ever issued is `u64::MAX - 1`.
    pub fn next_id(&self) -> Result<SessionId> {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| next.checked_add(1))
            .map_err(|_| Error::InvalidParameters("Session identifiers exhausted".into()))
    }
}

impl Default for SessionCounter {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Concurrent record of session identifiers already accepted
///
/// Identifiers arrive roughly in issue order, so only the `window`
/// identifiers below the highest accepted one are remembered. Anything older
/// is refused outright.
#[derive(Debug)]
pub struct ReplayGuard {
    seen: DashSet<SessionId>,
    floor: AtomicU64,
    window: u64,
}

impl ReplayGuard {
    /// Create an empty guard with [`DEFAULT_REPLAY_WINDOW`]
    pub fn new() -> Self {
        Self::with_window(DEFAULT_REPLAY_WINDOW)
    }

    /// Create an empty guard remembering `window` identifiers
    pub fn with_window(window: u64) -> Self {
        Self {
            seen: DashSet::new(),
            floor: AtomicU64::new(0),
            window,
        }
    }

    /// Record `session_id`; `false` if it was already recorded or has fallen
    /// below the window
    pub fn record(&self, session_id: SessionId) -> bool {
        if session_id < self.floor.load(Ordering::SeqCst) || !self.seen.insert(session_id) {
            return false;
        }

        let floor = session_id.saturating_sub(self.window);
        if self.floor.fetch_max(floor, Ordering::SeqCst) < floor {
            self.seen.retain(|seen| *seen >= floor);
        }
        // a concurrent record may have raised the floor past us
        if session_id < self.floor.load(Ordering::SeqCst) {
            self.seen.remove(&session_id);
            return false;
        }
        true
    }

    /// Whether a proof for `session_id` would be refused
    pub fn contains(&self, session_id: SessionId) -> bool {
        session_id < self.floor.load(Ordering::SeqCst) || self.seen.contains(&session_id)
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed authorization presented to a connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessProof {
    /// The request that was signed
    pub request: AuthorizationRequest,
    /// Group signature over [`AuthorizationRequest::message`]
    pub signature: Signature,
}

/// Capability implemented by every cloud connector
pub trait AccessValidator: Send + Sync {
    /// Whether `proof` grants `principal_id` access to `resource_id`
    fn validate_access(&self, resource_id: &str, principal_id: &str, proof: &AccessProof) -> bool;
}

/// Supported cloud providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
}

impl Provider {
    /// Whether `resource_id` is a resource name this provider issues
    pub fn owns_resource(&self, resource_id: &str) -> bool {
        match self {
            Provider::Aws => resource_id.starts_with("arn:aws:"),
            Provider::Gcp => resource_id.starts_with("//") && resource_id.contains(".googleapis.com/"),
            Provider::Azure => resource_id.starts_with("/subscriptions/"),
        }
    }
}

/// Connector-side validator for one provider and one signing group
#[derive(Debug)]
pub struct ProviderValidator {
    provider: Provider,
    group_public_key: GroupPublicKey,
    replay: ReplayGuard,
}

impl ProviderValidator {
    /// Create a validator trusting `group_public_key`
    pub fn new(provider: Provider, group_public_key: GroupPublicKey) -> Self {
        Self {
            provider,
            group_public_key,
            replay: ReplayGuard::new(),
        }
    }

    /// Provider this validator serves
    pub fn provider(&self) -> Provider {
        self.provider
    }
}

impl AccessValidator for ProviderValidator {
    fn validate_access(&self, resource_id: &str, principal_id: &str, proof: &AccessProof) -> bool {
        let request = &proof.request;
        if !self.provider.owns_resource(resource_id) {
            debug!(provider = ?self.provider, resource_id, "Resource not owned by provider");
            return false;
        }
        if request.resource_id != resource_id || request.principal_id != principal_id {
            debug!(resource_id, principal_id, "Proof issued for a different resource or principal");
            return false;
        }
        if !verify(&request.message(), &proof.signature, &self.group_public_key) {
            warn!(session_id = request.session_id, "Access proof signature rejected");
            return false;
        }
        if !self.replay.record(request.session_id) {
            warn!(session_id = request.session_id, "Access proof replayed");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_message_binds_every_field() {
        let base = AuthorizationRequest::new("arn:aws:s3:::bucket", "alice", "read", 1);
        let variants = [
            AuthorizationRequest::new("arn:aws:s3:::other", "alice", "read", 1),
            AuthorizationRequest::new("arn:aws:s3:::bucket", "bob", "read", 1),
            AuthorizationRequest::new("arn:aws:s3:::bucket", "alice", "write", 1),
            AuthorizationRequest::new("arn:aws:s3:::bucket", "alice", "read", 2),
            // same concatenation, different field boundaries
            AuthorizationRequest::new("arn:aws:s3:::bucketa", "lice", "read", 1),
        ];
        for variant in &variants {
            assert_ne!(base.message(), variant.message());
        }
    }

    #[test]
    fn test_counter_is_monotonic_across_threads() {
        let counter = Arc::new(SessionCounter::resume_after(41));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || (0..100).map(|_| counter.next_id().unwrap()).collect::<Vec<_>>())
            })
            .collect();

        let mut ids: Vec<_> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 400);
        assert_eq!(ids[0], 42);
    }

    #[test]
    fn test_replay_guard() {
        let guard = ReplayGuard::new();
        assert!(guard.record(5));
        assert!(guard.contains(5));
        assert!(!guard.record(5));
        assert!(!guard.contains(6));
    }

    #[test]
    fn test_counter_stops_at_end_of_range() {
        let counter = SessionCounter::resume_after(u64::MAX - 2);
        assert_eq!(counter.next_id(), Ok(u64::MAX - 1));
        assert!(matches!(counter.next_id(), Err(Error::InvalidParameters(_))));
        assert!(matches!(counter.next_id(), Err(Error::InvalidParameters(_))));

        assert!(SessionCounter::resume_after(u64::MAX).next_id().is_err());
    }

    #[test]
    fn test_replay_guard_prunes_below_window() {
        let guard = ReplayGuard::with_window(4);
        for id in 1..=10 {
            assert!(guard.record(id));
        }
        // only 6..=10 are still held
        assert_eq!(guard.seen.len(), 5);

        assert!(guard.contains(3));
        assert!(!guard.record(3));
        assert!(!guard.record(7));
        assert!(guard.record(11));
        assert!(!guard.record(6));
        assert_eq!(guard.seen.len(), 5);
    }

    #[test]
    fn test_message_is_session_bound_payload() {
        let request = AuthorizationRequest::new("arn:aws:s3:::bucket", "alice", "read", 9);
        assert_eq!(request.message(), session_message(9, &request.payload()));
        assert_ne!(request.message(), session_message(10, &request.payload()));
    }

    #[test]
    fn test_provider_resource_shapes() {
        assert!(Provider::Aws.owns_resource("arn:aws:iam::123456789012:role/deploy"));
        assert!(!Provider::Aws.owns_resource("/subscriptions/abc/resourceGroups/rg"));
        assert!(Provider::Gcp.owns_resource("//storage.googleapis.com/projects/_/buckets/b"));
        assert!(!Provider::Gcp.owns_resource("arn:aws:s3:::b"));
        assert!(Provider::Azure.owns_resource("/subscriptions/abc/resourceGroups/rg"));
        assert!(!Provider::Azure.owns_resource("//compute.googleapis.com/x"));
    }
}
