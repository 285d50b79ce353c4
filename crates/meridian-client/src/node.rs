//! Node model: address, identity, channel trust, and health state
//!
//! A node is unhealthy while its readmit time lies in the future. Each
//! recorded failure pushes the readmit time out by the current backoff and
//! doubles the backoff up to a cap; a recorded success resets it. Health
//! state sits behind a mutex so a node can be shared across concurrent
//! requests.

use meridian_core::AccountId;
use parking_lot::Mutex;
use sha2::{Digest, Sha384};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Backoff applied after a node's first failure
pub const MIN_NODE_BACKOFF: Duration = Duration::from_millis(250);
/// Upper bound on per-node backoff
pub const MAX_NODE_BACKOFF: Duration = Duration::from_secs(8);

/// Channel trust mode for a node connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSecurity {
    /// Unencrypted channel, for tests and closed networks
    Plaintext,
    /// TLS channel, optionally pinned to one certificate
    Tls {
        /// SHA-384 digest of the expected certificate in DER form
        pinned_cert_hash: Option<[u8; 48]>,
        /// Whether to verify the certificate chain at all
        verify_certificates: bool,
    },
}

impl ChannelSecurity {
    /// TLS with chain verification and no pin
    pub fn tls() -> Self {
        Self::Tls {
            pinned_cert_hash: None,
            verify_certificates: true,
        }
    }

    /// TLS pinned to the SHA-384 digest of `cert_der`
    pub fn tls_pinned_to(cert_der: &[u8]) -> Self {
        let digest: [u8; 48] = Sha384::digest(cert_der).into();
        Self::Tls {
            pinned_cert_hash: Some(digest),
            verify_certificates: true,
        }
    }
}

#[derive(Debug)]
struct Health {
    current_backoff: Duration,
    readmit_at: Option<Instant>,
    failures: u32,
}

/// A single network node the engine can dispatch to
#[derive(Debug)]
pub struct Node {
    address: String,
    account_id: AccountId,
    security: ChannelSecurity,
    min_backoff: Duration,
    max_backoff: Duration,
    health: Mutex<Health>,
}

impl Node {
    /// Create a plaintext node with default backoff bounds
    pub fn new(address: impl Into<String>, account_id: AccountId) -> Self {
        Self::with_security(address, account_id, ChannelSecurity::Plaintext)
    }

    /// Create a node with an explicit channel trust mode
    pub fn with_security(
        address: impl Into<String>,
        account_id: AccountId,
        security: ChannelSecurity,
    ) -> Self {
        Self {
            address: address.into(),
            account_id,
            security,
            min_backoff: MIN_NODE_BACKOFF,
            max_backoff: MAX_NODE_BACKOFF,
            health: Mutex::new(Health {
                current_backoff: MIN_NODE_BACKOFF,
                readmit_at: None,
                failures: 0,
            }),
        }
    }

    /// The gRPC-style `host:port` address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The account id identifying this node on the ledger
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// The channel trust mode
    pub fn security(&self) -> &ChannelSecurity {
        &self.security
    }

    /// Whether `cert_der` is acceptable under this node's trust mode.
    ///
    /// Plaintext channels and unpinned TLS accept any certificate here;
    /// chain verification is the transport's concern.
    pub fn accepts_certificate(&self, cert_der: &[u8]) -> bool {
        match &self.security {
            ChannelSecurity::Plaintext | ChannelSecurity::Tls {
                pinned_cert_hash: None,
                ..
            } => true,
            ChannelSecurity::Tls {
                pinned_cert_hash: Some(pinned),
                ..
            } => {
                let digest: [u8; 48] = Sha384::digest(cert_der).into();
                digest == *pinned
            }
        }
    }

    /// Whether the node is currently eligible for selection
    pub fn is_healthy(&self) -> bool {
        self.backoff_remaining().is_zero()
    }

    /// Time until the node becomes eligible again; zero when healthy
    pub fn backoff_remaining(&self) -> Duration {
        let health = self.health.lock();
        match health.readmit_at {
            Some(readmit_at) => readmit_at.saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Record a failed dispatch: push the readmit time out by the current
    /// backoff, then double the backoff up to the cap.
    pub fn record_failure(&self) {
        let mut health = self.health.lock();
        health.readmit_at = Some(Instant::now() + health.current_backoff);
        health.current_backoff = (health.current_backoff * 2).min(self.max_backoff);
        health.failures += 1;
        debug!(
            node = %self.account_id,
            failures = health.failures,
            next_backoff = ?health.current_backoff,
            "node dispatch failed"
        );
    }

    /// Record a successful dispatch: reset backoff and readmit immediately
    pub fn record_success(&self) {
        let mut health = self.health.lock();
        health.current_backoff = self.min_backoff;
        health.readmit_at = None;
        health.failures = 0;
    }

    /// Number of failures recorded since the last success
    pub fn failure_count(&self) -> u32 {
        self.health.lock().failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node::new("10.0.0.1:50211", AccountId::from_num(3))
    }

    #[tokio::test(start_paused = true)]
    async fn failure_backoff_doubles_and_caps() {
        let node = node();
        assert!(node.is_healthy());

        let mut previous = Duration::ZERO;
        for _ in 0..8 {
            node.record_failure();
            let remaining = node.backoff_remaining();
            assert!(remaining >= previous);
            assert!(remaining <= MAX_NODE_BACKOFF);
            previous = remaining;
        }
        assert_eq!(node.backoff_remaining(), MAX_NODE_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn node_readmits_after_backoff_elapses() {
        let node = node();
        node.record_failure();
        assert!(!node.is_healthy());
        tokio::time::advance(MIN_NODE_BACKOFF).await;
        assert!(node.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_backoff() {
        let node = node();
        for _ in 0..5 {
            node.record_failure();
        }
        node.record_success();
        assert!(node.is_healthy());
        assert_eq!(node.failure_count(), 0);

        // After a reset the next failure starts from the minimum again.
        node.record_failure();
        assert_eq!(node.backoff_remaining(), MIN_NODE_BACKOFF);
    }

    #[test]
    fn certificate_pinning_matches_exact_der() {
        let cert = b"certificate-der-bytes";
        let node = Node::with_security(
            "10.0.0.1:50212",
            AccountId::from_num(3),
            ChannelSecurity::tls_pinned_to(cert),
        );
        assert!(node.accepts_certificate(cert));
        assert!(!node.accepts_certificate(b"some other certificate"));
    }
}
