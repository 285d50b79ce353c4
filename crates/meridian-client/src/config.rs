//! Client configuration, operator identity, and network description
//!
//! Configuration is explicit and carried by value; nothing here reads
//! process globals. A [`NetworkConfig`] is the serde/toml-loadable
//! description of a network (node table plus trust entries) from which a
//! [`NodePool`] is built.

use crate::error::ClientError;
use crate::node::{ChannelSecurity, Node};
use crate::pool::NodePool;
use meridian_core::{AccountId, LedgerId, Signer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on dispatch attempts per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default first retry delay
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_millis(250);
/// Default retry delay cap
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);
/// Default overall per-request deadline
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Default deadline for a single dispatch
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry and deadline parameters for the execution engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    max_attempts: u32,
    min_backoff: Duration,
    max_backoff: Duration,
    request_timeout: Duration,
    attempt_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_backoff: DEFAULT_MIN_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Bound on dispatch attempts per request
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// First retry delay
    pub fn min_backoff(&self) -> Duration {
        self.min_backoff
    }

    /// Retry delay cap
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Overall per-request deadline
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Deadline for a single dispatch
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Set the attempt bound; must be at least one
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Result<Self, ClientError> {
        if max_attempts == 0 {
            return Err(ClientError::config("max_attempts must be at least 1"));
        }
        self.max_attempts = max_attempts;
        Ok(self)
    }

    /// Set the first retry delay; must not exceed the cap
    pub fn with_min_backoff(mut self, min_backoff: Duration) -> Result<Self, ClientError> {
        if min_backoff.is_zero() || min_backoff > self.max_backoff {
            return Err(ClientError::config(
                "min_backoff must be nonzero and at most max_backoff",
            ));
        }
        self.min_backoff = min_backoff;
        Ok(self)
    }

    /// Set the retry delay cap; must be at least the first delay
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Result<Self, ClientError> {
        if max_backoff < self.min_backoff {
            return Err(ClientError::config(
                "max_backoff must be at least min_backoff",
            ));
        }
        self.max_backoff = max_backoff;
        Ok(self)
    }

    /// Set the overall per-request deadline
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Result<Self, ClientError> {
        if request_timeout.is_zero() {
            return Err(ClientError::config("request_timeout must be nonzero"));
        }
        self.request_timeout = request_timeout;
        Ok(self)
    }

    /// Set the single-dispatch deadline
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Result<Self, ClientError> {
        if attempt_timeout.is_zero() {
            return Err(ClientError::config("attempt_timeout must be nonzero"));
        }
        self.attempt_timeout = attempt_timeout;
        Ok(self)
    }
}

/// The paying identity requests are created and signed under
#[derive(Clone)]
pub struct Operator {
    /// The payer account
    pub account_id: AccountId,
    /// Signing capability for the payer
    pub signer: Arc<dyn Signer>,
}

impl Operator {
    /// Create an operator from an account and any signing capability
    pub fn new(account_id: AccountId, signer: impl Signer + 'static) -> Self {
        Self {
            account_id,
            signer: Arc::new(signer),
        }
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("account_id", &self.account_id)
            .field("public_key", &self.signer.public_key().to_string())
            .finish()
    }
}

/// One node entry in a network description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    /// The `host:port` address
    pub address: String,
    /// The node's account id, in `shard.realm.num` form
    pub account_id: String,
    /// Hex SHA-384 of the node's certificate, when pinned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_cert_hash: Option<String>,
    /// Use an unencrypted channel to this node
    #[serde(default)]
    pub plaintext: bool,
}

/// A serde/toml-loadable description of a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Named ledger (`mainnet`, `testnet`, `previewnet`) or hex ledger id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<String>,
    /// The node table
    pub nodes: Vec<NodeEntry>,
}

impl NetworkConfig {
    /// Parse a network description from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ClientError> {
        toml::from_str(text)
            .map_err(|e| ClientError::config(format!("invalid network config: {e}")))
    }

    /// The ledger id named by this description, when present
    pub fn ledger_id(&self) -> Result<Option<LedgerId>, ClientError> {
        let Some(ledger) = &self.ledger else {
            return Ok(None);
        };
        let id = match ledger.as_str() {
            "mainnet" => LedgerId::mainnet(),
            "testnet" => LedgerId::testnet(),
            "previewnet" => LedgerId::previewnet(),
            other => {
                let bytes = hex::decode(other).map_err(|_| {
                    ClientError::config(format!("ledger must be a known name or hex: `{other}`"))
                })?;
                LedgerId::from_bytes(bytes)
            }
        };
        Ok(Some(id))
    }

    /// Build the node pool this description names
    pub fn build_pool(&self) -> Result<NodePool, ClientError> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for entry in &self.nodes {
            let account_id: AccountId = entry
                .account_id
                .parse()
                .map_err(ClientError::Core)?;
            let security = if entry.plaintext {
                ChannelSecurity::Plaintext
            } else {
                let pinned_cert_hash = match &entry.pinned_cert_hash {
                    None => None,
                    Some(hex_hash) => {
                        let bytes = hex::decode(hex_hash).map_err(|_| {
                            ClientError::config(format!(
                                "pinned_cert_hash for {account_id} is not hex"
                            ))
                        })?;
                        let digest: [u8; 48] = bytes.try_into().map_err(|_| {
                            ClientError::config(format!(
                                "pinned_cert_hash for {account_id} must be 48 bytes (SHA-384)"
                            ))
                        })?;
                        Some(digest)
                    }
                };
                ChannelSecurity::Tls {
                    pinned_cert_hash,
                    verify_certificates: true,
                }
            };
            nodes.push(Node::with_security(&entry.address, account_id, security));
        }
        NodePool::new(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_bounds_are_validated() {
        let config = ClientConfig::default();
        assert!(config
            .clone()
            .with_min_backoff(Duration::from_secs(60))
            .is_err());
        assert!(config.clone().with_max_attempts(0).is_err());
        let config = config
            .with_max_backoff(Duration::from_secs(30))
            .and_then(|c| c.with_min_backoff(Duration::from_secs(1)))
            .unwrap();
        assert_eq!(config.min_backoff(), Duration::from_secs(1));
        assert_eq!(config.max_backoff(), Duration::from_secs(30));
    }

    #[test]
    fn network_config_parses_and_builds_pool() {
        let text = r#"
            ledger = "testnet"

            [[nodes]]
            address = "0.testnet.example.com:50212"
            account_id = "0.0.3"
            pinned_cert_hash = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f202122232425262728292a2b2c2d2e2f"

            [[nodes]]
            address = "1.testnet.example.com:50211"
            account_id = "0.0.4"
            plaintext = true
        "#;
        let network = NetworkConfig::from_toml(text).unwrap();
        assert_eq!(network.ledger_id().unwrap(), Some(LedgerId::testnet()));

        let pool = network.build_pool().unwrap();
        assert_eq!(pool.len(), 2);
        let pinned = pool.get(&AccountId::from_num(3)).unwrap();
        assert!(matches!(
            pinned.security(),
            ChannelSecurity::Tls {
                pinned_cert_hash: Some(_),
                ..
            }
        ));
        let open = pool.get(&AccountId::from_num(4)).unwrap();
        assert_eq!(open.security(), &ChannelSecurity::Plaintext);
    }

    #[test]
    fn bad_cert_hash_length_is_rejected() {
        let text = r#"
            [[nodes]]
            address = "0.testnet.example.com:50212"
            account_id = "0.0.3"
            pinned_cert_hash = "abcd"
        "#;
        let network = NetworkConfig::from_toml(text).unwrap();
        assert_matches::assert_matches!(network.build_pool(), Err(ClientError::Config { .. }));
    }
}
