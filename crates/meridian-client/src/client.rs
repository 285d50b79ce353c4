//! The client: node pool, operator, configuration, and transport in one place
//!
//! A [`Client`] is cheap to share by reference; all per-request state lives
//! in the request types themselves. Requests borrow the client for the
//! duration of freeze and execute.

use crate::config::{ClientConfig, NetworkConfig, Operator};
use crate::error::ClientError;
use crate::pool::NodePool;
use crate::transport::Transport;
use meridian_core::LedgerId;
use std::sync::Arc;

/// Everything a request needs to freeze, sign, and execute
pub struct Client {
    pool: NodePool,
    transport: Arc<dyn Transport>,
    operator: Option<Operator>,
    config: ClientConfig,
    ledger_id: Option<LedgerId>,
}

impl Client {
    /// Create a client over an explicit pool and transport
    pub fn new(pool: NodePool, transport: Arc<dyn Transport>) -> Self {
        Self {
            pool,
            transport,
            operator: None,
            config: ClientConfig::default(),
            ledger_id: None,
        }
    }

    /// Create a client from a network description
    pub fn for_network(
        network: &NetworkConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        let pool = network.build_pool()?;
        let ledger_id = network.ledger_id()?;
        Ok(Self {
            pool,
            transport,
            operator: None,
            config: ClientConfig::default(),
            ledger_id,
        })
    }

    /// Attach the paying operator
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Replace the engine configuration
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Name the ledger ids are validated against
    pub fn with_ledger_id(mut self, ledger_id: LedgerId) -> Self {
        self.ledger_id = Some(ledger_id);
        self
    }

    /// The node pool
    pub fn pool(&self) -> &NodePool {
        &self.pool
    }

    /// The transport capability
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The paying operator, when attached
    pub fn operator(&self) -> Option<&Operator> {
        self.operator.as_ref()
    }

    /// The operator, or a configuration error when none is attached
    pub fn require_operator(&self) -> Result<&Operator, ClientError> {
        self.operator
            .as_ref()
            .ok_or_else(|| ClientError::config("this operation requires an operator"))
    }

    /// The engine configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The ledger this client validates checksummed ids against
    pub fn ledger_id(&self) -> Option<&LedgerId> {
        self.ledger_id.as_ref()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("nodes", &self.pool.len())
            .field("operator", &self.operator)
            .field("config", &self.config)
            .field("ledger_id", &self.ledger_id)
            .finish_non_exhaustive()
    }
}
