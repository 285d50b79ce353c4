//! Node pool and selection policy
//!
//! Selection prefers healthy nodes, picked at random to spread load. When
//! every candidate is backing off, the pool hands back the node closest to
//! readmission along with its remaining delay so the engine can wait
//! instead of hammering an impaired network.

use crate::error::ClientError;
use crate::node::Node;
use meridian_core::AccountId;
use rand::Rng;
use std::sync::Arc;
use tracing::trace;

/// The node chosen for the next dispatch
#[derive(Debug, Clone)]
pub struct Selected {
    /// The chosen node
    pub node: Arc<Node>,
    /// Time to wait before dispatching; zero when the node is healthy
    pub delay: std::time::Duration,
}

/// A non-empty set of nodes with unique account ids
#[derive(Debug, Clone)]
pub struct NodePool {
    nodes: Vec<Arc<Node>>,
}

impl NodePool {
    /// Build a pool; requires at least one node and unique node account ids
    pub fn new(nodes: Vec<Node>) -> Result<Self, ClientError> {
        if nodes.is_empty() {
            return Err(ClientError::config("node pool requires at least one node"));
        }
        for (i, node) in nodes.iter().enumerate() {
            if nodes[..i].iter().any(|n| n.account_id() == node.account_id()) {
                return Err(ClientError::config(format!(
                    "duplicate node account id {} in pool",
                    node.account_id()
                )));
            }
        }
        Ok(Self {
            nodes: nodes.into_iter().map(Arc::new).collect(),
        })
    }

    /// All nodes in the pool
    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    /// Number of nodes in the pool
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the pool is empty; always false for a constructed pool
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Account ids of every node, in pool order
    pub fn account_ids(&self) -> Vec<AccountId> {
        self.nodes.iter().map(|n| n.account_id().clone()).collect()
    }

    /// Look up a node by its account id
    pub fn get(&self, account_id: &AccountId) -> Option<Arc<Node>> {
        self.nodes
            .iter()
            .find(|n| n.account_id() == account_id)
            .cloned()
    }

    /// A sub-pool containing exactly the named nodes
    pub fn restrict(&self, account_ids: &[AccountId]) -> Result<Self, ClientError> {
        let mut nodes = Vec::with_capacity(account_ids.len());
        for id in account_ids {
            let node = self
                .get(id)
                .ok_or_else(|| ClientError::config(format!("node {id} is not in the pool")))?;
            nodes.push(node);
        }
        if nodes.is_empty() {
            return Err(ClientError::config("restriction to an empty node set"));
        }
        Ok(Self { nodes })
    }

    /// Choose the next node to dispatch to.
    ///
    /// Nodes in `excluding` are skipped unless that would leave no
    /// candidate. Healthy candidates win, chosen at random; otherwise the
    /// candidate with the least remaining backoff is returned together with
    /// that delay.
    pub fn select(&self, excluding: &[AccountId]) -> Selected {
        let candidates: Vec<&Arc<Node>> = {
            let remaining: Vec<&Arc<Node>> = self
                .nodes
                .iter()
                .filter(|n| !excluding.contains(n.account_id()))
                .collect();
            if remaining.is_empty() {
                self.nodes.iter().collect()
            } else {
                remaining
            }
        };

        let healthy: Vec<&Arc<Node>> = candidates
            .iter()
            .copied()
            .filter(|n| n.is_healthy())
            .collect();
        if !healthy.is_empty() {
            let pick = rand::thread_rng().gen_range(0..healthy.len());
            let node = Arc::clone(healthy[pick]);
            trace!(node = %node.account_id(), "selected healthy node");
            return Selected {
                node,
                delay: std::time::Duration::ZERO,
            };
        }

        // Every candidate is backing off: wait out the shortest one.
        let mut best = candidates[0];
        let mut best_delay = best.backoff_remaining();
        for candidate in candidates.iter().copied().skip(1) {
            let delay = candidate.backoff_remaining();
            if delay < best_delay {
                best = candidate;
                best_delay = delay;
            }
        }
        trace!(node = %best.account_id(), delay = ?best_delay, "all nodes backing off");
        Selected {
            node: Arc::clone(best),
            delay: best_delay,
        }
    }
}
