//! Transport capability consumed by the execution engine
//!
//! The engine never opens channels itself; it hands a fully formed wire
//! request to a [`Transport`] implementation together with the target node.
//! Transport failures carry their own retryability classification: a
//! connection-level failure says nothing about the request, so the engine
//! rotates nodes, while anything else is surfaced as terminal.

use crate::node::Node;
use crate::receipt::TransactionReceipt;
use crate::request::SignedEnvelope;
use async_trait::async_trait;
use meridian_core::{Status, TransactionId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A request as handed to the transport, one of the supported wire methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireRequest {
    /// Submit a signed transaction envelope
    Submit(SignedEnvelope),
    /// Poll for the receipt of a previously submitted transaction
    ReceiptQuery {
        /// The transaction to look up
        transaction_id: TransactionId,
    },
}

/// A response as handed back by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireResponse {
    /// Precheck outcome of a submission
    Precheck {
        /// The node's precheck status
        status: Status,
    },
    /// Outcome of a receipt query
    Receipt {
        /// Precheck status of the query itself
        precheck: Status,
        /// The receipt, when the node has one
        receipt: Option<TransactionReceipt>,
    },
}

/// Connection-level failures, classified for the retry loop
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The node could not be reached
    #[error("node unavailable: {0}")]
    Unavailable(String),

    /// The node shed load before processing the request
    #[error("node resources exhausted: {0}")]
    ResourceExhausted(String),

    /// The stream was reset mid-request
    #[error("connection reset: {0}")]
    ConnectionReset(String),

    /// The per-attempt deadline elapsed before a response arrived
    #[error("attempt deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// The presented certificate did not match the pinned hash
    #[error("certificate mismatch for node at {address}")]
    CertificateMismatch {
        /// Address of the offending node
        address: String,
    },

    /// Any other channel failure; not retried
    #[error("transport failure: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether the engine should rotate to another node and keep going
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Unavailable(_)
                | TransportError::ResourceExhausted(_)
                | TransportError::ConnectionReset(_)
                | TransportError::DeadlineExceeded(_)
                | TransportError::CertificateMismatch { .. }
        )
    }
}

/// Capability for dispatching one wire request to one node.
///
/// Implementations own channel management, TLS (including honoring the
/// node's [`ChannelSecurity`](crate::node::ChannelSecurity)), and encoding
/// onto the actual RPC substrate. They must be safe to call concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dispatch `request` to `node` and await its response
    async fn send(&self, node: &Node, request: WireRequest) -> Result<WireResponse, TransportError>;
}
