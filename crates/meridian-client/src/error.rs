//! Client-side error taxonomy
//!
//! Errors fall into three families: structural errors from the core value
//! model (wrapped transparently), terminal protocol rejections surfaced by
//! the execution engine, and give-up conditions (`MaxAttemptsExceeded`,
//! `Timeout`) that wrap the last observed cause so callers can see why the
//! final attempt failed.

use crate::receipt::TransactionReceipt;
use crate::transport::TransportError;
use meridian_core::{MeridianError, Status, TransactionId};
use std::time::Duration;

/// Errors produced while configuring, freezing, or executing requests
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A structural error from the core value model
    #[error(transparent)]
    Core(#[from] MeridianError),

    /// The transport failed in a way the engine will not retry
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The network rejected the request at precheck
    #[error("precheck rejected the request with status {status}")]
    Precheck {
        /// The rejecting status code
        status: Status,
        /// The transaction the rejection applies to, when known
        transaction_id: Option<TransactionId>,
    },

    /// The transaction reached consensus but was rejected
    #[error("transaction {transaction_id} failed with receipt status {}", .receipt.status)]
    ReceiptStatus {
        /// The transaction whose receipt carries a failing status
        transaction_id: TransactionId,
        /// The terminal receipt, including the failing status
        receipt: TransactionReceipt,
    },

    /// The validity window closed before the request could be submitted
    #[error("transaction {transaction_id} expired before submission")]
    RequestExpired {
        /// The transaction whose window closed
        transaction_id: TransactionId,
    },

    /// Every permitted attempt failed; carries the final cause
    #[error("request failed after {attempts} attempts: {last}")]
    MaxAttemptsExceeded {
        /// Number of attempts made
        attempts: u32,
        /// The error observed on the final attempt
        #[source]
        last: Box<ClientError>,
    },

    /// The overall request deadline elapsed
    #[error("request deadline of {timeout:?} exceeded")]
    Timeout {
        /// The configured overall deadline
        timeout: Duration,
    },

    /// Client or network configuration is unusable
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// The transport returned a response of the wrong shape for the request
    #[error("response shape did not match the request kind")]
    UnexpectedResponse,
}

impl ClientError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Standard result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
