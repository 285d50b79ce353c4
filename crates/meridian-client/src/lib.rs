//! Meridian Client - Request Execution Engine
//!
//! This crate turns the value model of `meridian-core` into a working
//! client: it drafts and freezes transactions into canonical per-node
//! envelopes, signs them, selects nodes with health-aware backoff, drives
//! the retrying execution loop over a pluggable [`Transport`], and resolves
//! eventual-consistency receipts.
//!
//! The flow a caller sees:
//!
//! 1. build a [`TransactionDraft`] and `freeze` it against a [`Client`];
//! 2. `sign_with` one or more [`Signer`](meridian_core::Signer)s;
//! 3. `execute` — the engine retries across nodes until a node accepts
//!    custody or a terminal error occurs;
//! 4. `get_receipt` on the returned [`TransactionResponse`] to poll the
//!    terminal outcome and validate the business status.

#![forbid(unsafe_code)]

/// The client: pool, operator, configuration, and transport
pub mod client;

/// Engine configuration, operator identity, network description
pub mod config;

/// Client-side error taxonomy
pub mod error;

/// The retrying execution engine and its capability trait
pub mod execute;

/// Node model with channel trust and health state
pub mod node;

/// Node pool and selection policy
pub mod pool;

/// Receipts and eventual-consistency resolution
pub mod receipt;

/// Transaction drafting, freezing, and signing
pub mod request;

/// Transport capability and wire envelopes
pub mod transport;

pub use client::Client;
pub use config::{ClientConfig, NetworkConfig, NodeEntry, Operator};
pub use error::{ClientError, Result};
pub use execute::{execute, Execute};
pub use node::{ChannelSecurity, Node};
pub use pool::{NodePool, Selected};
pub use receipt::{TransactionReceipt, TransactionReceiptQuery, TransactionResponse};
pub use request::{FrozenTransaction, SignedEnvelope, TransactionDraft};
pub use transport::{Transport, TransportError, WireRequest, WireResponse};
