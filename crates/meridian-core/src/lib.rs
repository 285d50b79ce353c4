//! Meridian Core - Ledger Client Foundation
//!
//! This crate provides the value types and pure algorithms shared by every
//! Meridian client: entity identifiers with ledger checksums, the recursive
//! key model, canonical transfer ordering, protocol status classification,
//! and the canonical DAG-CBOR serialization all request fingerprints and
//! byte-level comparisons are built on.
//!
//! Nothing in this crate performs I/O. Network transport, node selection,
//! and the retry engine live in `meridian-client`; this crate only defines
//! what a request *is* and how its pieces compare, order, and encode.
//!
//! # Canonical Form
//!
//! Requests are compared and deduplicated by their encoded bytes, so every
//! structure that reaches the wire must have exactly one encoding:
//! - entity ids order by `(shard, realm, num)` with alias forms after
//!   numeric forms, and checksums excluded from equality and encoding
//! - transfer lists are coalesced and merge-ordered deterministically
//!   regardless of insertion order
//! - DAG-CBOR provides the canonical byte encoding

#![forbid(unsafe_code)]

/// Entity identifiers, ledger checksums, and transaction ids
pub mod entity;

/// Unified error handling
pub mod errors;

/// Tinybar-denominated currency amounts
pub mod hbar;

/// Ed25519 keys, signature sets, and the recursive threshold-key model
pub mod keys;

/// DAG-CBOR serialization (canonical format) and content fingerprints
pub mod serialization;

/// Protocol status codes and execution-state classification
pub mod status;

/// Second/nanosecond timestamps for validity windows
pub mod timestamp;

/// Fungible and NFT transfers with deterministic canonical ordering
pub mod transfers;

pub use entity::{
    AccountId, Alias, ContractId, EntityId, FileId, LedgerId, NftId, ScheduleId, TokenId, TopicId,
    TransactionId,
};
pub use errors::{MeridianError, Result};
pub use hbar::Hbar;
pub use keys::{Key, KeyList, PrivateKey, PublicKey, SignatureMap, SignaturePair, Signer};
pub use status::{classify_receipt, classify_submission, ExecutionState, Status};
pub use timestamp::Timestamp;
pub use transfers::{canonical_transfer_lists, NftTransfer, TokenTransfer, TokenTransferList};
