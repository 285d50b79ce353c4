//! Unified error type for Meridian core operations
//!
//! Structural errors (duplicate signature, decimals conflicts, bad
//! identifiers) are surfaced synchronously at the call that violated the
//! invariant. They are never retried by the execution engine.

use serde::{Deserialize, Serialize};

/// Unified error type for core value-model operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum MeridianError {
    /// Invalid input or configuration
    #[error("invalid: {message}")]
    Invalid {
        /// Description of the invalid input
        message: String,
    },

    /// An entity identifier failed to parse or failed checksum validation
    #[error("bad entity id `{id}`: {message}")]
    BadEntityId {
        /// The offending identifier, as given
        id: String,
        /// Description of the failure
        message: String,
    },

    /// A signature from this public key is already present on the request
    #[error("duplicate signature from public key {public_key}")]
    DuplicateSignature {
        /// Hex encoding of the offending public key
        public_key: String,
    },

    /// Expected decimals for a token were set twice with different values
    #[error("expected decimals for token {token} cannot change from {previous} to {new}")]
    DecimalsMismatch {
        /// The token whose decimals conflicted
        token: String,
        /// Previously recorded decimals
        previous: u32,
        /// Conflicting new decimals
        new: u32,
    },

    /// Coalescing fungible transfers overflowed the amount range
    #[error("coalesced amount for token {token}, account {account} overflows i64")]
    AmountOverflow {
        /// The token whose coalesced amount overflowed
        token: String,
        /// The account whose coalesced amount overflowed
        account: String,
    },

    /// Canonical encoding or decoding failed
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure
        message: String,
    },

    /// Cryptographic material was malformed
    #[error("crypto error: {message}")]
    Crypto {
        /// Description of the cryptographic failure
        message: String,
    },
}

impl MeridianError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a bad entity id error
    pub fn bad_entity_id(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadEntityId {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }
}

/// Standard result type for core operations
pub type Result<T> = std::result::Result<T, MeridianError>;
