//! DAG-CBOR canonical serialization
//!
//! Signable request bodies must be byte-identical for identical logical
//! content: the network deduplicates resubmissions by content fingerprint,
//! and signatures cover the exact bytes. DAG-CBOR provides the
//! deterministic canonical encoding; fingerprints are SHA-256 over it.

use crate::errors::MeridianError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Serialize any serde-compatible type to canonical DAG-CBOR bytes
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, MeridianError> {
    serde_ipld_dagcbor::to_vec(value).map_err(|e| MeridianError::serialization(e.to_string()))
}

/// Deserialize canonical DAG-CBOR bytes
pub fn from_slice<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, MeridianError> {
    serde_ipld_dagcbor::from_slice(bytes).map_err(|e| MeridianError::serialization(e.to_string()))
}

/// SHA-256 over the canonical encoding of `value`
pub fn hash_canonical<T: Serialize>(value: &T) -> Result<[u8; 32], MeridianError> {
    Ok(hash_bytes(&to_vec(value)?))
}

/// SHA-256 over raw bytes
pub fn hash_bytes(bytes: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}
