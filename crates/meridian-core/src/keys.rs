//! Recursive key model and the signing capability seam
//!
//! A ledger key is either a single public key or a list of child keys with
//! an optional threshold, nested to arbitrary depth. This module manages
//! the *set* of collected signatures and whether a key structure is
//! structurally satisfied by it; actual signing is delegated to a [`Signer`]
//! capability so the engine never touches curve operations directly.

use crate::errors::MeridianError;
use ed25519_dalek::Signer as _;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An Ed25519 public key
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PublicKey(ed25519_dalek::VerifyingKey);

impl PublicKey {
    /// Parse from the 32-byte compressed encoding
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, MeridianError> {
        ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|e| MeridianError::crypto(format!("invalid public key: {e}")))
    }

    /// The 32-byte compressed encoding
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Verify `signature` over `message` with this key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(sig) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        self.0.verify_strict(message, &sig).is_ok()
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

/// An Ed25519 private key usable as a [`Signer`]
#[derive(Clone)]
pub struct PrivateKey(ed25519_dalek::SigningKey);

impl PrivateKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        Self(ed25519_dalek::SigningKey::generate(&mut OsRng))
    }

    /// Construct from the 32-byte seed
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(bytes))
    }

    /// The corresponding public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material
        write!(f, "PrivateKey({})", self.public_key())
    }
}

/// Signing capability consumed by the execution engine.
///
/// Implementations are expected to be synchronous and side-effect free.
pub trait Signer: Send + Sync {
    /// The public key signatures from this signer will verify under
    fn public_key(&self) -> PublicKey;

    /// Produce the signature bytes for `message`
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

impl Signer for PrivateKey {
    fn public_key(&self) -> PublicKey {
        PrivateKey::public_key(self)
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.0.sign(message).to_bytes().to_vec()
    }
}

/// A collected (public key, signature bytes) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePair {
    /// The key the signature verifies under
    pub public_key: PublicKey,
    /// The raw signature bytes
    pub signature: Vec<u8>,
}

/// The set of signatures collected on one envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMap {
    pairs: Vec<SignaturePair>,
}

impl SignatureMap {
    /// An empty signature set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a signature from `public_key` is present
    pub fn contains(&self, public_key: &PublicKey) -> bool {
        self.pairs.iter().any(|p| p.public_key == *public_key)
    }

    /// Add a signature pair; a second signature from the same public key is
    /// a structural error.
    pub fn add(&mut self, pair: SignaturePair) -> Result<(), MeridianError> {
        if self.contains(&pair.public_key) {
            return Err(MeridianError::DuplicateSignature {
                public_key: pair.public_key.to_string(),
            });
        }
        self.pairs.push(pair);
        Ok(())
    }

    /// Iterate over the collected pairs
    pub fn iter(&self) -> impl Iterator<Item = &SignaturePair> {
        self.pairs.iter()
    }

    /// Number of collected signatures
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no signatures have been collected
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// A ledger key: a single public key or a nested threshold list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    /// A primitive public key
    Single(PublicKey),
    /// A composite list with an optional threshold
    KeyList(KeyList),
}

impl Key {
    /// Whether the collected signatures structurally satisfy this key.
    ///
    /// A single key is satisfied iff a signature from that key is present;
    /// a list is satisfied iff at least `threshold` children are satisfied
    /// (all children when no threshold is set), evaluated depth-first.
    /// Satisfaction is monotonic: adding signatures never unsatisfies a key.
    pub fn is_satisfied_by(&self, signatures: &SignatureMap) -> bool {
        match self {
            Key::Single(public_key) => signatures.contains(public_key),
            Key::KeyList(list) => {
                let required = list
                    .threshold
                    .map_or(list.keys.len(), |t| (t as usize).min(list.keys.len()));
                let mut satisfied = 0usize;
                for child in &list.keys {
                    if child.is_satisfied_by(signatures) {
                        satisfied += 1;
                        if satisfied >= required {
                            return true;
                        }
                    }
                }
                satisfied >= required
            }
        }
    }
}

impl From<PublicKey> for Key {
    fn from(public_key: PublicKey) -> Self {
        Key::Single(public_key)
    }
}

impl From<KeyList> for Key {
    fn from(list: KeyList) -> Self {
        Key::KeyList(list)
    }
}

/// An ordered list of child keys with an optional satisfaction threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyList {
    /// The child keys, in order
    pub keys: Vec<Key>,
    /// Minimum number of satisfied children; `None` requires all of them
    pub threshold: Option<u32>,
}

impl KeyList {
    /// A list requiring every child key
    pub fn of(keys: Vec<Key>) -> Self {
        Self {
            keys,
            threshold: None,
        }
    }

    /// A list requiring at least `threshold` child keys
    pub fn with_threshold(keys: Vec<Key>, threshold: u32) -> Self {
        Self {
            keys,
            threshold: Some(threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> PrivateKey {
        PrivateKey::from_bytes(&[seed; 32])
    }

    fn signed_by(signers: &[&PrivateKey]) -> SignatureMap {
        let mut map = SignatureMap::new();
        for signer in signers {
            map.add(SignaturePair {
                public_key: signer.public_key(),
                signature: Signer::sign(*signer, b"payload"),
            })
            .unwrap();
        }
        map
    }

    #[test]
    fn single_key_requires_matching_signature() {
        let a = key(1);
        let b = key(2);
        let k = Key::Single(a.public_key());
        assert!(k.is_satisfied_by(&signed_by(&[&a])));
        assert!(!k.is_satisfied_by(&signed_by(&[&b])));
    }

    #[test]
    fn key_list_defaults_to_all_children() {
        let (a, b) = (key(1), key(2));
        let k: Key = KeyList::of(vec![
            Key::Single(a.public_key()),
            Key::Single(b.public_key()),
        ])
        .into();
        assert!(!k.is_satisfied_by(&signed_by(&[&a])));
        assert!(k.is_satisfied_by(&signed_by(&[&a, &b])));
    }

    #[test]
    fn threshold_list_accepts_partial_signatures() {
        let (a, b, c) = (key(1), key(2), key(3));
        let k: Key = KeyList::with_threshold(
            vec![
                Key::Single(a.public_key()),
                Key::Single(b.public_key()),
                Key::Single(c.public_key()),
            ],
            2,
        )
        .into();
        assert!(!k.is_satisfied_by(&signed_by(&[&a])));
        assert!(k.is_satisfied_by(&signed_by(&[&a, &c])));
    }

    #[test]
    fn nested_lists_evaluate_depth_first() {
        let (a, b, c) = (key(1), key(2), key(3));
        let inner = KeyList::with_threshold(
            vec![Key::Single(b.public_key()), Key::Single(c.public_key())],
            1,
        );
        let outer: Key = KeyList::of(vec![Key::Single(a.public_key()), inner.into()]).into();
        assert!(!outer.is_satisfied_by(&signed_by(&[&a])));
        assert!(outer.is_satisfied_by(&signed_by(&[&a, &c])));
    }

    #[test]
    fn satisfaction_is_monotonic() {
        let (a, b) = (key(1), key(2));
        let k: Key = KeyList::with_threshold(
            vec![Key::Single(a.public_key()), Key::Single(b.public_key())],
            1,
        )
        .into();

        let mut map = signed_by(&[&a]);
        assert!(k.is_satisfied_by(&map));
        map.add(SignaturePair {
            public_key: b.public_key(),
            signature: Signer::sign(&b, b"payload"),
        })
        .unwrap();
        assert!(k.is_satisfied_by(&map));
    }

    #[test]
    fn duplicate_signature_is_rejected() {
        let a = key(1);
        let mut map = signed_by(&[&a]);
        let err = map
            .add(SignaturePair {
                public_key: a.public_key(),
                signature: Signer::sign(&a, b"payload"),
            })
            .unwrap_err();
        assert!(matches!(err, MeridianError::DuplicateSignature { .. }));
    }

    #[test]
    fn signatures_verify_under_their_public_key() {
        let a = key(9);
        let sig = Signer::sign(&a, b"message");
        assert!(a.public_key().verify(b"message", &sig));
        assert!(!a.public_key().verify(b"other", &sig));
    }
}
