//! Entity-id checksums bound to a ledger
//!
//! A checksum is five lowercase letters derived from the `shard.realm.num`
//! digits and the ledger identifier. It exists purely for input validation:
//! a checksum computed against one ledger fails validation against another,
//! catching copy-paste of ids across networks. Checksums are never encoded
//! on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a ledger (network) for checksum computation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerId(Vec<u8>);

impl LedgerId {
    /// The production ledger
    pub fn mainnet() -> Self {
        Self(vec![0])
    }

    /// The stable test ledger
    pub fn testnet() -> Self {
        Self(vec![1])
    }

    /// The preview test ledger
    pub fn previewnet() -> Self {
        Self(vec![2])
    }

    /// Construct from raw ledger id bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw ledger id bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Compute the five-letter checksum for `addr` (the `shard.realm.num`
/// rendering of an entity id) on the given ledger.
///
/// Weighted digit sums are folded with the ledger id bytes (extended by six
/// zero bytes) into a single value mod 26^5, then rendered base-26.
pub fn checksum(ledger_id: &LedgerId, addr: &str) -> String {
    const P3: u64 = 26 * 26 * 26;
    const P5: u64 = 26 * 26 * 26 * 26 * 26;
    const M: u64 = 1_000_003;
    const W: u64 = 31;

    let digits: Vec<u64> = addr
        .chars()
        .map(|c| {
            if c == '.' {
                10
            } else {
                u64::from(c.to_digit(10).unwrap_or(0))
            }
        })
        .collect();

    let mut sd0 = 0u64; // digits at even positions, mod 11
    let mut sd1 = 0u64; // digits at odd positions, mod 11
    let mut sd = 0u64; // weighted sum of all digits, mod 26^3
    for (i, d) in digits.iter().enumerate() {
        sd = (W * sd + d) % P3;
        if i % 2 == 0 {
            sd0 = (sd0 + d) % 11;
        } else {
            sd1 = (sd1 + d) % 11;
        }
    }

    let mut sh = 0u64; // ledger hash, mod 26^5
    for b in ledger_id.as_bytes().iter().chain([0u8; 6].iter()) {
        sh = (W * sh + u64::from(*b)) % P5;
    }

    let len = digits.len() as u64;
    let mut c = ((((len % 5) * 11 + sd0) * 11 + sd1) * P3 + sd + sh) % P5;
    c = (c * M) % P5;

    let mut letters = [0u8; 5];
    for slot in letters.iter_mut().rev() {
        *slot = b'a' + (c % 26) as u8;
        c /= 26;
    }
    // letters are always ASCII lowercase
    String::from_utf8_lossy(&letters).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_five_lowercase_letters() {
        let sum = checksum(&LedgerId::mainnet(), "0.0.123");
        assert_eq!(sum.len(), 5);
        assert!(sum.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn checksum_depends_on_ledger() {
        let on_mainnet = checksum(&LedgerId::mainnet(), "0.0.123");
        let on_testnet = checksum(&LedgerId::testnet(), "0.0.123");
        assert_ne!(on_mainnet, on_testnet);
    }

    #[test]
    fn checksum_depends_on_address() {
        let a = checksum(&LedgerId::mainnet(), "0.0.123");
        let b = checksum(&LedgerId::mainnet(), "0.0.124");
        assert_ne!(a, b);
    }

    #[test]
    fn checksum_is_stable() {
        let first = checksum(&LedgerId::previewnet(), "1.2.3");
        let second = checksum(&LedgerId::previewnet(), "1.2.3");
        assert_eq!(first, second);
    }
}
