//! Entity identifiers
//!
//! Every addressable object on the ledger (account, token, contract, file,
//! topic, schedule) is identified by a `(shard, realm, num)` triple, or by
//! an alias for accounts created from a public key or an EVM-style address.
//! The two forms are mutually exclusive. Identifiers carry a stable total
//! order because canonical request bodies sort by them.
//!
//! A checksum may be attached for validation against a specific ledger; it
//! participates in parsing and display but never in equality, ordering, or
//! the wire encoding.

mod checksum;
mod transaction_id;

pub use checksum::{checksum, LedgerId};
pub use transaction_id::TransactionId;

use crate::errors::MeridianError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Alias form of an entity id, used instead of a numeric triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Alias {
    /// Derived from a public key
    Key(Vec<u8>),
    /// A 20-byte EVM-style address
    EvmAddress([u8; 20]),
}

impl Alias {
    fn order_key(&self) -> (u8, &[u8]) {
        match self {
            Alias::Key(bytes) => (0, bytes),
            Alias::EvmAddress(bytes) => (1, bytes),
        }
    }
}

/// The shared representation behind every typed entity id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityId {
    /// Shard number
    pub shard: u64,
    /// Realm number
    pub realm: u64,
    /// Entity number within the realm; zero when an alias is present
    pub num: u64,
    /// Alias form, mutually exclusive with a nonzero `num`
    pub alias: Option<Alias>,
    /// Attached checksum, for input validation only
    #[serde(skip)]
    pub checksum: Option<String>,
}

impl EntityId {
    /// Create a numeric entity id
    pub fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self {
            shard,
            realm,
            num,
            alias: None,
            checksum: None,
        }
    }

    /// Create an alias-form entity id
    pub fn from_alias(shard: u64, realm: u64, alias: Alias) -> Self {
        Self {
            shard,
            realm,
            num: 0,
            alias: Some(alias),
            checksum: None,
        }
    }

    /// The `shard.realm.num` rendering without any checksum
    pub fn address(&self) -> String {
        format!("{}.{}.{}", self.shard, self.realm, self.num)
    }

    /// Attach the checksum for the given ledger
    pub fn with_checksum(mut self, ledger_id: &LedgerId) -> Self {
        if self.alias.is_none() {
            self.checksum = Some(checksum(ledger_id, &self.address()));
        }
        self
    }

    /// Validate an attached checksum against the given ledger.
    ///
    /// Ids without an attached checksum validate trivially; alias-form ids
    /// never carry checksums.
    pub fn validate_checksum(&self, ledger_id: &LedgerId) -> Result<(), MeridianError> {
        let Some(present) = &self.checksum else {
            return Ok(());
        };
        let expected = checksum(ledger_id, &self.address());
        if *present == expected {
            Ok(())
        } else {
            Err(MeridianError::bad_entity_id(
                format!("{}-{}", self.address(), present),
                format!("expected checksum {expected} on ledger {ledger_id}"),
            ))
        }
    }

    fn parse(s: &str) -> Result<Self, MeridianError> {
        let (address, checksum) = match s.split_once('-') {
            Some((addr, sum)) => (addr, Some(sum)),
            None => (s, None),
        };

        let mut parts = address.splitn(3, '.');
        let (shard, realm, num) = match (parts.next(), parts.next(), parts.next()) {
            (Some(shard), Some(realm), Some(num)) => (shard, realm, num),
            _ => {
                return Err(MeridianError::bad_entity_id(
                    s,
                    "expected `shard.realm.num`",
                ))
            }
        };

        let parse_part = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| MeridianError::bad_entity_id(s, format!("invalid number `{part}`")))
        };

        if let Some(sum) = checksum {
            if sum.len() != 5 || !sum.chars().all(|c| c.is_ascii_lowercase()) {
                return Err(MeridianError::bad_entity_id(
                    s,
                    "checksum must be five lowercase letters",
                ));
            }
        }

        Ok(Self {
            shard: parse_part(shard)?,
            realm: parse_part(realm)?,
            num: parse_part(num)?,
            alias: None,
            checksum: checksum.map(str::to_owned),
        })
    }
}

// Checksums are advisory: two ids naming the same entity compare equal even
// when only one carries a checksum.
impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        self.shard == other.shard
            && self.realm == other.realm
            && self.num == other.num
            && self.alias == other.alias
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shard.hash(state);
        self.realm.hash(state);
        self.num.hash(state);
        self.alias.hash(state);
    }
}

impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.shard, self.realm, self.num)
            .cmp(&(other.shard, other.realm, other.num))
            .then_with(|| match (&self.alias, &other.alias) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.order_key().cmp(&b.order_key()),
            })
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(alias) = &self.alias {
            let rendered = match alias {
                Alias::Key(bytes) => hex::encode(bytes),
                Alias::EvmAddress(bytes) => hex::encode(bytes),
            };
            return write!(f, "{}.{}.{}", self.shard, self.realm, rendered);
        }
        match &self.checksum {
            Some(sum) => write!(f, "{}-{}", self.address(), sum),
            None => write!(f, "{}", self.address()),
        }
    }
}

macro_rules! entity_id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub EntityId);

        impl $name {
            /// Create from a `(shard, realm, num)` triple
            pub fn new(shard: u64, realm: u64, num: u64) -> Self {
                Self(EntityId::new(shard, realm, num))
            }

            /// Shorthand for an id in shard 0, realm 0
            pub fn from_num(num: u64) -> Self {
                Self::new(0, 0, num)
            }

            /// Attach the checksum for the given ledger
            pub fn with_checksum(self, ledger_id: &LedgerId) -> Self {
                Self(self.0.with_checksum(ledger_id))
            }

            /// Validate an attached checksum against the given ledger
            pub fn validate_checksum(&self, ledger_id: &LedgerId) -> Result<(), MeridianError> {
                self.0.validate_checksum(ledger_id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = MeridianError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                EntityId::parse(s).map(Self)
            }
        }
    };
}

entity_id_type!(
    /// Identifies an account, including the payer and node accounts
    AccountId
);
entity_id_type!(
    /// Identifies a fungible or non-fungible token type
    TokenId
);
entity_id_type!(
    /// Identifies a smart contract instance
    ContractId
);
entity_id_type!(
    /// Identifies a stored file
    FileId
);
entity_id_type!(
    /// Identifies a consensus topic
    TopicId
);
entity_id_type!(
    /// Identifies a scheduled transaction
    ScheduleId
);

impl AccountId {
    /// An account identified by a public-key alias instead of a number
    pub fn from_key_alias(shard: u64, realm: u64, key_bytes: Vec<u8>) -> Self {
        Self(EntityId::from_alias(shard, realm, Alias::Key(key_bytes)))
    }

    /// An account identified by a 20-byte EVM-style address
    pub fn from_evm_address(shard: u64, realm: u64, address: [u8; 20]) -> Self {
        Self(EntityId::from_alias(
            shard,
            realm,
            Alias::EvmAddress(address),
        ))
    }
}

/// Identifies one serial of a non-fungible token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NftId {
    /// The token type
    pub token_id: TokenId,
    /// The serial number within the token type
    pub serial: i64,
}

impl NftId {
    /// Create an NFT id from its token type and serial
    pub fn new(token_id: TokenId, serial: i64) -> Self {
        Self { token_id, serial }
    }
}

impl fmt::Display for NftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token_id, self.serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip() {
        let id: AccountId = "0.0.1001".parse().unwrap();
        assert_eq!(id, AccountId::from_num(1001));
        assert_eq!(id.to_string(), "0.0.1001");
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!("0.0".parse::<AccountId>().is_err());
        assert!("a.b.c".parse::<AccountId>().is_err());
        assert!("0.0.7-XYZ12".parse::<AccountId>().is_err());
    }

    #[test]
    fn checksum_survives_parse_and_validates() {
        let ledger = LedgerId::mainnet();
        let id = AccountId::from_num(123).with_checksum(&ledger);
        let reparsed: AccountId = id.to_string().parse().unwrap();
        reparsed.validate_checksum(&ledger).unwrap();
        assert!(reparsed.validate_checksum(&LedgerId::testnet()).is_err());
    }

    #[test]
    fn checksum_ignored_by_equality_and_hash() {
        let plain = TokenId::from_num(55);
        let checksummed = TokenId::from_num(55).with_checksum(&LedgerId::mainnet());
        assert_eq!(plain, checksummed);
    }

    #[test]
    fn checksum_never_reaches_the_encoding() {
        let checksummed = TokenId::from_num(55).with_checksum(&LedgerId::mainnet());
        let encoded = serde_json::to_value(&checksummed).unwrap();
        assert!(encoded.get("checksum").is_none());
        assert_eq!(
            serde_json::to_value(&TokenId::from_num(55)).unwrap(),
            encoded
        );
    }

    #[test]
    fn order_is_numeric_then_alias() {
        let a = AccountId::new(0, 0, 5);
        let b = AccountId::new(0, 0, 6);
        let aliased = AccountId::from_key_alias(0, 0, vec![1, 2, 3]);
        assert!(a < b);
        // alias-form ids sort after the numeric id with the same triple
        assert!(AccountId::new(0, 0, 0) < aliased);
        assert!(aliased < a);
    }

    #[test]
    fn alias_and_number_are_mutually_exclusive() {
        let aliased = AccountId::from_evm_address(0, 0, [0xab; 20]);
        assert_eq!(aliased.0.num, 0);
        assert!(aliased.0.alias.is_some());
    }
}
