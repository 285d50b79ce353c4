//! Transaction identifiers
//!
//! A transaction id is the payer account plus the start of the validity
//! window. The network deduplicates submissions carrying the same id, which
//! is what makes retrying an identical signed envelope safe.

use super::AccountId;
use crate::errors::MeridianError;
use crate::timestamp::Timestamp;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Identifies a transaction for deduplication and receipt lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId {
    /// The paying account
    pub account_id: AccountId,
    /// Start of the validity window
    pub valid_start: Timestamp,
    /// Distinguishes child transactions spawned by one submission
    pub nonce: Option<i32>,
    /// Whether this id refers to the scheduled execution of a transaction
    pub scheduled: bool,
}

impl TransactionId {
    /// Generate an id for `account_id` starting slightly in the past.
    ///
    /// The valid-start timestamp is pulled back by a few random seconds so
    /// that modest clock skew between client and network cannot produce a
    /// start time the network considers to be in the future.
    pub fn generate(account_id: AccountId) -> Self {
        let skew = Duration::from_millis(rand::thread_rng().gen_range(5_000..8_000));
        Self::with_valid_start(account_id, Timestamp::now().minus(skew))
    }

    /// Create an id with an explicit validity-window start
    pub fn with_valid_start(account_id: AccountId, valid_start: Timestamp) -> Self {
        Self {
            account_id,
            valid_start,
            nonce: None,
            scheduled: false,
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.account_id, self.valid_start)?;
        if self.scheduled {
            write!(f, "?scheduled")?;
        }
        if let Some(nonce) = self.nonce {
            write!(f, "/{nonce}")?;
        }
        Ok(())
    }
}

impl FromStr for TransactionId {
    type Err = MeridianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (account, rest) = s
            .split_once('@')
            .ok_or_else(|| MeridianError::invalid(format!("transaction id `{s}` missing `@`")))?;

        let (rest, nonce) = match rest.split_once('/') {
            Some((head, nonce)) => {
                let nonce = nonce.parse::<i32>().map_err(|_| {
                    MeridianError::invalid(format!("invalid nonce in transaction id `{s}`"))
                })?;
                (head, Some(nonce))
            }
            None => (rest, None),
        };

        let (start, scheduled) = match rest.strip_suffix("?scheduled") {
            Some(head) => (head, true),
            None => (rest, false),
        };

        let (seconds, nanos) = start.split_once('.').ok_or_else(|| {
            MeridianError::invalid(format!("invalid valid-start in transaction id `{s}`"))
        })?;
        let seconds = seconds
            .parse::<u64>()
            .map_err(|_| MeridianError::invalid(format!("invalid seconds in `{s}`")))?;
        let nanos = nanos
            .parse::<u32>()
            .map_err(|_| MeridianError::invalid(format!("invalid nanos in `{s}`")))?;

        Ok(Self {
            account_id: account.parse()?,
            valid_start: Timestamp::new(seconds, nanos),
            nonce,
            scheduled,
        })
    }
}
