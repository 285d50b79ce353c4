//! Fixed-point currency amounts
//!
//! Fees and transfer amounts are carried on the wire in tinybars
//! (1 hbar = 100_000_000 tinybars). The type is a thin wrapper over the
//! signed tinybar count so arithmetic stays exact.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tinybars per whole hbar
pub const TINYBARS_PER_HBAR: i64 = 100_000_000;

/// A signed currency amount in tinybars
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Hbar(i64);

impl Hbar {
    /// Zero amount
    pub const ZERO: Hbar = Hbar(0);

    /// Create an amount from whole hbars
    pub fn from_hbars(hbars: i64) -> Self {
        Self(hbars * TINYBARS_PER_HBAR)
    }

    /// Create an amount from tinybars
    pub fn from_tinybars(tinybars: i64) -> Self {
        Self(tinybars)
    }

    /// The amount in tinybars
    pub fn to_tinybars(&self) -> i64 {
        self.0
    }

    /// Whether the amount is negative
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Hbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.abs() < 10_000 {
            write!(f, "{} tℏ", self.0)
        } else {
            write!(f, "{} ℏ", self.0 as f64 / TINYBARS_PER_HBAR as f64)
        }
    }
}
