//! Token metadata, authority flags and per-contract balance entries.

use serde::{Deserialize, Serialize};

use super::{Amount, ContractId};

/// Mint/melt authority flags held by a contract for one token
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Authorities {
    /// May increase total supply
    pub mint: bool,
    /// May decrease total supply
    pub melt: bool,
}

impl Authorities {
    /// No authority
    pub const NONE: Self = Self {
        mint: false,
        melt: false,
    };

    /// Both authorities
    pub const ALL: Self = Self {
        mint: true,
        melt: true,
    };

    /// Build from flags
    #[must_use]
    pub const fn new(mint: bool, melt: bool) -> Self {
        Self { mint, melt }
    }

    /// True when neither flag is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.mint && !self.melt
    }

    /// True when every flag set in `other` is also set here
    #[must_use]
    pub const fn contains(&self, other: Self) -> bool {
        (self.mint || !other.mint) && (self.melt || !other.melt)
    }

    /// Flags set in either
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            mint: self.mint || other.mint,
            melt: self.melt || other.melt,
        }
    }

    /// Flags set here but not in `other`
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self {
            mint: self.mint && !other.mint,
            melt: self.melt && !other.melt,
        }
    }
}

/// Balance and authorities of one contract for one token
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    /// Amount held
    pub value: Amount,
    /// Authorities held
    pub authorities: Authorities,
}

impl BalanceEntry {
    /// True when the entry carries nothing worth persisting
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.value == 0 && self.authorities.is_empty()
    }
}

/// Registered custom token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescription {
    /// Human-readable name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Contract that created the token
    pub issuer: ContractId,
}
