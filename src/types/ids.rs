//! Strongly-typed 32-byte identities.
//!
//! Contracts, blueprints, tokens and transactions all share the same
//! underlying representation but must never be confused with each other.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{CryptoResult, Hash, HASH_SIZE};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Hash);

        impl $name {
            /// Wrap raw bytes
            #[must_use]
            pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
                Self(Hash::from_bytes(bytes))
            }

            /// Wrap a digest
            #[must_use]
            pub const fn from_hash(hash: Hash) -> Self {
                Self(hash)
            }

            /// Underlying digest
            #[must_use]
            pub const fn as_hash(&self) -> &Hash {
                &self.0
            }

            /// Raw bytes
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; HASH_SIZE] {
                self.0.as_bytes()
            }

            /// Lowercase hex
            #[must_use]
            pub fn to_hex(&self) -> String {
                self.0.to_hex()
            }

            /// Parse from hex
            ///
            /// # Errors
            /// Returns error if hex is invalid or not 32 bytes long
            pub fn from_hex(s: &str) -> CryptoResult<Self> {
                Hash::from_hex(s).map(Self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.to_hex())
            }
        }

        impl From<Hash> for $name {
            fn from(hash: Hash) -> Self {
                Self(hash)
            }
        }
    };
}

define_id!(
    /// Identity of a deployed contract
    ContractId
);

define_id!(
    /// Identity of a blueprint (the code a contract runs)
    BlueprintId
);

define_id!(
    /// Identity of a token
    TokenUid
);

define_id!(
    /// Identity of a ledger transaction
    TxId
);

impl TokenUid {
    /// The network's native token
    pub const NATIVE: Self = Self(Hash::ZERO);

    /// Check for the native token
    #[must_use]
    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }
}

impl From<TxId> for ContractId {
    /// A contract created by a top-level transaction is named after it.
    fn from(tx: TxId) -> Self {
        Self(tx.0)
    }
}
