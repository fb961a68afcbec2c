//! Core ledger types shared by the runtime.

mod address;
mod ids;
mod token;

pub use address::{Address, AddressError};
pub use ids::{BlueprintId, ContractId, TokenUid, TxId};
pub use token::{Authorities, BalanceEntry, TokenDescription};

/// Token amount in the smallest unit
pub type Amount = u64;

/// Unix timestamp in milliseconds
pub type Timestamp = i64;

