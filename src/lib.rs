//! # Blueprint Runtime
//!
//! Atomic execution runtime for nanocontracts on a DAG ledger.
//!
//! ## Architecture
//!
//! A ledger transaction enters the runtime through [`NanoProcessor`]:
//! - **Blueprints** declare method tables; contracts are their instances
//! - **Runner** dispatches the root call and every nested call, metering fuel
//! - **Actions** move tokens and authorities between caller and callee
//! - **Factory** derives and registers child contracts and custom tokens
//!
//! ## Guarantees
//!
//! - Contract and token identities are derived deterministically (SHA-256d)
//! - A transaction either commits one write batch or leaves storage untouched
//! - Authorities are moved, never duplicated
//! - Custom tokens are backed by a native deposit

#![forbid(unsafe_code)]
#![deny(clippy::all, rust_2018_idioms)]
#![warn(clippy::pedantic, clippy::nursery, missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::too_many_arguments,
    // Length prefixes are bounded by protocol limits
    clippy::cast_possible_truncation,
    clippy::cast_lossless,
    // Const fn not always beneficial for complex types
    clippy::missing_const_for_fn,
    // must_use on every fn is excessive
    clippy::must_use_candidate,
    // Pass by value is fine for small Copy types
    clippy::needless_pass_by_value,
    // Field naming matches domain terminology
    clippy::struct_field_names,
    // Match arms with same body are sometimes clearer separate
    clippy::match_same_arms
)]

pub mod blueprints;
pub mod config;
pub mod contracts;
pub mod crypto;
pub mod types;

pub use config::{ConfigError, RuntimeSettings};
pub use contracts::{
    Action, Blueprint, BlueprintRegistry, Caller, Env, ExecutionFailure, ExecutionReceipt,
    MemoryStorage, MethodKind, NanoProcessor, NanoTransaction, NcError, NcResult, NcStorage,
    TxInputs,
};
pub use crypto::Hash;
pub use types::{Address, Amount, Authorities, BlueprintId, ContractId, TokenUid, TxId};

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
