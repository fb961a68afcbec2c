//! Nanocontract execution runtime.
//!
//! Contracts are instances of blueprints. A ledger transaction calls one
//! contract method (or creates a contract); that method may call other
//! contracts, create contracts and create or mint tokens. The whole call
//! graph runs synchronously against one overlay of the storage and either
//! commits as a single batch or leaves no trace.
//!
//! ## Architecture
//!
//! 1. **Blueprints** implement [`Blueprint`] and expose a [`MethodTable`]
//! 2. **Processor** ([`NanoProcessor`]) is the entry point for the ledger
//! 3. **Runner** owns the call stack, fuel meter and undo log of one transaction
//! 4. **Env** is the syscall surface a running method sees
//! 5. **Storage** ([`NcStorage`]) is the persistence collaborator
//!
//! ## Atomicity
//!
//! Every mutation goes through the transaction overlay and is recorded in
//! its undo log. Any failure at any depth propagates unchanged to the root,
//! which replays the log in reverse. Nothing reaches storage until the root
//! call returns successfully.

pub mod action;
pub mod blueprint;
pub mod derive;
pub mod factory;
pub mod frame;
pub mod fuel;
pub mod processor;
pub mod records;
pub mod runner;
pub mod state;
pub mod storage;
pub mod syscall;
pub mod transaction;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{Amount, Authorities, BlueprintId, ContractId, TokenUid};

pub use action::{Action, ActionKind};
pub use blueprint::{
    AllowedActions, Blueprint, BlueprintRegistry, FallbackHandler, FallbackSpec, MethodHandler,
    MethodKind, MethodSpec, MethodTable, RegistryError, INITIALIZE_METHOD,
};
pub use factory::{MAX_TOKEN_NAME_LEN, MAX_TOKEN_SYMBOL_LEN};
pub use frame::{CallContext, CallFrame, Caller};
pub use fuel::{FuelCosts, FuelMeter, OutOfFuel};
pub use processor::{ExecutionFailure, ExecutionReceipt, NanoProcessor};
pub use records::IndexRecord;
pub use runner::Runner;
pub use state::Committed;
pub use storage::{ContractRecord, MemoryStorage, NcStorage, StorageError, WriteBatch};
pub use syscall::Env;
pub use transaction::{NanoTransaction, TransactionKind, TxInputs};

/// Result type for runtime operations
pub type NcResult<T> = Result<T, NcError>;

/// Event emitted by a contract during a committed transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    /// Contract that emitted the event
    pub contract_id: ContractId,
    /// Event topic (for indexing/filtering)
    pub topic: String,
    /// Event data
    pub data: Vec<u8>,
}

/// Runtime failures.
///
/// Every variant aborts the whole transaction.
#[derive(Clone, Debug, thiserror::Error)]
pub enum NcError {
    /// Call targets the contract that is currently executing
    #[error("contract {0} cannot call itself")]
    NoSelfCall(ContractId),

    /// A view frame tried to dispatch a public method
    #[error("view method cannot call public method `{method}`")]
    ViewCannotCallPublic {
        /// Requested method
        method: String,
    },

    /// Explicit call to `initialize`
    #[error("contract {0} is already initialized")]
    CannotReinitialize(ContractId),

    /// Method exists but has the other kind
    #[error("method `{method}` is {actual:?}, called as {requested:?}")]
    KindMismatch {
        /// Method name
        method: String,
        /// Kind the caller asked for
        requested: MethodKind,
        /// Kind the blueprint declares
        actual: MethodKind,
    },

    /// Call stack exceeded the configured depth
    #[error("call depth exceeded (max {max})")]
    CallDepthExceeded {
        /// Configured maximum
        max: usize,
    },

    /// Too many calls in one transaction
    #[error("call count exceeded (max {max})")]
    CallCountExceeded {
        /// Configured maximum
        max: usize,
    },

    /// Public call into a contract already on the call stack
    #[error("re-entrant call into contract {0}")]
    ReentrancyDisallowed(ContractId),

    /// Derived contract id or token uid is already taken
    #[error("identity already exists: {0}")]
    DuplicateIdentity(String),

    /// Token symbol is reserved for the native token
    #[error("token symbol `{0}` is reserved")]
    ReservedSymbol(String),

    /// Token name, symbol or amount rejected
    #[error("invalid token description: {0}")]
    InvalidTokenDescription(String),

    /// Caller cannot cover a deposit
    #[error("insufficient funds for {token}: need {need}, have {have}")]
    InsufficientFunds {
        /// Token
        token: TokenUid,
        /// Amount needed
        need: Amount,
        /// Amount available
        have: Amount,
    },

    /// Contract cannot cover a withdrawal, melt or token deposit
    #[error("insufficient balance of {token} in {contract}: need {need}, have {have}")]
    InsufficientBalance {
        /// Contract debited
        contract: ContractId,
        /// Token
        token: TokenUid,
        /// Amount needed
        need: Amount,
        /// Amount available
        have: Amount,
    },

    /// Grantor does not hold the requested authority
    #[error("authority {requested:?} over {token} not held")]
    AuthorityNotHeld {
        /// Token
        token: TokenUid,
        /// Flags requested
        requested: Authorities,
    },

    /// Action list violates arity, permission or conservation rules
    #[error("invalid action set: {0}")]
    InvalidActionSet(String),

    /// Fuel exhausted
    #[error(transparent)]
    OutOfFuel(#[from] OutOfFuel),

    /// Mutation attempted from a view context
    #[error("mutation not allowed in view context: {0}")]
    MutationInViewContext(&'static str),

    /// Blueprint has no such method and no fallback
    #[error("method `{0}` not found")]
    MethodNotFound(String),

    /// No contract with this id
    #[error("contract not found: {0}")]
    ContractNotFound(ContractId),

    /// Contract exists but its `initialize` has not completed
    #[error("contract {0} is not initialized")]
    ContractNotInitialized(ContractId),

    /// No blueprint with this id
    #[error("blueprint not found: {0}")]
    BlueprintNotFound(BlueprintId),

    /// Arguments or return values failed to (de)serialize
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// Explicit failure raised by blueprint code
    #[error("{0}")]
    Fail(String),

    /// Storage collaborator failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl NcError {
    /// Blueprint-level failure with a message
    pub fn fail(msg: impl Into<String>) -> Self {
        Self::Fail(msg.into())
    }
}

/// Encode method arguments, return values and state values
pub fn encode<T: Serialize + ?Sized>(value: &T) -> NcResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| NcError::InvalidArgs(e.to_string()))
}

/// Decode method arguments, return values and state values
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> NcResult<T> {
    bincode::deserialize(bytes).map_err(|e| NcError::InvalidArgs(e.to_string()))
}
