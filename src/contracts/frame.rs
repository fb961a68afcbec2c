//! Call frames and the call stack.

use serde::{Deserialize, Serialize};

use super::action::Action;
use super::blueprint::MethodKind;
use super::{NcError, NcResult};
use crate::types::{Address, Amount, Authorities, BlueprintId, ContractId, Timestamp, TokenUid, TxId};

/// Who invoked a frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Caller {
    /// External account that sent the transaction
    Address(Address),
    /// Another contract
    Contract(ContractId),
}

impl Caller {
    /// Calling contract, if any
    #[must_use]
    pub const fn contract(&self) -> Option<ContractId> {
        match self {
            Self::Address(_) => None,
            Self::Contract(id) => Some(*id),
        }
    }
}

/// One activation on the call stack
#[derive(Clone, Debug)]
pub struct CallFrame {
    /// Invoker
    pub caller: Caller,
    /// Contract executing
    pub contract_id: ContractId,
    /// Its blueprint
    pub blueprint_id: BlueprintId,
    /// Method name as requested
    pub method: String,
    /// Public or view
    pub kind: MethodKind,
    /// Actions applied on entry
    pub actions: Vec<Action>,
    /// Callee authorities over each token named by an authority action,
    /// as they were before the actions applied
    pub entry_authorities: Vec<(TokenUid, Authorities)>,
}

impl CallFrame {
    /// Authorities held over `token` before this frame's actions, if an
    /// authority action named it
    #[must_use]
    pub fn authorities_on_entry(&self, token: &TokenUid) -> Option<Authorities> {
        self.entry_authorities
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, held)| *held)
    }
}

/// What a running method knows about its invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Invoker
    pub caller: Caller,
    /// Contract executing
    pub contract_id: ContractId,
    /// Its blueprint
    pub blueprint_id: BlueprintId,
    /// Actions applied on entry
    pub actions: Vec<Action>,
    /// Enclosing transaction
    pub tx_id: TxId,
    /// Ledger timestamp of the transaction
    pub timestamp: Timestamp,
}

impl CallContext {
    /// Total deposited amount of `token` in this call
    #[must_use]
    pub fn deposited(&self, token: &TokenUid) -> Amount {
        self.actions
            .iter()
            .filter_map(|action| match action {
                Action::Deposit { token: t, amount } if t == token => Some(*amount),
                _ => None,
            })
            .sum()
    }

    /// Total withdrawn amount of `token` in this call
    #[must_use]
    pub fn withdrawn(&self, token: &TokenUid) -> Amount {
        self.actions
            .iter()
            .filter_map(|action| match action {
                Action::Withdrawal { token: t, amount } if t == token => Some(*amount),
                _ => None,
            })
            .sum()
    }
}

/// Bounded stack of active frames plus the transaction's call counter
#[derive(Debug)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    calls: usize,
    max_depth: usize,
    max_calls: usize,
}

impl CallStack {
    /// Empty stack with the given bounds
    #[must_use]
    pub fn new(max_depth: usize, max_calls: usize) -> Self {
        Self {
            frames: Vec::new(),
            calls: 0,
            max_depth,
            max_calls,
        }
    }

    /// Check that one more frame fits
    ///
    /// # Errors
    /// Returns `CallDepthExceeded` or `CallCountExceeded`
    pub fn ensure_capacity(&self) -> NcResult<()> {
        if self.frames.len() >= self.max_depth {
            return Err(NcError::CallDepthExceeded {
                max: self.max_depth,
            });
        }
        if self.calls >= self.max_calls {
            return Err(NcError::CallCountExceeded {
                max: self.max_calls,
            });
        }
        Ok(())
    }

    /// Push a frame and count the call
    ///
    /// # Errors
    /// Returns an error when a bound is hit
    pub fn push(&mut self, frame: CallFrame) -> NcResult<()> {
        self.ensure_capacity()?;
        self.calls += 1;
        self.frames.push(frame);
        Ok(())
    }

    /// Pop the innermost frame
    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// Innermost frame
    #[must_use]
    pub fn current(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// True when `contract` has an active frame
    #[must_use]
    pub fn contains(&self, contract: &ContractId) -> bool {
        self.frames.iter().any(|f| &f.contract_id == contract)
    }

    /// Number of active frames
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Calls made so far in the transaction
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls
    }
}
