//! Actions - token and authority movements attached to a call.
//!
//! Actions move value between the caller and the callee before the callee's
//! method runs. The caller side is the transaction's declared inputs when
//! the caller is external, or the calling contract's own balances.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::blueprint::AllowedActions;
use super::frame::Caller;
use super::records::IndexRecord;
use super::state::TxState;
use super::{NcError, NcResult};
use crate::types::{Amount, Authorities, ContractId, TokenUid};

/// A movement attached to a call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Caller pays `amount` of `token` to the callee
    Deposit {
        /// Token moved
        token: TokenUid,
        /// Amount moved
        amount: Amount,
    },
    /// Callee pays `amount` of `token` to the caller
    Withdrawal {
        /// Token moved
        token: TokenUid,
        /// Amount moved
        amount: Amount,
    },
    /// Callee hands authorities over to the caller
    GrantAuthority {
        /// Token
        token: TokenUid,
        /// Flags moved
        authorities: Authorities,
    },
    /// Caller hands authorities over to the callee
    AcquireAuthority {
        /// Token
        token: TokenUid,
        /// Flags moved
        authorities: Authorities,
    },
}

/// Discriminant of an [`Action`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// [`Action::Deposit`]
    Deposit,
    /// [`Action::Withdrawal`]
    Withdrawal,
    /// [`Action::GrantAuthority`]
    GrantAuthority,
    /// [`Action::AcquireAuthority`]
    AcquireAuthority,
}

impl Action {
    /// Deposit shorthand
    #[must_use]
    pub const fn deposit(token: TokenUid, amount: Amount) -> Self {
        Self::Deposit { token, amount }
    }

    /// Withdrawal shorthand
    #[must_use]
    pub const fn withdrawal(token: TokenUid, amount: Amount) -> Self {
        Self::Withdrawal { token, amount }
    }

    /// Kind of this action
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Deposit { .. } => ActionKind::Deposit,
            Self::Withdrawal { .. } => ActionKind::Withdrawal,
            Self::GrantAuthority { .. } => ActionKind::GrantAuthority,
            Self::AcquireAuthority { .. } => ActionKind::AcquireAuthority,
        }
    }

    /// Token the action concerns
    #[must_use]
    pub const fn token(&self) -> TokenUid {
        match self {
            Self::Deposit { token, .. }
            | Self::Withdrawal { token, .. }
            | Self::GrantAuthority { token, .. }
            | Self::AcquireAuthority { token, .. } => *token,
        }
    }
}

/// Check an action set against a method's declaration
///
/// # Errors
/// Returns `InvalidActionSet` describing the first violation
pub fn validate_actions(
    actions: &[Action],
    allowed: AllowedActions,
    max_deposits: usize,
) -> NcResult<()> {
    let mut balance_tokens = BTreeSet::new();
    let mut authority_tokens = BTreeSet::new();
    let mut deposits = 0usize;

    for action in actions {
        let kind = action.kind();
        if !allowed.allows(kind) {
            return Err(NcError::InvalidActionSet(format!(
                "{kind:?} not accepted by this method"
            )));
        }

        match *action {
            Action::Deposit { token, amount } | Action::Withdrawal { token, amount } => {
                if amount == 0 {
                    return Err(NcError::InvalidActionSet(format!(
                        "zero-amount {kind:?} of {token}"
                    )));
                }
                if !balance_tokens.insert(token) {
                    return Err(NcError::InvalidActionSet(format!(
                        "more than one balance action for {token}"
                    )));
                }
                if kind == ActionKind::Deposit {
                    deposits += 1;
                }
            }
            Action::GrantAuthority { token, authorities }
            | Action::AcquireAuthority { token, authorities } => {
                if authorities.is_empty() {
                    return Err(NcError::InvalidActionSet(format!(
                        "{kind:?} of {token} moves no authority"
                    )));
                }
                if token.is_native() {
                    return Err(NcError::InvalidActionSet(
                        "native token has no authorities".to_string(),
                    ));
                }
                if !authority_tokens.insert(token) {
                    return Err(NcError::InvalidActionSet(format!(
                        "more than one authority action for {token}"
                    )));
                }
            }
        }
    }

    if deposits > max_deposits {
        return Err(NcError::InvalidActionSet(format!(
            "{deposits} deposits, method accepts at most {max_deposits}"
        )));
    }
    Ok(())
}

/// Apply validated actions between `caller` and `callee`
///
/// # Errors
/// Returns `InsufficientFunds`, `InsufficientBalance` or `AuthorityNotHeld`
pub fn apply_actions(
    state: &mut TxState<'_>,
    caller: &Caller,
    callee: ContractId,
    actions: &[Action],
) -> NcResult<()> {
    for action in actions {
        match *action {
            Action::Deposit { token, amount } => {
                debit_caller(state, caller, token, amount)?;
                state.credit(callee, token, amount)?;
            }
            Action::Withdrawal { token, amount } => {
                state.debit(callee, token, amount)?;
                credit_caller(state, caller, token, amount)?;
            }
            Action::GrantAuthority { token, authorities } => {
                let held = state.balance(&callee, &token)?.authorities;
                if !held.contains(authorities) {
                    return Err(NcError::AuthorityNotHeld {
                        token,
                        requested: authorities,
                    });
                }
                state.set_authorities(callee, token, held.without(authorities))?;
                state.push_record(revoke_record(callee, token, authorities));
                let caller_held = caller_authorities(state, caller, token)?;
                set_caller_authorities(state, caller, token, caller_held.union(authorities))?;
            }
            Action::AcquireAuthority { token, authorities } => {
                let caller_held = caller_authorities(state, caller, token)?;
                if !caller_held.contains(authorities) {
                    return Err(NcError::AuthorityNotHeld {
                        token,
                        requested: authorities,
                    });
                }
                set_caller_authorities(state, caller, token, caller_held.without(authorities))?;
                let held = state.balance(&callee, &token)?.authorities;
                state.set_authorities(callee, token, held.union(authorities))?;
                state.push_record(grant_record(callee, token, authorities));
            }
        }
    }
    Ok(())
}

fn debit_caller(
    state: &mut TxState<'_>,
    caller: &Caller,
    token: TokenUid,
    amount: Amount,
) -> NcResult<()> {
    match caller {
        Caller::Address(_) => state.pool_debit(token, amount),
        Caller::Contract(id) => {
            let have = state.balance(id, &token)?.value;
            if have < amount {
                return Err(NcError::InsufficientFunds {
                    token,
                    need: amount,
                    have,
                });
            }
            state.debit(*id, token, amount)
        }
    }
}

fn credit_caller(
    state: &mut TxState<'_>,
    caller: &Caller,
    token: TokenUid,
    amount: Amount,
) -> NcResult<()> {
    match caller {
        Caller::Address(_) => state.pool_credit(token, amount),
        Caller::Contract(id) => state.credit(*id, token, amount),
    }
}

fn caller_authorities(state: &TxState<'_>, caller: &Caller, token: TokenUid) -> NcResult<Authorities> {
    match caller {
        Caller::Address(_) => Ok(state.pool_authorities(&token)),
        Caller::Contract(id) => Ok(state.balance(id, &token)?.authorities),
    }
}

fn set_caller_authorities(
    state: &mut TxState<'_>,
    caller: &Caller,
    token: TokenUid,
    authorities: Authorities,
) -> NcResult<()> {
    match caller {
        Caller::Address(_) => {
            state.set_pool_authorities(token, authorities);
            Ok(())
        }
        Caller::Contract(id) => {
            let previous = state.balance(id, &token)?.authorities;
            state.set_authorities(*id, token, authorities)?;
            let gained = authorities.without(previous);
            let lost = previous.without(authorities);
            if !gained.is_empty() {
                state.push_record(grant_record(*id, token, gained));
            }
            if !lost.is_empty() {
                state.push_record(revoke_record(*id, token, lost));
            }
            Ok(())
        }
    }
}

pub(crate) fn grant_record(contract_id: ContractId, token_uid: TokenUid, moved: Authorities) -> IndexRecord {
    IndexRecord::GrantAuthorities {
        contract_id,
        token_uid,
        mint: moved.mint,
        melt: moved.melt,
    }
}

pub(crate) fn revoke_record(contract_id: ContractId, token_uid: TokenUid, moved: Authorities) -> IndexRecord {
    IndexRecord::RevokeAuthorities {
        contract_id,
        token_uid,
        mint: moved.mint,
        melt: moved.melt,
    }
}
