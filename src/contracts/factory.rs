//! Contract and token factory.
//!
//! Creation is always relative to the executing contract: child contract
//! ids and token uids are derived from it, so the same contract can never
//! produce the same identity twice.

use tracing::debug;

use super::action::{grant_record, revoke_record, Action};
use super::blueprint::{MethodKind, INITIALIZE_METHOD};
use super::derive::{derive_contract_id, derive_token_id};
use super::frame::{CallFrame, Caller};
use super::records::IndexRecord;
use super::runner::{Runner, Target};
use super::storage::ContractRecord;
use super::{NcError, NcResult};
use crate::types::{Amount, Authorities, BlueprintId, ContractId, TokenDescription, TokenUid};

/// Longest accepted token name, in bytes
pub const MAX_TOKEN_NAME_LEN: usize = 30;

/// Longest accepted token symbol, in bytes
pub const MAX_TOKEN_SYMBOL_LEN: usize = 5;

/// Create a contract from `blueprint_id` as a child of the executing contract
///
/// # Errors
/// Returns `DuplicateIdentity` when the salt was already used with this
/// blueprint, `BlueprintNotFound`, or the failure of `initialize`
pub fn create_child_contract(
    runner: &mut Runner<'_>,
    blueprint_id: BlueprintId,
    salt: &[u8],
    args: &[u8],
    actions: Vec<Action>,
) -> NcResult<(ContractId, Vec<u8>)> {
    let costs = &runner.settings.fuel;
    runner.fuel.charge(costs.derive)?;

    let parent = runner.frame()?.contract_id;
    let contract_id = derive_contract_id(&parent, salt, &blueprint_id);
    let output = instantiate(
        runner,
        Caller::Contract(parent),
        contract_id,
        blueprint_id,
        args,
        actions,
    )?;
    Ok((contract_id, output))
}

/// Register `contract_id` and run its `initialize`
///
/// # Errors
/// Returns `DuplicateIdentity`, `BlueprintNotFound` or the failure of `initialize`
pub(crate) fn instantiate(
    runner: &mut Runner<'_>,
    caller: Caller,
    contract_id: ContractId,
    blueprint_id: BlueprintId,
    args: &[u8],
    actions: Vec<Action>,
) -> NcResult<Vec<u8>> {
    let result = register_and_initialize(runner, caller, contract_id, blueprint_id, args, actions);
    runner.latch(result)
}

fn register_and_initialize(
    runner: &mut Runner<'_>,
    caller: Caller,
    contract_id: ContractId,
    blueprint_id: BlueprintId,
    args: &[u8],
    actions: Vec<Action>,
) -> NcResult<Vec<u8>> {
    runner.stack.ensure_capacity()?;
    runner.fuel.charge(runner.settings.fuel.create_contract)?;

    if runner.state.contract(&contract_id)?.is_some() {
        return Err(NcError::DuplicateIdentity(format!("contract {contract_id}")));
    }
    let registry = runner.registry;
    let spec = registry
        .methods(&blueprint_id)
        .ok_or(NcError::BlueprintNotFound(blueprint_id))?
        .get(INITIALIZE_METHOD)
        .copied()
        .ok_or_else(|| NcError::MethodNotFound(INITIALIZE_METHOD.to_string()))?;

    runner
        .state
        .register_contract(contract_id, ContractRecord { blueprint_id })?;
    runner.state.push_record(IndexRecord::CreateContract {
        blueprint_id,
        contract_id,
    });
    debug!(
        contract_id = %contract_id,
        blueprint_id = %blueprint_id,
        "Creating contract"
    );

    let frame = CallFrame {
        caller,
        contract_id,
        blueprint_id,
        method: INITIALIZE_METHOD.to_string(),
        kind: MethodKind::Public,
        actions,
        entry_authorities: Vec::new(),
    };
    let output = runner.run_frame(frame, Target::Method(spec), args)?;
    runner.state.mark_initialized(contract_id);
    Ok(output)
}

/// Check name, symbol and amount of a new token
///
/// # Errors
/// Returns `InvalidTokenDescription` or `ReservedSymbol`
pub fn validate_token(name: &str, symbol: &str, amount: Amount, native_symbol: &str) -> NcResult<()> {
    if name.is_empty() || name.len() > MAX_TOKEN_NAME_LEN {
        return Err(NcError::InvalidTokenDescription(format!(
            "name must be 1 to {MAX_TOKEN_NAME_LEN} bytes"
        )));
    }
    if symbol.is_empty() || symbol.len() > MAX_TOKEN_SYMBOL_LEN {
        return Err(NcError::InvalidTokenDescription(format!(
            "symbol must be 1 to {MAX_TOKEN_SYMBOL_LEN} bytes"
        )));
    }
    if amount == 0 {
        return Err(NcError::InvalidTokenDescription(
            "initial amount must be positive".to_string(),
        ));
    }
    if symbol.eq_ignore_ascii_case(native_symbol) {
        return Err(NcError::ReservedSymbol(symbol.to_string()));
    }
    Ok(())
}

/// Create a custom token issued by the executing contract
///
/// # Errors
/// Returns a validation failure, `DuplicateIdentity`, or
/// `InsufficientBalance` when the native deposit cannot be paid
pub fn create_token(
    runner: &mut Runner<'_>,
    name: &str,
    symbol: &str,
    amount: Amount,
    authorities: Authorities,
) -> NcResult<TokenUid> {
    let costs = &runner.settings.fuel;
    runner.fuel.charge(costs.create_token.saturating_add(costs.derive))?;
    validate_token(name, symbol, amount, &runner.settings.native_symbol)?;

    let issuer = runner.frame()?.contract_id;
    let token_uid = derive_token_id(&issuer, symbol);
    runner.state.register_token(
        token_uid,
        TokenDescription {
            name: name.to_string(),
            symbol: symbol.to_string(),
            issuer,
        },
    )?;

    runner.state.push_record(IndexRecord::CreateToken {
        token_uid,
        amount,
        token_symbol: symbol.to_string(),
        token_name: name.to_string(),
    });
    pay_deposit(runner, issuer, amount)?;
    runner.state.credit(issuer, token_uid, amount)?;
    if !authorities.is_empty() {
        runner.state.set_authorities(issuer, token_uid, authorities)?;
        runner
            .state
            .push_record(grant_record(issuer, token_uid, authorities));
    }

    debug!(
        token_uid = %token_uid,
        issuer = %issuer,
        symbol,
        amount,
        "Created token"
    );
    Ok(token_uid)
}

/// Mint `amount` of `token` into the executing contract
///
/// # Errors
/// Returns `AuthorityNotHeld` without mint authority, or
/// `InsufficientBalance` when the native deposit cannot be paid
pub fn mint_tokens(runner: &mut Runner<'_>, token: TokenUid, amount: Amount) -> NcResult<()> {
    runner.fuel.charge(runner.settings.fuel.mint_melt)?;
    let contract = runner.frame()?.contract_id;
    require_authority(runner, contract, token, Authorities::new(true, false))?;
    require_positive(amount)?;

    pay_deposit(runner, contract, amount)?;
    runner.state.credit(contract, token, amount)?;
    runner.state.push_record(IndexRecord::UpdateTokenBalance {
        token_uid: token,
        amount: i128::from(amount),
    });
    Ok(())
}

/// Melt `amount` of `token` from the executing contract
///
/// # Errors
/// Returns `AuthorityNotHeld` without melt authority, or
/// `InsufficientBalance` when the contract holds less than `amount`
pub fn melt_tokens(runner: &mut Runner<'_>, token: TokenUid, amount: Amount) -> NcResult<()> {
    runner.fuel.charge(runner.settings.fuel.mint_melt)?;
    let contract = runner.frame()?.contract_id;
    require_authority(runner, contract, token, Authorities::new(false, true))?;
    require_positive(amount)?;

    runner.state.debit(contract, token, amount)?;
    runner.state.push_record(IndexRecord::UpdateTokenBalance {
        token_uid: token,
        amount: -i128::from(amount),
    });

    let refund = runner.settings.token_withdraw(amount);
    if refund > 0 {
        runner.state.credit(contract, TokenUid::NATIVE, refund)?;
        runner.state.push_record(IndexRecord::UpdateTokenBalance {
            token_uid: TokenUid::NATIVE,
            amount: i128::from(refund),
        });
    }
    Ok(())
}

/// Drop authorities the executing contract holds over `token`
///
/// # Errors
/// Returns `InvalidActionSet` for the native token
pub fn revoke_authorities(
    runner: &mut Runner<'_>,
    token: TokenUid,
    authorities: Authorities,
) -> NcResult<()> {
    runner.fuel.charge(runner.settings.fuel.action)?;
    if token.is_native() {
        return Err(NcError::InvalidActionSet(
            "native token has no authorities".to_string(),
        ));
    }
    let contract = runner.frame()?.contract_id;
    let held = runner.state.balance(&contract, &token)?.authorities;
    let dropped = Authorities::new(held.mint && authorities.mint, held.melt && authorities.melt);
    if dropped.is_empty() {
        return Ok(());
    }
    runner
        .state
        .set_authorities(contract, token, held.without(dropped))?;
    runner
        .state
        .push_record(revoke_record(contract, token, dropped));
    Ok(())
}

fn require_authority(
    runner: &Runner<'_>,
    contract: ContractId,
    token: TokenUid,
    requested: Authorities,
) -> NcResult<()> {
    let held = runner.state.balance(&contract, &token)?.authorities;
    if token.is_native() || !held.contains(requested) {
        return Err(NcError::AuthorityNotHeld { token, requested });
    }
    Ok(())
}

fn require_positive(amount: Amount) -> NcResult<()> {
    if amount == 0 {
        return Err(NcError::InvalidActionSet("zero amount".to_string()));
    }
    Ok(())
}

/// Take the native deposit backing `amount` new custom tokens
fn pay_deposit(runner: &mut Runner<'_>, contract: ContractId, amount: Amount) -> NcResult<()> {
    let deposit = runner.settings.token_deposit(amount);
    if deposit == 0 {
        return Ok(());
    }
    runner.state.debit(contract, TokenUid::NATIVE, deposit)?;
    runner.state.push_record(IndexRecord::UpdateTokenBalance {
        token_uid: TokenUid::NATIVE,
        amount: -i128::from(deposit),
    });
    Ok(())
}
