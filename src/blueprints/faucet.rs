//! Faucet blueprint.
//!
//! Holds a single token and lets anyone withdraw up to a per-caller limit.
//! The caller that initialized the faucet is its admin: it can change the
//! limit and withdraw without one.

use serde::{Deserialize, Serialize};

use crate::contracts::{
    decode, encode, Action, AllowedActions, Blueprint, Caller, Env, MethodSpec, MethodTable,
    NcError, NcResult,
};
use crate::types::{Amount, TokenUid};

const TOKEN: &str = "token";
const ADMIN: &str = "admin";
const MAX_WITHDRAWAL: &str = "max_withdrawal";
const TOTAL_SUPPLY: &str = "total_supply";
const WITHDRAWN_PREFIX: &str = "withdrawn:";

/// Arguments of `initialize`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetInit {
    /// Token the faucet hands out; the single deposit must be in it
    pub token: TokenUid,
    /// Lifetime withdrawal limit per caller
    pub max_withdrawal: Amount,
}

/// Rate-limited token faucet
pub struct Faucet;

impl Faucet {
    fn initialize(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let init: FaucetInit = decode(args)?;
        let (token, amount) = single_deposit(env)?;
        if token != init.token {
            return Err(NcError::fail("Invalid deposit"));
        }
        if init.max_withdrawal == 0 {
            return Err(NcError::fail("Max withdrawal must be positive"));
        }

        let admin = env.context()?.caller;
        env.put(TOKEN, &init.token)?;
        env.put(ADMIN, &admin)?;
        env.put(MAX_WITHDRAWAL, &init.max_withdrawal)?;
        env.put(TOTAL_SUPPLY, &amount)?;
        Ok(Vec::new())
    }

    fn deposit(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        let (token, amount) = single_deposit(env)?;
        if token != stored_token(env)? {
            return Err(NcError::fail("Invalid token"));
        }
        let supply: Amount = env.get_or(TOTAL_SUPPLY, 0)?;
        env.put(TOTAL_SUPPLY, &supply.saturating_add(amount))?;
        Ok(Vec::new())
    }

    fn set_max_withdrawal(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        check_admin(env)?;
        let new_max: Amount = decode(args)?;
        if new_max == 0 {
            return Err(NcError::fail("Max withdrawal must be positive"));
        }
        env.put(MAX_WITHDRAWAL, &new_max)?;
        Ok(Vec::new())
    }

    fn withdraw(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        let (token, amount) = single_withdrawal(env)?;
        if token != stored_token(env)? {
            return Err(NcError::fail("Invalid token"));
        }

        let caller = env.context()?.caller;
        let key = withdrawn_key(&caller)?;
        let already: Amount = env.get_or(&key, 0)?;
        let total = already.saturating_add(amount);
        let max: Amount = env.get_or(MAX_WITHDRAWAL, 0)?;
        if total > max {
            return Err(NcError::fail(format!(
                "Withdrawal exceeds maximum allowed ({max})"
            )));
        }

        take_from_supply(env, amount)?;
        env.put(&key, &total)?;
        Ok(Vec::new())
    }

    fn admin_withdraw(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        check_admin(env)?;
        let (token, amount) = single_withdrawal(env)?;
        if token != stored_token(env)? {
            return Err(NcError::fail("Invalid token"));
        }
        take_from_supply(env, amount)?;
        Ok(Vec::new())
    }

    fn get_user_withdrawal(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let user: Caller = decode(args)?;
        let withdrawn: Amount = env.get_or(&withdrawn_key(&user)?, 0)?;
        encode(&withdrawn)
    }

    fn get_total_supply(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        let supply: Amount = env.get_or(TOTAL_SUPPLY, 0)?;
        encode(&supply)
    }

    fn get_max_withdrawal(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        let max: Amount = env.get_or(MAX_WITHDRAWAL, 0)?;
        encode(&max)
    }

    fn get_token(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        encode(&stored_token(env)?)
    }
}

impl Blueprint for Faucet {
    fn name(&self) -> &'static str {
        "faucet"
    }

    fn methods(&self) -> MethodTable {
        MethodTable::new()
            .initialize(
                MethodSpec::public(Self::initialize)
                    .allow(AllowedActions::DEPOSIT)
                    .max_deposits(1),
            )
            .method(
                "deposit",
                MethodSpec::public(Self::deposit)
                    .allow(AllowedActions::DEPOSIT)
                    .max_deposits(1),
            )
            .method("set_max_withdrawal", MethodSpec::public(Self::set_max_withdrawal))
            .method(
                "withdraw",
                MethodSpec::public(Self::withdraw).allow(AllowedActions::WITHDRAWAL),
            )
            .method(
                "admin_withdraw",
                MethodSpec::public(Self::admin_withdraw).allow(AllowedActions::WITHDRAWAL),
            )
            .method("get_user_withdrawal", MethodSpec::view(Self::get_user_withdrawal))
            .method("get_total_supply", MethodSpec::view(Self::get_total_supply))
            .method("get_max_withdrawal", MethodSpec::view(Self::get_max_withdrawal))
            .method("get_token", MethodSpec::view(Self::get_token))
    }
}

fn withdrawn_key(caller: &Caller) -> NcResult<String> {
    Ok(format!("{WITHDRAWN_PREFIX}{}", hex::encode(encode(caller)?)))
}

fn stored_token(env: &mut Env<'_, '_>) -> NcResult<TokenUid> {
    env.get(TOKEN)?
        .ok_or_else(|| NcError::fail("Faucet not initialized"))
}

fn check_admin(env: &mut Env<'_, '_>) -> NcResult<()> {
    let admin: Option<Caller> = env.get(ADMIN)?;
    if admin != Some(env.context()?.caller) {
        return Err(NcError::fail("Only admin can perform this action"));
    }
    Ok(())
}

fn take_from_supply(env: &mut Env<'_, '_>, amount: Amount) -> NcResult<()> {
    let supply: Amount = env.get_or(TOTAL_SUPPLY, 0)?;
    if amount > supply {
        return Err(NcError::fail("Insufficient funds in faucet"));
    }
    env.put(TOTAL_SUPPLY, &(supply - amount))
}

fn single_deposit(env: &Env<'_, '_>) -> NcResult<(TokenUid, Amount)> {
    match env.context()?.actions.as_slice() {
        [Action::Deposit { token, amount }] => Ok((*token, *amount)),
        [_] => Err(NcError::fail("Action must be a deposit")),
        _ => Err(NcError::fail("Only one action allowed")),
    }
}

fn single_withdrawal(env: &Env<'_, '_>) -> NcResult<(TokenUid, Amount)> {
    match env.context()?.actions.as_slice() {
        [Action::Withdrawal { token, amount }] => Ok((*token, *amount)),
        [_] => Err(NcError::fail("Action must be a withdrawal")),
        _ => Err(NcError::fail("Only one action allowed")),
    }
}
