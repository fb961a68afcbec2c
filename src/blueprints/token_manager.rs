//! Token manager blueprint.
//!
//! A factory contract built only from syscalls: it issues one token on
//! `initialize`, mints and melts it for its owner, and can spawn a faucet
//! contract that hands the token out.

use serde::{Deserialize, Serialize};

use super::faucet::FaucetInit;
use crate::contracts::{
    decode, encode, Action, AllowedActions, Blueprint, Caller, Env, MethodSpec, MethodTable,
    NcError, NcResult,
};
use crate::types::{Amount, BlueprintId, ContractId, TokenUid};

const MAIN_TOKEN: &str = "main_token";
const OWNER: &str = "owner";
const FAUCET: &str = "faucet";
const FAUCET_SALT: &[u8] = b"faucet";

/// Arguments of `initialize`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenManagerInit {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Supply minted to the manager
    pub initial_supply: Amount,
    /// Keep mint authority
    pub mint_authority: bool,
    /// Keep melt authority
    pub melt_authority: bool,
}

/// Arguments of `spawn_faucet`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnFaucet {
    /// Blueprint of the faucet to instantiate
    pub faucet_blueprint: BlueprintId,
    /// Tokens moved from the manager into the faucet
    pub amount: Amount,
    /// Per-caller limit of the faucet
    pub max_withdrawal: Amount,
}

/// Issues and manages one token
pub struct TokenManager;

impl TokenManager {
    fn initialize(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let init: TokenManagerInit = decode(args)?;
        let token = env.create_token(
            &init.name,
            &init.symbol,
            init.initial_supply,
            init.mint_authority,
            init.melt_authority,
        )?;
        let owner = env.context()?.caller;
        env.put(MAIN_TOKEN, &token)?;
        env.put(OWNER, &owner)?;
        env.emit_event("token_created", token.as_bytes().to_vec())?;
        encode(&token)
    }

    fn deposit(_env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn withdraw(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        only_owner(env)?;
        Ok(Vec::new())
    }

    fn mint(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        only_owner(env)?;
        let amount: Amount = decode(args)?;
        let token = main_token(env)?;
        env.mint_tokens(token, amount)?;
        env.emit_event("minted", encode(&amount)?)?;
        Ok(Vec::new())
    }

    fn melt(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        only_owner(env)?;
        let amount: Amount = decode(args)?;
        let token = main_token(env)?;
        env.melt_tokens(token, amount)?;
        env.emit_event("melted", encode(&amount)?)?;
        Ok(Vec::new())
    }

    fn renounce_authorities(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        only_owner(env)?;
        let (mint, melt): (bool, bool) = decode(args)?;
        let token = main_token(env)?;
        env.revoke_authorities(token, mint, melt)?;
        Ok(Vec::new())
    }

    fn spawn_faucet(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        only_owner(env)?;
        let spawn: SpawnFaucet = decode(args)?;
        if env.get::<ContractId>(FAUCET)?.is_some() {
            return Err(NcError::fail("Faucet already exists"));
        }

        let token = main_token(env)?;
        let init = FaucetInit {
            token,
            max_withdrawal: spawn.max_withdrawal,
        };
        let (faucet, _) = env.create_contract(
            spawn.faucet_blueprint,
            FAUCET_SALT,
            vec![Action::deposit(token, spawn.amount)],
            &encode(&init)?,
        )?;
        env.put(FAUCET, &faucet)?;
        env.emit_event("faucet_created", faucet.as_bytes().to_vec())?;
        encode(&faucet)
    }

    fn top_up_faucet(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        only_owner(env)?;
        let amount: Amount = decode(args)?;
        let faucet = faucet(env)?;
        let token = main_token(env)?;
        env.call_public_method(faucet, "deposit", &[], vec![Action::deposit(token, amount)])
    }

    fn get_main_token(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        encode(&main_token(env)?)
    }

    fn get_owner(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        let owner: Option<Caller> = env.get(OWNER)?;
        encode(&owner)
    }

    fn get_faucet(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        let faucet: Option<ContractId> = env.get(FAUCET)?;
        encode(&faucet)
    }

    fn get_treasury(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        let token = main_token(env)?;
        let held = env.get_current_balance(&token)?;
        encode(&held)
    }

    fn get_faucet_supply(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        let faucet = faucet(env)?;
        env.call_view_method(faucet, "get_total_supply", &[])
    }

    fn preview_faucet_id(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let blueprint: BlueprintId = decode(args)?;
        encode(&env.preview_contract_id(&blueprint, FAUCET_SALT)?)
    }
}

impl Blueprint for TokenManager {
    fn name(&self) -> &'static str {
        "token_manager"
    }

    fn methods(&self) -> MethodTable {
        MethodTable::new()
            .initialize(MethodSpec::public(Self::initialize).allow(AllowedActions::DEPOSIT))
            .method(
                "deposit",
                MethodSpec::public(Self::deposit).allow(AllowedActions::DEPOSIT),
            )
            .method(
                "withdraw",
                MethodSpec::public(Self::withdraw)
                    .allow(AllowedActions::WITHDRAWAL | AllowedActions::GRANT_AUTHORITY),
            )
            .method("mint", MethodSpec::public(Self::mint).allow(AllowedActions::DEPOSIT))
            .method("melt", MethodSpec::public(Self::melt))
            .method(
                "renounce_authorities",
                MethodSpec::public(Self::renounce_authorities),
            )
            .method("spawn_faucet", MethodSpec::public(Self::spawn_faucet))
            .method("top_up_faucet", MethodSpec::public(Self::top_up_faucet))
            .method("get_main_token", MethodSpec::view(Self::get_main_token))
            .method("get_owner", MethodSpec::view(Self::get_owner))
            .method("get_faucet", MethodSpec::view(Self::get_faucet))
            .method("get_treasury", MethodSpec::view(Self::get_treasury))
            .method("get_faucet_supply", MethodSpec::view(Self::get_faucet_supply))
            .method("preview_faucet_id", MethodSpec::view(Self::preview_faucet_id))
    }
}

fn main_token(env: &mut Env<'_, '_>) -> NcResult<TokenUid> {
    env.get(MAIN_TOKEN)?
        .ok_or_else(|| NcError::fail("Token manager not initialized"))
}

fn faucet(env: &mut Env<'_, '_>) -> NcResult<ContractId> {
    env.get(FAUCET)?
        .ok_or_else(|| NcError::fail("No faucet spawned"))
}

fn only_owner(env: &mut Env<'_, '_>) -> NcResult<()> {
    let owner: Option<Caller> = env.get(OWNER)?;
    if owner != Some(env.context()?.caller) {
        return Err(NcError::fail("Only owner can call this method"));
    }
    Ok(())
}
