//! Shared harness for the integration tests.
//!
//! `Fixture` is a blueprint whose methods each exercise one runtime path:
//! forwarding calls, creating children and tokens, failing on purpose,
//! discarding a nested failure and burning fuel.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use blueprint_runtime::blueprints::{register_natives, NativeBlueprints};
use blueprint_runtime::contracts::{
    decode, encode, AllowedActions, MethodHandler, MethodSpec, MethodTable,
};
use blueprint_runtime::{
    Action, Address, Amount, Blueprint, BlueprintId, BlueprintRegistry, ContractId, Env,
    ExecutionFailure, ExecutionReceipt, MemoryStorage, NanoProcessor, NanoTransaction, NcError,
    NcResult, RuntimeSettings, TokenUid, TxInputs,
};

/// Nested call description used by `forward` and `initialize`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Forward {
    pub target: ContractId,
    pub method: String,
    pub view: bool,
    pub args: Vec<u8>,
    pub actions: Vec<Action>,
}

impl Forward {
    pub fn public(target: ContractId, method: &str, args: Vec<u8>, actions: Vec<Action>) -> Self {
        Self {
            target,
            method: method.to_string(),
            view: false,
            args,
            actions,
        }
    }

    pub fn view(target: ContractId, method: &str, args: Vec<u8>) -> Self {
        Self {
            target,
            method: method.to_string(),
            view: true,
            args,
            actions: Vec::new(),
        }
    }

    pub fn encoded(&self) -> Vec<u8> {
        encode(self).unwrap()
    }
}

/// Arguments of `spawn`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Spawn {
    pub blueprint: BlueprintId,
    pub salt: Vec<u8>,
    pub actions: Vec<Action>,
    pub args: Vec<u8>,
}

/// Arguments of `make_token`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MakeToken {
    pub name: String,
    pub symbol: String,
    pub amount: Amount,
    pub mint: bool,
    pub melt: bool,
}

pub struct Fixture;

impl Fixture {
    fn initialize(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        env.put("initialized", &true)?;
        if args.is_empty() {
            return Ok(Vec::new());
        }
        let forward: Option<Forward> = decode(args)?;
        match forward {
            Some(f) => run_forward(env, &f),
            None => Ok(Vec::new()),
        }
    }

    fn noop(_env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn store(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let (key, value): (String, u64) = decode(args)?;
        env.put(&key, &value)?;
        Ok(Vec::new())
    }

    fn erase(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let key: String = decode(args)?;
        env.delete_state(key.as_bytes())?;
        Ok(Vec::new())
    }

    fn call_self(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        let me = env.get_contract_id()?;
        env.call_public_method(me, "noop", &[], Vec::new())
    }

    fn forward(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        env.put("forwarded", &true)?;
        let forward: Forward = decode(args)?;
        run_forward(env, &forward)
    }

    fn swallow(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let forward: Forward = decode(args)?;
        let failed = run_forward(env, &forward).is_err();
        env.put("swallowed", &failed)?;
        Ok(Vec::new())
    }

    fn fan_out(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let (target, times): (ContractId, u32) = decode(args)?;
        for _ in 0..times {
            env.call_public_method(target, "noop", &[], Vec::new())?;
        }
        Ok(Vec::new())
    }

    fn fail(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        env.put("dirty", &true)?;
        env.emit_event("about_to_fail", Vec::new())?;
        Err(NcError::fail("fixture failure"))
    }

    fn reinit(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let target: ContractId = decode(args)?;
        env.call_public_method(target, "initialize", &[], Vec::new())
    }

    fn burn_fuel(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let rounds: u32 = decode(args)?;
        for i in 0..rounds {
            env.put(&format!("burn:{i}"), &u64::from(i))?;
        }
        Ok(Vec::new())
    }

    fn spawn(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let spawn: Spawn = decode(args)?;
        let (child, _) = env.create_contract(spawn.blueprint, &spawn.salt, spawn.actions, &spawn.args)?;
        encode(&child)
    }

    fn make_token(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let token: MakeToken = decode(args)?;
        let uid = env.create_token(&token.name, &token.symbol, token.amount, token.mint, token.melt)?;
        encode(&uid)
    }

    fn mint(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let (token, amount): (TokenUid, Amount) = decode(args)?;
        env.mint_tokens(token, amount)?;
        Ok(Vec::new())
    }

    fn melt(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let (token, amount): (TokenUid, Amount) = decode(args)?;
        env.melt_tokens(token, amount)?;
        Ok(Vec::new())
    }

    fn revoke(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let (token, mint, melt): (TokenUid, bool, bool) = decode(args)?;
        env.revoke_authorities(token, mint, melt)?;
        Ok(Vec::new())
    }

    fn announce(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let topic: String = decode(args)?;
        env.emit_event(&topic, args.to_vec())?;
        Ok(Vec::new())
    }

    fn peek(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let key: String = decode(args)?;
        let value: Option<u64> = env.get(&key)?;
        encode(&value)
    }

    fn balance(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let token: TokenUid = decode(args)?;
        let held = env.get_current_balance(&token)?;
        let mint = env.can_mint(&token)?;
        let melt = env.can_melt(&token)?;
        encode(&(held, mint, melt))
    }

    fn balance_before(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let token: TokenUid = decode(args)?;
        let now = (
            env.get_current_balance(&token)?,
            env.can_mint(&token)?,
            env.can_melt(&token)?,
        );
        let before = (
            env.get_balance_before_current_call(&token)?,
            env.can_mint_before_current_call(&token)?,
            env.can_melt_before_current_call(&token)?,
        );
        encode(&(now, before))
    }

    fn view_forward(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let forward: Forward = decode(args)?;
        run_forward(env, &forward)
    }

    fn view_writes(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        env.put("sneaky", &1u64)?;
        Ok(Vec::new())
    }

    fn preview(env: &mut Env<'_, '_>, args: &[u8]) -> NcResult<Vec<u8>> {
        let (blueprint, salt, symbol): (BlueprintId, Vec<u8>, String) = decode(args)?;
        let contract = env.preview_contract_id(&blueprint, &salt)?;
        let token = env.preview_token_id(&symbol)?;
        encode(&(contract, token))
    }

    fn whoami(env: &mut Env<'_, '_>, _args: &[u8]) -> NcResult<Vec<u8>> {
        let context = env.context()?;
        encode(&(context.caller, context.contract_id, env.get_blueprint_id()?))
    }

    fn catch_all(env: &mut Env<'_, '_>, method: &str, _args: &[u8]) -> NcResult<Vec<u8>> {
        env.put("last_fallback", method)?;
        Ok(Vec::new())
    }
}

fn run_forward(env: &mut Env<'_, '_>, forward: &Forward) -> NcResult<Vec<u8>> {
    if forward.view {
        env.call_view_method(forward.target, &forward.method, &forward.args)
    } else {
        env.call_public_method(
            forward.target,
            &forward.method,
            &forward.args,
            forward.actions.clone(),
        )
    }
}

impl Blueprint for Fixture {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn methods(&self) -> MethodTable {
        let public = |handler: MethodHandler| MethodSpec::public(handler).allow(AllowedActions::ALL);
        MethodTable::new()
            .initialize(public(Self::initialize))
            .method("noop", public(Self::noop))
            .method("store", public(Self::store))
            .method("erase", public(Self::erase))
            .method("call_self", public(Self::call_self))
            .method("forward", public(Self::forward))
            .method("swallow", public(Self::swallow))
            .method("fan_out", public(Self::fan_out))
            .method("fail", public(Self::fail))
            .method("reinit", public(Self::reinit))
            .method("burn_fuel", public(Self::burn_fuel))
            .method("spawn", public(Self::spawn))
            .method("make_token", public(Self::make_token))
            .method("mint", public(Self::mint))
            .method("melt", public(Self::melt))
            .method("revoke", public(Self::revoke))
            .method("announce", public(Self::announce))
            .method("balance_before", public(Self::balance_before))
            .method("single_deposit", public(Self::noop).max_deposits(1))
            .method("deposit_only", MethodSpec::public(Self::noop).allow(AllowedActions::DEPOSIT))
            .method("peek", MethodSpec::view(Self::peek))
            .method("balance", MethodSpec::view(Self::balance))
            .method("view_forward", MethodSpec::view(Self::view_forward))
            .method("view_writes", MethodSpec::view(Self::view_writes))
            .method("preview", MethodSpec::view(Self::preview))
            .method("whoami", MethodSpec::view(Self::whoami))
            .fallback(AllowedActions::DEPOSIT, Self::catch_all)
    }
}

/// Install a test subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Processor, storage and a monotonic clock
pub struct Harness {
    pub processor: NanoProcessor,
    pub storage: MemoryStorage,
    pub fixture: BlueprintId,
    pub natives: NativeBlueprints,
    pub caller: Address,
    clock: i64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(RuntimeSettings::default())
    }

    pub fn with_settings(settings: RuntimeSettings) -> Self {
        init_tracing();
        let mut registry = BlueprintRegistry::new();
        let natives = register_natives(&mut registry).unwrap();
        let fixture = registry.register(&Fixture).unwrap();
        Self {
            processor: NanoProcessor::with_registry(settings, registry),
            storage: MemoryStorage::new(),
            fixture,
            natives,
            caller: Address::from_bytes([0xAA; 20]),
            clock: 1_700_000_000_000,
        }
    }

    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    /// Submit a prepared transaction
    pub fn submit(&mut self, tx: &NanoTransaction) -> Result<ExecutionReceipt, ExecutionFailure> {
        self.processor.execute(&mut self.storage, tx)
    }

    /// Create a contract, funding its `initialize` with `deposit` native units
    pub fn try_create(
        &mut self,
        blueprint: BlueprintId,
        args: Vec<u8>,
        deposit: Amount,
    ) -> Result<ExecutionReceipt, ExecutionFailure> {
        let now = self.tick();
        let mut tx = NanoTransaction::create(self.caller, blueprint, args, now);
        if deposit > 0 {
            tx = tx
                .with_actions(vec![Action::deposit(TokenUid::NATIVE, deposit)])
                .with_inputs(TxInputs::default().with_tokens(TokenUid::NATIVE, deposit));
        }
        self.submit(&tx)
    }

    pub fn create(&mut self, blueprint: BlueprintId, args: Vec<u8>, deposit: Amount) -> ContractId {
        self.try_create(blueprint, args, deposit)
            .unwrap()
            .contract_id
            .unwrap()
    }

    /// Create a fixture holding `deposit` native units
    pub fn fixture(&mut self, deposit: Amount) -> ContractId {
        self.create(self.fixture, Vec::new(), deposit)
    }

    /// Call a public method; `inputs` fund the actions
    pub fn call_with(
        &mut self,
        contract: ContractId,
        method: &str,
        args: Vec<u8>,
        actions: Vec<Action>,
        inputs: TxInputs,
    ) -> Result<ExecutionReceipt, ExecutionFailure> {
        let now = self.tick();
        let tx = NanoTransaction::call(self.caller, contract, method, args, now)
            .with_actions(actions)
            .with_inputs(inputs);
        self.submit(&tx)
    }

    pub fn call(
        &mut self,
        contract: ContractId,
        method: &str,
        args: Vec<u8>,
    ) -> Result<ExecutionReceipt, ExecutionFailure> {
        self.call_with(contract, method, args, Vec::new(), TxInputs::default())
    }

    pub fn view(&self, contract: ContractId, method: &str, args: Vec<u8>) -> NcResult<Vec<u8>> {
        self.processor
            .call_view_method(&self.storage, contract, method, &args)
    }

    pub fn native(&self, contract: &ContractId) -> Amount {
        self.storage.balance_of(contract, &TokenUid::NATIVE)
    }
}

pub fn args<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    encode(value).unwrap()
}
