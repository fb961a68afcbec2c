//! Syscall surface available to running blueprint code.
//!
//! A method sees only its own state and balances, the call context and the
//! operations below. Every syscall is metered; mutating syscalls fail with
//! `MutationInViewContext` from a view frame or an off-chain query.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::action::Action;
use super::blueprint::MethodKind;
use super::derive::{derive_contract_id, derive_token_id};
use super::factory;
use super::frame::CallContext;
use super::runner::Runner;
use super::{decode, encode, ContractEvent, NcResult};
use crate::types::{Amount, Authorities, BlueprintId, ContractId, TokenDescription, TokenUid};

/// Handle given to a method while it runs
pub struct Env<'r, 's> {
    runner: &'r mut Runner<'s>,
}

impl<'r, 's> Env<'r, 's> {
    pub(crate) fn new(runner: &'r mut Runner<'s>) -> Self {
        Self { runner }
    }

    // --- Identity and context ---

    /// Id of the executing contract
    ///
    /// # Errors
    /// Never fails inside a method
    pub fn get_contract_id(&self) -> NcResult<ContractId> {
        Ok(self.runner.frame()?.contract_id)
    }

    /// Blueprint of the executing contract
    ///
    /// # Errors
    /// Never fails inside a method
    pub fn get_blueprint_id(&self) -> NcResult<BlueprintId> {
        Ok(self.runner.frame()?.blueprint_id)
    }

    /// Caller, actions, transaction id and timestamp of this call
    ///
    /// # Errors
    /// Never fails inside a method
    pub fn context(&self) -> NcResult<CallContext> {
        self.runner.context()
    }

    /// Fuel left in the transaction
    #[must_use]
    pub fn fuel_remaining(&self) -> u64 {
        self.runner.fuel.remaining()
    }

    // --- Contract state ---

    /// Read a raw state entry of the executing contract
    ///
    /// # Errors
    /// Returns `OutOfFuel` or a storage failure
    pub fn get_state(&mut self, key: &[u8]) -> NcResult<Option<Vec<u8>>> {
        let contract = self.get_contract_id()?;
        let value = self.runner.state.value(&contract, key)?;
        let len = value.as_ref().map_or(0, Vec::len);
        self.runner
            .fuel
            .charge(self.runner.settings.fuel.state_read(len))?;
        Ok(value)
    }

    /// Write a raw state entry of the executing contract
    ///
    /// # Errors
    /// Returns `MutationInViewContext` or `OutOfFuel`
    pub fn put_state(&mut self, key: &[u8], value: Vec<u8>) -> NcResult<()> {
        self.runner.ensure_mutable("put_state")?;
        self.runner.fuel.charge(
            self.runner
                .settings
                .fuel
                .state_write(key.len().saturating_add(value.len())),
        )?;
        let contract = self.get_contract_id()?;
        self.runner.state.put_value(contract, key.to_vec(), value);
        Ok(())
    }

    /// Delete a state entry of the executing contract
    ///
    /// # Errors
    /// Returns `MutationInViewContext` or `OutOfFuel`
    pub fn delete_state(&mut self, key: &[u8]) -> NcResult<()> {
        self.runner.ensure_mutable("delete_state")?;
        self.runner
            .fuel
            .charge(self.runner.settings.fuel.state_write_base)?;
        let contract = self.get_contract_id()?;
        self.runner.state.delete_value(contract, key.to_vec());
        Ok(())
    }

    /// Read and decode a state entry
    ///
    /// # Errors
    /// Returns `InvalidArgs` when the stored bytes do not decode
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> NcResult<Option<T>> {
        self.get_state(key.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Read and decode a state entry, falling back to `default`
    ///
    /// # Errors
    /// Returns `InvalidArgs` when the stored bytes do not decode
    pub fn get_or<T: DeserializeOwned>(&mut self, key: &str, default: T) -> NcResult<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Encode and write a state entry
    ///
    /// # Errors
    /// Returns `MutationInViewContext` or `OutOfFuel`
    pub fn put<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> NcResult<()> {
        let bytes = encode(value)?;
        self.put_state(key.as_bytes(), bytes)
    }

    // --- Balances and authorities ---

    /// Balance of the executing contract
    ///
    /// # Errors
    /// Returns `OutOfFuel` or a storage failure
    pub fn get_current_balance(&mut self, token: &TokenUid) -> NcResult<Amount> {
        self.runner
            .fuel
            .charge(self.runner.settings.fuel.balance_read)?;
        let contract = self.get_contract_id()?;
        Ok(self.runner.state.balance(&contract, token)?.value)
    }

    /// Whether the executing contract may mint `token`
    ///
    /// # Errors
    /// Returns `OutOfFuel` or a storage failure
    pub fn can_mint(&mut self, token: &TokenUid) -> NcResult<bool> {
        Ok(self.authorities(token)?.mint)
    }

    /// Whether the executing contract may melt `token`
    ///
    /// # Errors
    /// Returns `OutOfFuel` or a storage failure
    pub fn can_melt(&mut self, token: &TokenUid) -> NcResult<bool> {
        Ok(self.authorities(token)?.melt)
    }

    /// Balance of the executing contract before this call's actions applied
    ///
    /// Effects of the running method itself are included; only the
    /// deposits and withdrawals attached to this call are undone.
    ///
    /// # Errors
    /// Returns `OutOfFuel` or a storage failure
    pub fn get_balance_before_current_call(&mut self, token: &TokenUid) -> NcResult<Amount> {
        let current = self.get_current_balance(token)?;
        let context = self.runner.context()?;
        Ok(current
            .saturating_sub(context.deposited(token))
            .saturating_add(context.withdrawn(token)))
    }

    /// Whether the executing contract could mint `token` before this call's actions
    ///
    /// # Errors
    /// Returns `OutOfFuel` or a storage failure
    pub fn can_mint_before_current_call(&mut self, token: &TokenUid) -> NcResult<bool> {
        Ok(self.authorities_before_current_call(token)?.mint)
    }

    /// Whether the executing contract could melt `token` before this call's actions
    ///
    /// # Errors
    /// Returns `OutOfFuel` or a storage failure
    pub fn can_melt_before_current_call(&mut self, token: &TokenUid) -> NcResult<bool> {
        Ok(self.authorities_before_current_call(token)?.melt)
    }

    fn authorities_before_current_call(&mut self, token: &TokenUid) -> NcResult<Authorities> {
        let current = self.authorities(token)?;
        Ok(self
            .runner
            .frame()?
            .authorities_on_entry(token)
            .unwrap_or(current))
    }

    fn authorities(&mut self, token: &TokenUid) -> NcResult<Authorities> {
        self.runner
            .fuel
            .charge(self.runner.settings.fuel.balance_read)?;
        let contract = self.get_contract_id()?;
        Ok(self.runner.state.balance(&contract, token)?.authorities)
    }

    /// Description of a registered custom token
    ///
    /// # Errors
    /// Returns `OutOfFuel` or a storage failure
    pub fn get_token(&mut self, token: &TokenUid) -> NcResult<Option<TokenDescription>> {
        self.runner
            .fuel
            .charge(self.runner.settings.fuel.balance_read)?;
        self.runner.state.token(token)
    }

    // --- Calls ---

    /// Call a public method of another contract
    ///
    /// # Errors
    /// Returns the dispatch failure or the callee's failure
    pub fn call_public_method(
        &mut self,
        contract_id: ContractId,
        method: &str,
        args: &[u8],
        actions: Vec<Action>,
    ) -> NcResult<Vec<u8>> {
        self.runner
            .call(MethodKind::Public, contract_id, method, args, actions)
    }

    /// Call a view method of another contract
    ///
    /// # Errors
    /// Returns the dispatch failure or the callee's failure
    pub fn call_view_method(
        &mut self,
        contract_id: ContractId,
        method: &str,
        args: &[u8],
    ) -> NcResult<Vec<u8>> {
        self.runner
            .call(MethodKind::View, contract_id, method, args, Vec::new())
    }

    // --- Factory ---

    /// Create a child contract; `actions` are paid by the executing contract
    ///
    /// # Errors
    /// Returns `DuplicateIdentity`, `BlueprintNotFound` or the failure of `initialize`
    pub fn create_contract(
        &mut self,
        blueprint_id: BlueprintId,
        salt: &[u8],
        actions: Vec<Action>,
        args: &[u8],
    ) -> NcResult<(ContractId, Vec<u8>)> {
        self.runner.ensure_mutable("create_contract")?;
        factory::create_child_contract(self.runner, blueprint_id, salt, args, actions)
    }

    /// Create a custom token held by the executing contract
    ///
    /// # Errors
    /// Returns a validation failure, `DuplicateIdentity` or `InsufficientBalance`
    pub fn create_token(
        &mut self,
        name: &str,
        symbol: &str,
        amount: Amount,
        mint_authority: bool,
        melt_authority: bool,
    ) -> NcResult<TokenUid> {
        self.runner.ensure_mutable("create_token")?;
        let result = factory::create_token(
            self.runner,
            name,
            symbol,
            amount,
            Authorities::new(mint_authority, melt_authority),
        );
        self.runner.latch(result)
    }

    /// Mint tokens into the executing contract
    ///
    /// # Errors
    /// Returns `AuthorityNotHeld` or `InsufficientBalance`
    pub fn mint_tokens(&mut self, token: TokenUid, amount: Amount) -> NcResult<()> {
        self.runner.ensure_mutable("mint_tokens")?;
        let result = factory::mint_tokens(self.runner, token, amount);
        self.runner.latch(result)
    }

    /// Melt tokens held by the executing contract
    ///
    /// # Errors
    /// Returns `AuthorityNotHeld` or `InsufficientBalance`
    pub fn melt_tokens(&mut self, token: TokenUid, amount: Amount) -> NcResult<()> {
        self.runner.ensure_mutable("melt_tokens")?;
        let result = factory::melt_tokens(self.runner, token, amount);
        self.runner.latch(result)
    }

    /// Give up authorities over `token`
    ///
    /// # Errors
    /// Returns `InvalidActionSet` for the native token
    pub fn revoke_authorities(&mut self, token: TokenUid, mint: bool, melt: bool) -> NcResult<()> {
        self.runner.ensure_mutable("revoke_authorities")?;
        let result = factory::revoke_authorities(self.runner, token, Authorities::new(mint, melt));
        self.runner.latch(result)
    }

    /// Id a child contract would get; allowed from views
    ///
    /// # Errors
    /// Returns `OutOfFuel`
    pub fn preview_contract_id(&mut self, blueprint_id: &BlueprintId, salt: &[u8]) -> NcResult<ContractId> {
        self.runner.fuel.charge(self.runner.settings.fuel.derive)?;
        let contract = self.get_contract_id()?;
        Ok(derive_contract_id(&contract, salt, blueprint_id))
    }

    /// Uid a token created here under `symbol` would get; allowed from views
    ///
    /// # Errors
    /// Returns `OutOfFuel`
    pub fn preview_token_id(&mut self, symbol: &str) -> NcResult<TokenUid> {
        self.runner.fuel.charge(self.runner.settings.fuel.derive)?;
        let contract = self.get_contract_id()?;
        Ok(derive_token_id(&contract, symbol))
    }

    // --- Events ---

    /// Emit an event, delivered only if the transaction commits
    ///
    /// # Errors
    /// Returns `MutationInViewContext` or `OutOfFuel`
    pub fn emit_event(&mut self, topic: &str, data: Vec<u8>) -> NcResult<()> {
        self.runner.ensure_mutable("emit_event")?;
        self.runner.fuel.charge(
            self.runner
                .settings
                .fuel
                .event(topic.len().saturating_add(data.len())),
        )?;
        let contract_id = self.get_contract_id()?;
        self.runner.state.emit_event(ContractEvent {
            contract_id,
            topic: topic.to_string(),
            data,
        });
        Ok(())
    }
}
