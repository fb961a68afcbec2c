//! Transaction state overlay - controlled, reversible access to ledger state.
//!
//! During a transaction contracts never touch storage directly. They go
//! through `TxState`, which:
//! - Reads committed state through the storage collaborator
//! - Keeps every change in an overlay keyed at the finest granularity
//!   (contract, state key) and (contract, token)
//! - Records the previous overlay value of every change in an undo log
//! - Turns the overlay into a single [`WriteBatch`] on commit

use std::collections::{BTreeMap, BTreeSet};

use super::records::IndexRecord;
use super::storage::{ContractRecord, NcStorage, WriteBatch};
use super::transaction::TxInputs;
use super::{ContractEvent, NcError, NcResult};
use crate::types::{Amount, Authorities, BalanceEntry, ContractId, TokenDescription, TokenUid};

/// A reversible mutation
#[derive(Clone, Debug)]
enum Mutation {
    /// Contract registered in this transaction
    ContractRegistered(ContractId),
    /// Contract finished `initialize`
    ContractInitialized(ContractId),
    /// Token registered in this transaction
    TokenRegistered(TokenUid),
    /// Balance or authority change
    Balance {
        /// Entry key
        key: (ContractId, TokenUid),
        /// Overlay value before the change
        previous: Option<BalanceEntry>,
    },
    /// State write or delete
    Value {
        /// Entry key
        key: (ContractId, Vec<u8>),
        /// Overlay value before the change
        previous: Option<Option<Vec<u8>>>,
    },
    /// Caller pool token change
    PoolTokens {
        /// Token
        token: TokenUid,
        /// Amount before the change
        previous: Amount,
    },
    /// Caller pool authority change
    PoolAuthorities {
        /// Token
        token: TokenUid,
        /// Flags before the change
        previous: Authorities,
    },
    /// Event appended
    Event,
    /// Index record appended
    Record,
}

/// Everything a committed transaction produced
#[derive(Debug)]
pub struct Committed {
    /// Batch for the storage collaborator
    pub batch: WriteBatch,
    /// Events in emission order
    pub events: Vec<ContractEvent>,
    /// Index records in execution order
    pub records: Vec<IndexRecord>,
    /// What remains of the external caller's declared inputs
    pub outputs: TxInputs,
}

/// Reversible view of ledger state for one transaction
pub struct TxState<'s> {
    storage: &'s dyn NcStorage,
    contracts: BTreeMap<ContractId, ContractRecord>,
    uninitialized: BTreeSet<ContractId>,
    tokens: BTreeMap<TokenUid, TokenDescription>,
    values: BTreeMap<(ContractId, Vec<u8>), Option<Vec<u8>>>,
    balances: BTreeMap<(ContractId, TokenUid), BalanceEntry>,
    pool: TxInputs,
    events: Vec<ContractEvent>,
    records: Vec<IndexRecord>,
    undo: Vec<Mutation>,
}

impl<'s> TxState<'s> {
    /// Open an overlay over `storage`; `pool` holds the external caller's declared inputs
    #[must_use]
    pub fn new(storage: &'s dyn NcStorage, pool: TxInputs) -> Self {
        Self {
            storage,
            contracts: BTreeMap::new(),
            uninitialized: BTreeSet::new(),
            tokens: BTreeMap::new(),
            values: BTreeMap::new(),
            balances: BTreeMap::new(),
            pool,
            events: Vec::new(),
            records: Vec::new(),
            undo: Vec::new(),
        }
    }

    // --- Contracts ---

    /// Contract metadata, including contracts created in this transaction
    pub fn contract(&self, id: &ContractId) -> NcResult<Option<ContractRecord>> {
        if let Some(record) = self.contracts.get(id) {
            return Ok(Some(*record));
        }
        Ok(self.storage.contract(id)?)
    }

    /// True while the contract's `initialize` has not returned
    #[must_use]
    pub fn is_initializing(&self, id: &ContractId) -> bool {
        self.uninitialized.contains(id)
    }

    /// Register a new, not yet initialized contract
    pub fn register_contract(&mut self, id: ContractId, record: ContractRecord) -> NcResult<()> {
        if self.contract(&id)?.is_some() {
            return Err(NcError::DuplicateIdentity(format!("contract {id}")));
        }
        self.contracts.insert(id, record);
        self.uninitialized.insert(id);
        self.undo.push(Mutation::ContractRegistered(id));
        Ok(())
    }

    /// Mark a contract's `initialize` as completed
    pub fn mark_initialized(&mut self, id: ContractId) {
        if self.uninitialized.remove(&id) {
            self.undo.push(Mutation::ContractInitialized(id));
        }
    }

    // --- Tokens ---

    /// Token description, including tokens created in this transaction
    pub fn token(&self, uid: &TokenUid) -> NcResult<Option<TokenDescription>> {
        if let Some(token) = self.tokens.get(uid) {
            return Ok(Some(token.clone()));
        }
        Ok(self.storage.token(uid)?)
    }

    /// Register a new token
    pub fn register_token(&mut self, uid: TokenUid, description: TokenDescription) -> NcResult<()> {
        if uid.is_native() || self.token(&uid)?.is_some() {
            return Err(NcError::DuplicateIdentity(format!("token {uid}")));
        }
        self.tokens.insert(uid, description);
        self.undo.push(Mutation::TokenRegistered(uid));
        Ok(())
    }

    // --- Balances and authorities ---

    /// Current balance entry of a contract
    pub fn balance(&self, contract: &ContractId, token: &TokenUid) -> NcResult<BalanceEntry> {
        if let Some(entry) = self.balances.get(&(*contract, *token)) {
            return Ok(*entry);
        }
        Ok(self.storage.balance(contract, token)?)
    }

    fn set_balance(&mut self, contract: ContractId, token: TokenUid, entry: BalanceEntry) {
        let key = (contract, token);
        let previous = self.balances.insert(key, entry);
        self.undo.push(Mutation::Balance { key, previous });
    }

    /// Add `amount` to a contract's balance
    pub fn credit(&mut self, contract: ContractId, token: TokenUid, amount: Amount) -> NcResult<()> {
        let mut entry = self.balance(&contract, &token)?;
        entry.value = entry.value.checked_add(amount).ok_or_else(|| {
            NcError::InvalidActionSet(format!("balance of {token} in {contract} overflows"))
        })?;
        self.set_balance(contract, token, entry);
        Ok(())
    }

    /// Remove `amount` from a contract's balance
    pub fn debit(&mut self, contract: ContractId, token: TokenUid, amount: Amount) -> NcResult<()> {
        let mut entry = self.balance(&contract, &token)?;
        if entry.value < amount {
            return Err(NcError::InsufficientBalance {
                contract,
                token,
                need: amount,
                have: entry.value,
            });
        }
        entry.value -= amount;
        self.set_balance(contract, token, entry);
        Ok(())
    }

    /// Replace a contract's authority flags for a token
    pub fn set_authorities(
        &mut self,
        contract: ContractId,
        token: TokenUid,
        authorities: Authorities,
    ) -> NcResult<()> {
        let mut entry = self.balance(&contract, &token)?;
        if entry.authorities == authorities {
            return Ok(());
        }
        entry.authorities = authorities;
        self.set_balance(contract, token, entry);
        Ok(())
    }

    // --- Contract storage ---

    /// Read a state entry
    pub fn value(&self, contract: &ContractId, key: &[u8]) -> NcResult<Option<Vec<u8>>> {
        if let Some(value) = self.values.get(&(*contract, key.to_vec())) {
            return Ok(value.clone());
        }
        Ok(self.storage.value(contract, key)?)
    }

    /// Write a state entry
    pub fn put_value(&mut self, contract: ContractId, key: Vec<u8>, value: Vec<u8>) {
        self.write_value(contract, key, Some(value));
    }

    /// Delete a state entry
    pub fn delete_value(&mut self, contract: ContractId, key: Vec<u8>) {
        self.write_value(contract, key, None);
    }

    fn write_value(&mut self, contract: ContractId, key: Vec<u8>, value: Option<Vec<u8>>) {
        let key = (contract, key);
        let previous = self.values.insert(key.clone(), value);
        self.undo.push(Mutation::Value { key, previous });
    }

    // --- External caller pool ---

    /// Tokens the external caller still has available
    #[must_use]
    pub fn pool_tokens(&self, token: &TokenUid) -> Amount {
        self.pool.tokens.get(token).copied().unwrap_or(0)
    }

    /// Authorities the external caller still holds
    #[must_use]
    pub fn pool_authorities(&self, token: &TokenUid) -> Authorities {
        self.pool.authorities.get(token).copied().unwrap_or_default()
    }

    /// Take tokens from the external caller's inputs
    pub fn pool_debit(&mut self, token: TokenUid, amount: Amount) -> NcResult<()> {
        let have = self.pool_tokens(&token);
        if have < amount {
            return Err(NcError::InsufficientFunds {
                token,
                need: amount,
                have,
            });
        }
        self.set_pool_tokens(token, have - amount);
        Ok(())
    }

    /// Return tokens to the external caller
    pub fn pool_credit(&mut self, token: TokenUid, amount: Amount) -> NcResult<()> {
        let have = self.pool_tokens(&token);
        let total = have.checked_add(amount).ok_or_else(|| {
            NcError::InvalidActionSet(format!("caller amount of {token} overflows"))
        })?;
        self.set_pool_tokens(token, total);
        Ok(())
    }

    fn set_pool_tokens(&mut self, token: TokenUid, amount: Amount) {
        let previous = self.pool.tokens.insert(token, amount).unwrap_or(0);
        self.undo.push(Mutation::PoolTokens { token, previous });
    }

    /// Replace the external caller's authority flags for a token
    pub fn set_pool_authorities(&mut self, token: TokenUid, authorities: Authorities) {
        let previous = self
            .pool
            .authorities
            .insert(token, authorities)
            .unwrap_or_default();
        self.undo.push(Mutation::PoolAuthorities { token, previous });
    }

    // --- Events and records ---

    /// Append an event
    pub fn emit_event(&mut self, event: ContractEvent) {
        self.events.push(event);
        self.undo.push(Mutation::Event);
    }

    /// Append an index record
    pub fn push_record(&mut self, record: IndexRecord) {
        self.records.push(record);
        self.undo.push(Mutation::Record);
    }

    /// Events emitted so far
    #[must_use]
    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    /// Number of undo entries recorded so far
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// True when the overlay holds no change at all
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.undo.is_empty()
            && self.contracts.is_empty()
            && self.uninitialized.is_empty()
            && self.tokens.is_empty()
            && self.values.is_empty()
            && self.balances.is_empty()
            && self.events.is_empty()
            && self.records.is_empty()
    }

    /// Replay the undo log in reverse, restoring the state the overlay was opened with
    pub fn rollback(&mut self) {
        while let Some(mutation) = self.undo.pop() {
            match mutation {
                Mutation::ContractRegistered(id) => {
                    self.contracts.remove(&id);
                    self.uninitialized.remove(&id);
                }
                Mutation::ContractInitialized(id) => {
                    self.uninitialized.insert(id);
                }
                Mutation::TokenRegistered(uid) => {
                    self.tokens.remove(&uid);
                }
                Mutation::Balance { key, previous } => {
                    restore(&mut self.balances, key, previous);
                }
                Mutation::Value { key, previous } => {
                    restore(&mut self.values, key, previous);
                }
                Mutation::PoolTokens { token, previous } => {
                    self.pool.tokens.insert(token, previous);
                }
                Mutation::PoolAuthorities { token, previous } => {
                    self.pool.authorities.insert(token, previous);
                }
                Mutation::Event => {
                    self.events.pop();
                }
                Mutation::Record => {
                    self.records.pop();
                }
            }
        }
    }

    /// Discard the undo log and turn the overlay into a write batch
    #[must_use]
    pub fn commit(self) -> Committed {
        let Self {
            contracts,
            tokens,
            values,
            balances,
            mut pool,
            events,
            records,
            ..
        } = self;

        pool.tokens.retain(|_, amount| *amount > 0);
        pool.authorities.retain(|_, flags| !flags.is_empty());

        Committed {
            batch: WriteBatch {
                contracts,
                tokens,
                values,
                balances,
            },
            events,
            records,
            outputs: pool,
        }
    }
}

fn restore<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, previous: Option<V>) {
    match previous {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}
