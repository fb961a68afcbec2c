//! Nanocontract transaction types.
//!
//! A transaction either creates a contract from a blueprint or calls a
//! public method of an existing contract. It carries the caller's declared
//! token inputs and authorities, which fund the actions of the root call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::action::Action;
use crate::crypto::sha256d;
use crate::types::{Address, Amount, Authorities, BlueprintId, ContractId, Timestamp, TokenUid, TxId};

/// Tokens and authorities the external caller brings into a transaction
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInputs {
    /// Spendable amount per token
    pub tokens: BTreeMap<TokenUid, Amount>,
    /// Authorities per token
    pub authorities: BTreeMap<TokenUid, Authorities>,
}

impl TxInputs {
    /// Add spendable tokens
    #[must_use]
    pub fn with_tokens(mut self, token: TokenUid, amount: Amount) -> Self {
        let held = self.tokens.entry(token).or_insert(0);
        *held = held.saturating_add(amount);
        self
    }

    /// Add authorities
    #[must_use]
    pub fn with_authorities(mut self, token: TokenUid, authorities: Authorities) -> Self {
        let held = self.authorities.entry(token).or_default();
        *held = held.union(authorities);
        self
    }

    /// Spendable amount of a token
    #[must_use]
    pub fn amount(&self, token: &TokenUid) -> Amount {
        self.tokens.get(token).copied().unwrap_or(0)
    }

    /// Held authorities for a token
    #[must_use]
    pub fn authorities(&self, token: &TokenUid) -> Authorities {
        self.authorities.get(token).copied().unwrap_or_default()
    }
}

/// What the transaction does
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Create a contract and run its `initialize`
    Create {
        /// Blueprint to instantiate
        blueprint_id: BlueprintId,
    },
    /// Call a public method of an existing contract
    Call {
        /// Target contract
        contract_id: ContractId,
        /// Public method name
        method: String,
    },
}

/// A ledger transaction that executes nanocontract code
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NanoTransaction {
    /// Transaction ID (hash of contents)
    pub id: TxId,
    /// External caller
    pub caller: Address,
    /// Create or call
    pub kind: TransactionKind,
    /// Encoded method arguments
    pub args: Vec<u8>,
    /// Actions attached to the root call
    pub actions: Vec<Action>,
    /// Declared inputs funding the actions
    pub inputs: TxInputs,
    /// Ledger timestamp
    pub timestamp: Timestamp,
    /// Fuel budget; the configured default applies when absent
    pub fuel_limit: Option<u64>,
}

impl NanoTransaction {
    /// Transaction creating a contract from `blueprint_id`
    #[must_use]
    pub fn create(caller: Address, blueprint_id: BlueprintId, args: Vec<u8>, timestamp: Timestamp) -> Self {
        Self::new(caller, TransactionKind::Create { blueprint_id }, args, timestamp)
    }

    /// Transaction calling `method` on `contract_id`
    #[must_use]
    pub fn call(
        caller: Address,
        contract_id: ContractId,
        method: impl Into<String>,
        args: Vec<u8>,
        timestamp: Timestamp,
    ) -> Self {
        Self::new(
            caller,
            TransactionKind::Call {
                contract_id,
                method: method.into(),
            },
            args,
            timestamp,
        )
    }

    fn new(caller: Address, kind: TransactionKind, args: Vec<u8>, timestamp: Timestamp) -> Self {
        let mut tx = Self {
            id: TxId::default(),
            caller,
            kind,
            args,
            actions: Vec::new(),
            inputs: TxInputs::default(),
            timestamp,
            fuel_limit: None,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// Attach actions to the root call
    #[must_use]
    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self.id = self.compute_id();
        self
    }

    /// Declare the caller's inputs
    #[must_use]
    pub fn with_inputs(mut self, inputs: TxInputs) -> Self {
        self.inputs = inputs;
        self.id = self.compute_id();
        self
    }

    /// Set the fuel budget
    #[must_use]
    pub fn with_fuel_limit(mut self, fuel_limit: u64) -> Self {
        self.fuel_limit = Some(fuel_limit);
        self.id = self.compute_id();
        self
    }

    /// Compute transaction ID
    #[must_use]
    pub fn compute_id(&self) -> TxId {
        let body = (
            &self.caller,
            &self.kind,
            &self.args,
            &self.actions,
            &self.inputs,
            self.timestamp,
            self.fuel_limit,
        );
        let data = bincode::serialize(&body).unwrap_or_default();
        TxId::from_hash(sha256d(&data))
    }

    /// Method invoked by the root call
    #[must_use]
    pub fn method(&self) -> &str {
        match &self.kind {
            TransactionKind::Create { .. } => super::INITIALIZE_METHOD,
            TransactionKind::Call { method, .. } => method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller() -> Address {
        Address::from_bytes([1u8; 20])
    }

    #[test]
    fn test_transaction_creation() {
        let contract = ContractId::from_bytes([5u8; 32]);
        let tx = NanoTransaction::call(caller(), contract, "deposit", b"args".to_vec(), 1_000)
            .with_fuel_limit(50_000);

        assert_eq!(tx.method(), "deposit");
        assert_eq!(tx.fuel_limit, Some(50_000));
        assert!(matches!(
            tx.kind,
            TransactionKind::Call { contract_id, .. } if contract_id == contract
        ));
    }

    #[test]
    fn test_transaction_id_deterministic() {
        let blueprint = BlueprintId::from_bytes([2u8; 32]);
        let tx1 = NanoTransaction::create(caller(), blueprint, vec![1, 2, 3], 7);
        let tx2 = NanoTransaction::create(caller(), blueprint, vec![1, 2, 3], 7);
        assert_eq!(tx1.id, tx2.id);
        assert_eq!(tx1.id, tx1.compute_id());
        assert_eq!(tx1.method(), "initialize");
    }

    #[test]
    fn test_id_covers_inputs() {
        let blueprint = BlueprintId::from_bytes([2u8; 32]);
        let tx = NanoTransaction::create(caller(), blueprint, vec![], 7);
        let funded = tx
            .clone()
            .with_inputs(TxInputs::default().with_tokens(TokenUid::NATIVE, 10));
        assert_ne!(tx.id, funded.id);
        assert_eq!(funded.inputs.amount(&TokenUid::NATIVE), 10);
    }

    #[test]
    fn test_inputs_merge() {
        let token = TokenUid::from_bytes([9u8; 32]);
        let inputs = TxInputs::default()
            .with_tokens(token, 5)
            .with_tokens(token, 7)
            .with_authorities(token, Authorities::new(true, false))
            .with_authorities(token, Authorities::new(false, true));
        assert_eq!(inputs.amount(&token), 12);
        assert_eq!(inputs.authorities(&token), Authorities::ALL);
    }
}
