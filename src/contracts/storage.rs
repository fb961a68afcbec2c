//! Storage collaborator interface.
//!
//! The runtime reads committed state through [`NcStorage`] and hands back at
//! most one [`WriteBatch`] per transaction. Rolled-back transactions never
//! reach storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::derive::len_prefix;
use crate::crypto::{Hash, Hasher};
use crate::types::{Amount, Authorities, BalanceEntry, BlueprintId, ContractId, TokenDescription, TokenUid};

/// Storage failures
#[derive(Clone, Debug, Error)]
pub enum StorageError {
    /// Backend could not read
    #[error("storage read failed: {0}")]
    Read(String),
    /// Backend could not apply a batch
    #[error("storage write failed: {0}")]
    Write(String),
}

/// Persisted contract metadata
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Code the contract runs
    pub blueprint_id: BlueprintId,
}

/// Committed state as seen by the runtime
pub trait NcStorage {
    /// Contract metadata
    fn contract(&self, id: &ContractId) -> Result<Option<ContractRecord>, StorageError>;

    /// Registered custom token
    fn token(&self, uid: &TokenUid) -> Result<Option<TokenDescription>, StorageError>;

    /// One state entry of a contract
    fn value(&self, contract: &ContractId, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Balance and authorities of a contract for a token
    fn balance(&self, contract: &ContractId, token: &TokenUid) -> Result<BalanceEntry, StorageError>;

    /// Apply the effects of one committed transaction atomically
    fn commit(&mut self, batch: WriteBatch) -> Result<(), StorageError>;
}

/// Effects of one committed transaction
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBatch {
    /// Newly created contracts
    pub contracts: BTreeMap<ContractId, ContractRecord>,
    /// Newly created tokens
    pub tokens: BTreeMap<TokenUid, TokenDescription>,
    /// State writes; `None` deletes the key
    pub values: BTreeMap<(ContractId, Vec<u8>), Option<Vec<u8>>>,
    /// Final balance entries of every touched (contract, token)
    pub balances: BTreeMap<(ContractId, TokenUid), BalanceEntry>,
}

impl WriteBatch {
    /// True when the batch changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
            && self.tokens.is_empty()
            && self.values.is_empty()
            && self.balances.is_empty()
    }

    /// Digest of the batch, identical on every node that executed the same transaction
    #[must_use]
    pub fn digest(&self) -> Hash {
        let mut hasher = Hasher::new();
        for (id, record) in &self.contracts {
            hasher.update(b"c").update(id.as_bytes()).update(record.blueprint_id.as_bytes());
        }
        for (uid, token) in &self.tokens {
            hasher
                .update(b"t")
                .update(uid.as_bytes())
                .update(token.issuer.as_bytes())
                .update(&len_prefix(token.symbol.len()))
                .update(token.symbol.as_bytes())
                .update(&len_prefix(token.name.len()))
                .update(token.name.as_bytes());
        }
        for ((contract, key), value) in &self.values {
            hasher
                .update(b"v")
                .update(contract.as_bytes())
                .update(&len_prefix(key.len()))
                .update(key);
            match value {
                Some(v) => hasher.update(&[1]).update(&len_prefix(v.len())).update(v),
                None => hasher.update(&[0]),
            };
        }
        for ((contract, token), entry) in &self.balances {
            hasher
                .update(b"b")
                .update(contract.as_bytes())
                .update(token.as_bytes())
                .update(&entry.value.to_le_bytes())
                .update(&[u8::from(entry.authorities.mint), u8::from(entry.authorities.melt)]);
        }
        hasher.finalize()
    }
}

/// In-memory storage, used by tests and by nodes that keep state in RAM
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    contracts: BTreeMap<ContractId, ContractRecord>,
    tokens: BTreeMap<TokenUid, TokenDescription>,
    values: BTreeMap<(ContractId, Vec<u8>), Vec<u8>>,
    balances: BTreeMap<(ContractId, TokenUid), BalanceEntry>,
    commits: usize,
}

impl MemoryStorage {
    /// Empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches applied so far
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Committed balance of a contract
    #[must_use]
    pub fn balance_of(&self, contract: &ContractId, token: &TokenUid) -> Amount {
        self.balances
            .get(&(*contract, *token))
            .map_or(0, |entry| entry.value)
    }

    /// Committed authorities of a contract
    #[must_use]
    pub fn authorities_of(&self, contract: &ContractId, token: &TokenUid) -> Authorities {
        self.balances
            .get(&(*contract, *token))
            .map_or(Authorities::NONE, |entry| entry.authorities)
    }

    /// Committed state entry of a contract
    #[must_use]
    pub fn value_of(&self, contract: &ContractId, key: &[u8]) -> Option<&[u8]> {
        self.values
            .get(&(*contract, key.to_vec()))
            .map(Vec::as_slice)
    }

    /// Every committed state entry of a contract
    #[must_use]
    pub fn values_of(&self, contract: &ContractId) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.values
            .iter()
            .filter(|((owner, _), _)| owner == contract)
            .map(|((_, key), value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Sum of committed balances of a token over all contracts
    #[must_use]
    pub fn total_held(&self, token: &TokenUid) -> u128 {
        self.balances
            .iter()
            .filter(|((_, t), _)| t == token)
            .map(|(_, entry)| u128::from(entry.value))
            .sum()
    }

    /// Number of known contracts
    #[must_use]
    pub fn contract_count(&self) -> usize {
        self.contracts.len()
    }
}

impl NcStorage for MemoryStorage {
    fn contract(&self, id: &ContractId) -> Result<Option<ContractRecord>, StorageError> {
        Ok(self.contracts.get(id).copied())
    }

    fn token(&self, uid: &TokenUid) -> Result<Option<TokenDescription>, StorageError> {
        Ok(self.tokens.get(uid).cloned())
    }

    fn value(&self, contract: &ContractId, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.values.get(&(*contract, key.to_vec())).cloned())
    }

    fn balance(&self, contract: &ContractId, token: &TokenUid) -> Result<BalanceEntry, StorageError> {
        Ok(self
            .balances
            .get(&(*contract, *token))
            .copied()
            .unwrap_or_default())
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StorageError> {
        self.contracts.extend(batch.contracts);
        self.tokens.extend(batch.tokens);
        for (key, value) in batch.values {
            match value {
                Some(v) => {
                    self.values.insert(key, v);
                }
                None => {
                    self.values.remove(&key);
                }
            }
        }
        for (key, entry) in batch.balances {
            if entry.is_empty() {
                self.balances.remove(&key);
            } else {
                self.balances.insert(key, entry);
            }
        }
        self.commits += 1;
        Ok(())
    }
}
