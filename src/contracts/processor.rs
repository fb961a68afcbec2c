//! Transaction processor - executes nanocontract transactions atomically.
//!
//! This is the entry point the ledger uses. It opens an execution context
//! over the storage collaborator, runs the root call, and then either
//! commits every effect as one batch or rolls all of them back.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::blueprint::{Blueprint, BlueprintRegistry, RegistryError};
use super::records::IndexRecord;
use super::runner::Runner;
use super::storage::NcStorage;
use super::transaction::{NanoTransaction, TxInputs};
use super::{ContractEvent, NcError, NcResult};
use crate::config::RuntimeSettings;
use crate::crypto::Hash;
use crate::types::{BlueprintId, ContractId, TxId};

/// Outcome of a committed transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    /// Transaction
    pub tx_id: TxId,
    /// Contract created by a `Create` transaction
    pub contract_id: Option<ContractId>,
    /// Encoded return value of the root call
    pub output: Vec<u8>,
    /// Fuel consumed
    pub fuel_used: u64,
    /// Events in emission order
    pub events: Vec<ContractEvent>,
    /// Index records in execution order
    pub records: Vec<IndexRecord>,
    /// Declared inputs the caller did not spend, plus withdrawals
    pub outputs: TxInputs,
    /// Digest of the committed write batch
    pub diff_digest: Hash,
}

/// Outcome of a rolled-back transaction
#[derive(Debug, thiserror::Error)]
#[error("transaction {tx_id} failed after {fuel_used} fuel: {error}")]
pub struct ExecutionFailure {
    /// Transaction
    pub tx_id: TxId,
    /// Cause
    #[source]
    pub error: NcError,
    /// Fuel consumed before the failure
    pub fuel_used: u64,
}

/// Executes nanocontract transactions against a storage collaborator
pub struct NanoProcessor {
    registry: BlueprintRegistry,
    settings: RuntimeSettings,
}

impl NanoProcessor {
    /// Create processor with an empty registry
    #[must_use]
    pub fn new(settings: RuntimeSettings) -> Self {
        Self {
            registry: BlueprintRegistry::new(),
            settings,
        }
    }

    /// Create processor with a pre-configured registry
    #[must_use]
    pub fn with_registry(settings: RuntimeSettings, registry: BlueprintRegistry) -> Self {
        Self { registry, settings }
    }

    /// Register a blueprint
    ///
    /// # Errors
    /// Returns error if the blueprint is malformed or already registered
    pub fn register(&mut self, blueprint: &dyn Blueprint) -> Result<BlueprintId, RegistryError> {
        self.registry.register(blueprint)
    }

    /// Get reference to blueprint registry
    #[must_use]
    pub fn registry(&self) -> &BlueprintRegistry {
        &self.registry
    }

    /// Active settings
    #[must_use]
    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Execute a transaction
    ///
    /// On success every effect reaches `storage` through a single
    /// `commit`. On failure nothing is written.
    ///
    /// # Errors
    /// Returns the failure with the fuel consumed up to that point
    pub fn execute(
        &self,
        storage: &mut dyn NcStorage,
        tx: &NanoTransaction,
    ) -> Result<ExecutionReceipt, ExecutionFailure> {
        let outcome = {
            let mut runner = Runner::for_transaction(&self.registry, &self.settings, &*storage, tx);
            match runner.run_transaction(tx) {
                Ok((contract_id, output)) => {
                    let fuel_used = runner.fuel_used();
                    Ok((contract_id, output, fuel_used, runner.finish()))
                }
                Err(e) => {
                    let fuel_used = runner.fuel_used();
                    runner.abort();
                    Err(ExecutionFailure {
                        tx_id: tx.id,
                        error: e,
                        fuel_used,
                    })
                }
            }
        };

        let (contract_id, output, fuel_used, committed) = match outcome {
            Ok(parts) => parts,
            Err(failure) => {
                error!(
                    tx_id = %tx.id,
                    method = tx.method(),
                    fuel_used = failure.fuel_used,
                    error = %failure.error,
                    "Contract execution failed, rolled back"
                );
                return Err(failure);
            }
        };

        let diff_digest = committed.batch.digest();
        if let Err(e) = storage.commit(committed.batch) {
            error!(tx_id = %tx.id, error = %e, "Storage rejected commit");
            return Err(ExecutionFailure {
                tx_id: tx.id,
                error: e.into(),
                fuel_used,
            });
        }

        info!(
            tx_id = %tx.id,
            method = tx.method(),
            fuel_used,
            events = committed.events.len(),
            records = committed.records.len(),
            "Contract execution successful"
        );

        Ok(ExecutionReceipt {
            tx_id: tx.id,
            contract_id,
            output,
            fuel_used,
            events: committed.events,
            records: committed.records,
            outputs: committed.outputs,
            diff_digest,
        })
    }

    /// Run a view method outside of any transaction
    ///
    /// # Errors
    /// Returns the failure of the view
    pub fn call_view_method(
        &self,
        storage: &dyn NcStorage,
        contract_id: ContractId,
        method: &str,
        args: &[u8],
    ) -> NcResult<Vec<u8>> {
        Runner::call_view_method(&self.registry, &self.settings, storage, contract_id, method, args)
    }
}

impl Default for NanoProcessor {
    fn default() -> Self {
        Self::new(RuntimeSettings::default())
    }
}
