//! Call dispatcher and execution context of one transaction.
//!
//! The runner owns everything a transaction mutates: the state overlay with
//! its undo log, the fuel meter and the call stack. Nested calls recurse
//! through [`Runner::call`]; failures propagate unchanged to the root, which
//! either rolls back or commits once. The first failure of the call graph is
//! also latched on the runner, so a blueprint that discards an `Err` still
//! aborts the transaction.

use tracing::{debug, warn};

use super::action::{apply_actions, validate_actions, Action, ActionKind};
use super::blueprint::{
    AllowedActions, BlueprintRegistry, FallbackSpec, MethodKind, MethodSpec, MethodTable,
    INITIALIZE_METHOD,
};
use super::factory;
use super::frame::{CallContext, CallFrame, CallStack, Caller};
use super::fuel::FuelMeter;
use super::state::{Committed, TxState};
use super::storage::NcStorage;
use super::syscall::Env;
use super::transaction::{NanoTransaction, TransactionKind, TxInputs};
use super::{NcError, NcResult};
use crate::config::RuntimeSettings;
use crate::types::{Address, ContractId, Timestamp, TxId};

/// Resolved entry point of a call
#[derive(Clone, Copy)]
pub(crate) enum Target {
    /// Declared method
    Method(MethodSpec),
    /// Public fallback for an undeclared name
    Fallback(FallbackSpec),
}

impl Target {
    fn action_rules(&self) -> (AllowedActions, usize) {
        match self {
            Self::Method(spec) => (spec.allowed, spec.max_deposits),
            Self::Fallback(spec) => (spec.allowed, usize::MAX),
        }
    }
}

/// Find the entry point for `method` called as `kind`
fn resolve(table: &MethodTable, method: &str, kind: MethodKind) -> NcResult<Target> {
    match table.get(method) {
        Some(spec) if spec.kind != kind => Err(NcError::KindMismatch {
            method: method.to_string(),
            requested: kind,
            actual: spec.kind,
        }),
        Some(spec) => Ok(Target::Method(*spec)),
        None => match (kind, table.fallback_spec()) {
            (MethodKind::Public, Some(fallback)) => Ok(Target::Fallback(*fallback)),
            _ => Err(NcError::MethodNotFound(method.to_string())),
        },
    }
}

/// Execution context of one transaction or view query
pub struct Runner<'s> {
    pub(crate) registry: &'s BlueprintRegistry,
    pub(crate) settings: &'s RuntimeSettings,
    pub(crate) state: TxState<'s>,
    pub(crate) fuel: FuelMeter,
    pub(crate) stack: CallStack,
    failed: Option<NcError>,
    read_only: bool,
    origin: Address,
    tx_id: TxId,
    timestamp: Timestamp,
}

impl<'s> Runner<'s> {
    /// Context for executing `tx`
    #[must_use]
    pub fn for_transaction(
        registry: &'s BlueprintRegistry,
        settings: &'s RuntimeSettings,
        storage: &'s dyn NcStorage,
        tx: &NanoTransaction,
    ) -> Self {
        let fuel_limit = tx.fuel_limit.unwrap_or(settings.default_fuel_limit);
        Self {
            registry,
            settings,
            state: TxState::new(storage, tx.inputs.clone()),
            fuel: FuelMeter::new(fuel_limit),
            stack: CallStack::new(settings.max_call_depth, settings.max_call_count),
            failed: None,
            read_only: false,
            origin: tx.caller,
            tx_id: tx.id,
            timestamp: tx.timestamp,
        }
    }

    /// Read-only context for off-chain queries
    #[must_use]
    pub fn for_view(
        registry: &'s BlueprintRegistry,
        settings: &'s RuntimeSettings,
        storage: &'s dyn NcStorage,
    ) -> Self {
        Self {
            registry,
            settings,
            state: TxState::new(storage, TxInputs::default()),
            fuel: FuelMeter::new(settings.view_fuel_limit),
            stack: CallStack::new(settings.max_call_depth, settings.max_call_count),
            failed: None,
            read_only: true,
            origin: Address::ZERO,
            tx_id: TxId::default(),
            timestamp: 0,
        }
    }

    /// Run a view method outside of any transaction
    ///
    /// # Errors
    /// Returns the failure of the view; mutating syscalls fail `MutationInViewContext`
    pub fn call_view_method(
        registry: &'s BlueprintRegistry,
        settings: &'s RuntimeSettings,
        storage: &'s dyn NcStorage,
        contract_id: ContractId,
        method: &str,
        args: &[u8],
    ) -> NcResult<Vec<u8>> {
        let mut runner = Self::for_view(registry, settings, storage);
        let result = runner.call(MethodKind::View, contract_id, method, args, Vec::new());
        runner.settle(result)
    }

    /// Execute the root call of `tx`
    ///
    /// Returns the created contract (for `Create`) and the root output.
    ///
    /// # Errors
    /// Returns the first failure anywhere in the call graph
    pub fn run_transaction(&mut self, tx: &NanoTransaction) -> NcResult<(Option<ContractId>, Vec<u8>)> {
        let result = match &tx.kind {
            TransactionKind::Create { blueprint_id } => {
                let contract_id = ContractId::from(tx.id);
                factory::instantiate(
                    self,
                    Caller::Address(tx.caller),
                    contract_id,
                    *blueprint_id,
                    &tx.args,
                    tx.actions.clone(),
                )
                .map(|output| (Some(contract_id), output))
            }
            TransactionKind::Call {
                contract_id,
                method,
            } => self
                .call(
                    MethodKind::Public,
                    *contract_id,
                    method,
                    &tx.args,
                    tx.actions.clone(),
                )
                .map(|output| (None, output)),
        };
        self.settle(result)
    }

    /// Replace the root result with the first latched failure, if any
    fn settle<T>(&mut self, result: NcResult<T>) -> NcResult<T> {
        match self.failed.take() {
            Some(first) => {
                if result.is_ok() {
                    warn!(error = %first, "Discarded failure in call graph, aborting");
                }
                Err(first)
            }
            None => result,
        }
    }

    /// Latch the first failure seen anywhere in the call graph
    pub(crate) fn latch<T>(&mut self, result: NcResult<T>) -> NcResult<T> {
        if let Err(e) = &result {
            if self.failed.is_none() {
                self.failed = Some(e.clone());
            }
        }
        result
    }

    /// Dispatch a call to `method` of `contract_id`
    ///
    /// # Errors
    /// Returns a dispatch failure or the callee's failure
    pub fn call(
        &mut self,
        kind: MethodKind,
        contract_id: ContractId,
        method: &str,
        args: &[u8],
        actions: Vec<Action>,
    ) -> NcResult<Vec<u8>> {
        let result = self.dispatch(kind, contract_id, method, args, actions);
        self.latch(result)
    }

    fn dispatch(
        &mut self,
        kind: MethodKind,
        contract_id: ContractId,
        method: &str,
        args: &[u8],
        actions: Vec<Action>,
    ) -> NcResult<Vec<u8>> {
        self.stack.ensure_capacity()?;

        if let Some(current) = self.stack.current() {
            if kind == MethodKind::Public && current.kind == MethodKind::View {
                return Err(NcError::ViewCannotCallPublic {
                    method: method.to_string(),
                });
            }
            if current.contract_id == contract_id {
                return Err(NcError::NoSelfCall(contract_id));
            }
        }
        if kind == MethodKind::Public && self.stack.contains(&contract_id) {
            return Err(NcError::ReentrancyDisallowed(contract_id));
        }

        let record = self
            .state
            .contract(&contract_id)?
            .ok_or(NcError::ContractNotFound(contract_id))?;
        if self.state.is_initializing(&contract_id) {
            return Err(NcError::ContractNotInitialized(contract_id));
        }
        if method == INITIALIZE_METHOD {
            return Err(NcError::CannotReinitialize(contract_id));
        }

        let registry = self.registry;
        let table = registry
            .methods(&record.blueprint_id)
            .ok_or(NcError::BlueprintNotFound(record.blueprint_id))?;
        let target = resolve(table, method, kind)?;

        if kind == MethodKind::View && !actions.is_empty() {
            return Err(NcError::MutationInViewContext("actions attached to a view call"));
        }

        let frame = CallFrame {
            caller: self.current_caller(),
            contract_id,
            blueprint_id: record.blueprint_id,
            method: method.to_string(),
            kind,
            actions,
            entry_authorities: Vec::new(),
        };
        self.run_frame(frame, target, args)
    }

    /// Charge, apply actions, push `frame`, run the handler and pop
    pub(crate) fn run_frame(&mut self, mut frame: CallFrame, target: Target, args: &[u8]) -> NcResult<Vec<u8>> {
        self.stack.ensure_capacity()?;
        self.fuel.charge(self.settings.fuel.call)?;

        let (allowed, max_deposits) = target.action_rules();
        validate_actions(&frame.actions, allowed, max_deposits)?;
        self.fuel
            .charge(self.settings.fuel.actions(frame.actions.len()))?;
        for action in &frame.actions {
            if matches!(action.kind(), ActionKind::GrantAuthority | ActionKind::AcquireAuthority) {
                let token = action.token();
                let held = self.state.balance(&frame.contract_id, &token)?.authorities;
                frame.entry_authorities.push((token, held));
            }
        }
        apply_actions(&mut self.state, &frame.caller, frame.contract_id, &frame.actions)?;

        debug!(
            contract_id = %frame.contract_id,
            method = %frame.method,
            kind = ?frame.kind,
            depth = self.stack.depth(),
            fuel_remaining = self.fuel.remaining(),
            "Dispatching contract call"
        );

        let method = frame.method.clone();
        self.stack.push(frame)?;
        let result = {
            let mut env = Env::new(self);
            match target {
                Target::Method(spec) => (spec.handler)(&mut env, args),
                Target::Fallback(spec) => (spec.handler)(&mut env, &method, args),
            }
        };
        self.stack.pop();
        result
    }

    /// Caller seen by a call made now
    pub(crate) fn current_caller(&self) -> Caller {
        self.stack
            .current()
            .map_or(Caller::Address(self.origin), |frame| {
                Caller::Contract(frame.contract_id)
            })
    }

    /// Innermost frame
    ///
    /// # Errors
    /// Returns `Fail` outside of any frame, which blueprint code cannot reach
    pub(crate) fn frame(&self) -> NcResult<&CallFrame> {
        self.stack
            .current()
            .ok_or_else(|| NcError::fail("no active call frame"))
    }

    /// Context of the innermost frame
    pub(crate) fn context(&self) -> NcResult<CallContext> {
        let frame = self.frame()?;
        Ok(CallContext {
            caller: frame.caller,
            contract_id: frame.contract_id,
            blueprint_id: frame.blueprint_id,
            actions: frame.actions.clone(),
            tx_id: self.tx_id,
            timestamp: self.timestamp,
        })
    }

    /// Fail unless the innermost frame may mutate state
    pub(crate) fn ensure_mutable(&self, operation: &'static str) -> NcResult<()> {
        if self.read_only || self.frame()?.kind == MethodKind::View {
            return Err(NcError::MutationInViewContext(operation));
        }
        Ok(())
    }

    /// Fuel consumed so far
    #[must_use]
    pub fn fuel_used(&self) -> u64 {
        self.fuel.used()
    }

    /// Calls dispatched so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.stack.call_count()
    }

    /// Discard the undo log and hand back the transaction's effects
    #[must_use]
    pub fn finish(self) -> Committed {
        self.state.commit()
    }

    /// Replay the undo log
    pub fn abort(&mut self) {
        self.state.rollback();
    }
}
