//! Blueprint interface and method tables.
//!
//! A blueprint is the code a contract runs. It exposes a fixed table of
//! methods keyed by name; each entry declares whether the method is public
//! or view, which actions it accepts and the handler to run. The runtime
//! never looks methods up any other way.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;

use thiserror::Error;

use super::action::ActionKind;
use super::derive::derive_blueprint_id;
use super::syscall::Env;
use super::NcResult;
use crate::types::BlueprintId;

/// Name of the constructor every blueprint must declare
pub const INITIALIZE_METHOD: &str = "initialize";

/// Handler of a declared method: receives encoded arguments, returns encoded output
pub type MethodHandler = fn(&mut Env<'_, '_>, &[u8]) -> NcResult<Vec<u8>>;

/// Handler for public calls to undeclared methods; receives the requested name
pub type FallbackHandler = fn(&mut Env<'_, '_>, &str, &[u8]) -> NcResult<Vec<u8>>;

/// Public methods may mutate state; view methods may only read
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MethodKind {
    /// State-mutating entry point
    Public,
    /// Read-only query
    View,
}

/// Set of action kinds a method accepts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllowedActions {
    deposit: bool,
    withdrawal: bool,
    grant_authority: bool,
    acquire_authority: bool,
}

impl AllowedActions {
    /// No actions
    pub const NONE: Self = Self {
        deposit: false,
        withdrawal: false,
        grant_authority: false,
        acquire_authority: false,
    };

    /// Every action kind
    pub const ALL: Self = Self {
        deposit: true,
        withdrawal: true,
        grant_authority: true,
        acquire_authority: true,
    };

    /// Deposits only
    pub const DEPOSIT: Self = Self {
        deposit: true,
        ..Self::NONE
    };

    /// Withdrawals only
    pub const WITHDRAWAL: Self = Self {
        withdrawal: true,
        ..Self::NONE
    };

    /// Authority grants only
    pub const GRANT_AUTHORITY: Self = Self {
        grant_authority: true,
        ..Self::NONE
    };

    /// Authority acquisitions only
    pub const ACQUIRE_AUTHORITY: Self = Self {
        acquire_authority: true,
        ..Self::NONE
    };

    /// Check whether `kind` is accepted
    #[must_use]
    pub const fn allows(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Deposit => self.deposit,
            ActionKind::Withdrawal => self.withdrawal,
            ActionKind::GrantAuthority => self.grant_authority,
            ActionKind::AcquireAuthority => self.acquire_authority,
        }
    }
}

impl BitOr for AllowedActions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            deposit: self.deposit || rhs.deposit,
            withdrawal: self.withdrawal || rhs.withdrawal,
            grant_authority: self.grant_authority || rhs.grant_authority,
            acquire_authority: self.acquire_authority || rhs.acquire_authority,
        }
    }
}

/// Declaration of one method
#[derive(Clone, Copy)]
pub struct MethodSpec {
    /// Public or view
    pub kind: MethodKind,
    /// Accepted action kinds
    pub allowed: AllowedActions,
    /// Maximum number of deposit actions per call
    pub max_deposits: usize,
    /// Code to run
    pub handler: MethodHandler,
}

impl MethodSpec {
    /// Public method accepting no actions until [`Self::allow`] is used
    #[must_use]
    pub const fn public(handler: MethodHandler) -> Self {
        Self {
            kind: MethodKind::Public,
            allowed: AllowedActions::NONE,
            max_deposits: usize::MAX,
            handler,
        }
    }

    /// View method; views never accept actions
    #[must_use]
    pub const fn view(handler: MethodHandler) -> Self {
        Self {
            kind: MethodKind::View,
            allowed: AllowedActions::NONE,
            max_deposits: 0,
            handler,
        }
    }

    /// Accept the given action kinds
    #[must_use]
    pub const fn allow(mut self, allowed: AllowedActions) -> Self {
        self.allowed = allowed;
        self
    }

    /// Bound the number of deposits per call
    #[must_use]
    pub const fn max_deposits(mut self, max: usize) -> Self {
        self.max_deposits = max;
        self
    }
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("kind", &self.kind)
            .field("allowed", &self.allowed)
            .field("max_deposits", &self.max_deposits)
            .finish_non_exhaustive()
    }
}

/// Public catch-all for undeclared method names
#[derive(Clone, Copy)]
pub struct FallbackSpec {
    /// Accepted action kinds
    pub allowed: AllowedActions,
    /// Code to run
    pub handler: FallbackHandler,
}

/// Methods of a blueprint, keyed by name
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: BTreeMap<String, MethodSpec>,
    fallback: Option<FallbackSpec>,
}

impl MethodTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the constructor
    #[must_use]
    pub fn initialize(self, spec: MethodSpec) -> Self {
        self.method(INITIALIZE_METHOD, spec)
    }

    /// Declare a method
    #[must_use]
    pub fn method(mut self, name: &str, spec: MethodSpec) -> Self {
        self.methods.insert(name.to_string(), spec);
        self
    }

    /// Declare the public fallback
    #[must_use]
    pub fn fallback(mut self, allowed: AllowedActions, handler: FallbackHandler) -> Self {
        self.fallback = Some(FallbackSpec { allowed, handler });
        self
    }

    /// Look up a declared method
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.get(name)
    }

    /// Fallback, if declared
    #[must_use]
    pub fn fallback_spec(&self) -> Option<&FallbackSpec> {
        self.fallback.as_ref()
    }

    /// Declared method names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

/// Code a contract can be instantiated from.
///
/// Implementations are stateless; contract state lives in storage and is
/// reached through [`Env`].
pub trait Blueprint: Send + Sync {
    /// Stable name; the blueprint id is derived from it
    fn name(&self) -> &'static str;

    /// Method table
    fn methods(&self) -> MethodTable;
}

/// Registry failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Table has no `initialize`
    #[error("blueprint `{0}` does not declare initialize")]
    MissingInitialize(&'static str),
    /// `initialize` declared as view
    #[error("blueprint `{0}` declares initialize as a view method")]
    InitializeNotPublic(&'static str),
    /// Name already registered
    #[error("blueprint `{0}` is already registered")]
    Duplicate(&'static str),
}

struct RegisteredBlueprint {
    name: &'static str,
    methods: MethodTable,
}

/// Blueprints known to the node
///
/// Note: Cannot derive Clone or Debug because method tables hold fn pointers
#[derive(Default)]
pub struct BlueprintRegistry {
    blueprints: BTreeMap<BlueprintId, RegisteredBlueprint>,
}

impl BlueprintRegistry {
    /// Create new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blueprint and return its id
    ///
    /// # Errors
    /// Returns error if the table is malformed or the name is taken
    pub fn register(&mut self, blueprint: &dyn Blueprint) -> Result<BlueprintId, RegistryError> {
        let name = blueprint.name();
        let methods = blueprint.methods();
        match methods.get(INITIALIZE_METHOD) {
            None => return Err(RegistryError::MissingInitialize(name)),
            Some(spec) if spec.kind != MethodKind::Public => {
                return Err(RegistryError::InitializeNotPublic(name))
            }
            Some(_) => {}
        }

        let id = derive_blueprint_id(name);
        if self.blueprints.contains_key(&id) {
            return Err(RegistryError::Duplicate(name));
        }
        self.blueprints
            .insert(id, RegisteredBlueprint { name, methods });
        Ok(id)
    }

    /// Method table of a blueprint
    #[must_use]
    pub fn methods(&self, id: &BlueprintId) -> Option<&MethodTable> {
        self.blueprints.get(id).map(|bp| &bp.methods)
    }

    /// Name of a blueprint
    #[must_use]
    pub fn name(&self, id: &BlueprintId) -> Option<&'static str> {
        self.blueprints.get(id).map(|bp| bp.name)
    }

    /// Check if blueprint exists
    #[must_use]
    pub fn contains(&self, id: &BlueprintId) -> bool {
        self.blueprints.contains_key(id)
    }

    /// Number of registered blueprints
    #[must_use]
    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    /// True when nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}
