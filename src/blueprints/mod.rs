//! Blueprints shipped with the node.
//!
//! They are ordinary blueprints: everything they do goes through the
//! syscall surface, so they double as reference users of the runtime.

pub mod faucet;
pub mod token_manager;

use crate::contracts::{BlueprintRegistry, RegistryError};
use crate::types::BlueprintId;

pub use faucet::{Faucet, FaucetInit};
pub use token_manager::{SpawnFaucet, TokenManager, TokenManagerInit};

/// Ids of the shipped blueprints
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeBlueprints {
    /// [`Faucet`]
    pub faucet: BlueprintId,
    /// [`TokenManager`]
    pub token_manager: BlueprintId,
}

/// Register every shipped blueprint
///
/// # Errors
/// Returns error if one of them is already registered
pub fn register_natives(registry: &mut BlueprintRegistry) -> Result<NativeBlueprints, RegistryError> {
    Ok(NativeBlueprints {
        faucet: registry.register(&Faucet)?,
        token_manager: registry.register(&TokenManager)?,
    })
}
