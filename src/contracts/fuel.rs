//! Fuel metering.
//!
//! One meter is created per top-level transaction (or per off-chain view
//! query) and shared by every frame of its call graph. Fuel only goes down.
//! Spent fuel is never refunded, not even when the transaction rolls back.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when an operation costs more than what is left
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("out of fuel: operation needs {needed}, {remaining} remaining")]
pub struct OutOfFuel {
    /// Cost of the rejected operation
    pub needed: u64,
    /// Fuel left when it was rejected
    pub remaining: u64,
}

/// Monotonically decreasing fuel budget
#[derive(Clone, Debug)]
pub struct FuelMeter {
    limit: u64,
    remaining: u64,
}

impl FuelMeter {
    /// Start a meter with the full budget available
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
        }
    }

    /// Consume `cost` units.
    ///
    /// On failure nothing is consumed; the caller aborts the transaction.
    pub fn charge(&mut self, cost: u64) -> Result<(), OutOfFuel> {
        match self.remaining.checked_sub(cost) {
            Some(left) => {
                self.remaining = left;
                Ok(())
            }
            None => Err(OutOfFuel {
                needed: cost,
                remaining: self.remaining,
            }),
        }
    }

    /// Fuel still available
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Fuel consumed so far
    #[must_use]
    pub const fn used(&self) -> u64 {
        self.limit - self.remaining
    }

    /// Initial budget
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }
}

/// Cost schedule for runtime operations.
///
/// Values are tunable; none of the runtime's correctness properties depend
/// on them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelCosts {
    /// Dispatching a public or view call
    pub call: u64,
    /// Applying one action
    pub action: u64,
    /// Reading a state entry
    pub state_read_base: u64,
    /// Per byte of value read
    pub state_read_per_byte: u64,
    /// Writing or deleting a state entry
    pub state_write_base: u64,
    /// Per byte of key and value written
    pub state_write_per_byte: u64,
    /// Deriving a contract id or token uid
    pub derive: u64,
    /// Creating a contract, on top of derivation and dispatch
    pub create_contract: u64,
    /// Creating a token, on top of derivation
    pub create_token: u64,
    /// Minting or melting
    pub mint_melt: u64,
    /// Reading a balance or authority flag
    pub balance_read: u64,
    /// Emitting an event
    pub event_base: u64,
    /// Per byte of event payload
    pub event_per_byte: u64,
}

impl Default for FuelCosts {
    fn default() -> Self {
        Self {
            call: 500,
            action: 100,
            state_read_base: 20,
            state_read_per_byte: 1,
            state_write_base: 100,
            state_write_per_byte: 2,
            derive: 60,
            create_contract: 2_000,
            create_token: 1_000,
            mint_melt: 200,
            balance_read: 10,
            event_base: 50,
            event_per_byte: 1,
        }
    }
}

impl FuelCosts {
    /// Cost of reading a value of `len` bytes
    #[must_use]
    pub fn state_read(&self, len: usize) -> u64 {
        proportional(self.state_read_base, self.state_read_per_byte, len)
    }

    /// Cost of writing `len` bytes of key plus value
    #[must_use]
    pub fn state_write(&self, len: usize) -> u64 {
        proportional(self.state_write_base, self.state_write_per_byte, len)
    }

    /// Cost of an event with a `len`-byte payload
    #[must_use]
    pub fn event(&self, len: usize) -> u64 {
        proportional(self.event_base, self.event_per_byte, len)
    }

    /// Cost of applying `count` actions
    #[must_use]
    pub fn actions(&self, count: usize) -> u64 {
        self.action.saturating_mul(count as u64)
    }
}

fn proportional(base: u64, per_byte: u64, len: usize) -> u64 {
    base.saturating_add(per_byte.saturating_mul(len as u64))
}
