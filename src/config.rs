//! Runtime settings.
//!
//! Settings can be loaded from TOML so operators can tune limits and the
//! fuel schedule per network. Every field has a default; a TOML file only
//! needs the values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contracts::fuel::FuelCosts;

/// Maximum nesting of contract calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;

/// Maximum number of calls in one transaction
pub const DEFAULT_MAX_CALL_COUNT: usize = 250;

/// Default fuel for a transaction that does not declare a budget
pub const DEFAULT_FUEL_LIMIT: u64 = 1_000_000;

/// Fuel granted to off-chain view queries
pub const DEFAULT_VIEW_FUEL_LIMIT: u64 = 250_000;

/// Native deposit required per unit of custom token, in basis points (1%)
pub const DEFAULT_TOKEN_DEPOSIT_BP: u64 = 100;

/// Ticker of the native token
pub const DEFAULT_NATIVE_SYMBOL: &str = "HTR";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    /// TOML did not parse
    #[error("failed to parse settings: {0}")]
    Parse(String),
    /// A value is out of range
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Limits and cost schedule for the execution runtime
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Maximum call-stack depth
    pub max_call_depth: usize,
    /// Maximum calls (including nested ones and contract creations) per transaction
    pub max_call_count: usize,
    /// Budget used when a transaction does not declare one
    pub default_fuel_limit: u64,
    /// Budget for off-chain view queries
    pub view_fuel_limit: u64,
    /// Native deposit for custom tokens, in basis points of the amount
    pub token_deposit_bp: u64,
    /// Symbol reserved for the native token
    pub native_symbol: String,
    /// Fuel cost schedule
    pub fuel: FuelCosts,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_call_count: DEFAULT_MAX_CALL_COUNT,
            default_fuel_limit: DEFAULT_FUEL_LIMIT,
            view_fuel_limit: DEFAULT_VIEW_FUEL_LIMIT,
            token_deposit_bp: DEFAULT_TOKEN_DEPOSIT_BP,
            native_symbol: DEFAULT_NATIVE_SYMBOL.to_string(),
            fuel: FuelCosts::default(),
        }
    }
}

impl RuntimeSettings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject settings the runtime cannot operate with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_call_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_call_count == 0 {
            return Err(ConfigError::Invalid {
                field: "max_call_count",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.token_deposit_bp > 10_000 {
            return Err(ConfigError::Invalid {
                field: "token_deposit_bp",
                reason: format!("{} exceeds 10000 (100%)", self.token_deposit_bp),
            });
        }
        if self.native_symbol.is_empty() {
            return Err(ConfigError::Invalid {
                field: "native_symbol",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Native units locked when `amount` custom tokens are created or minted
    #[must_use]
    pub fn token_deposit(&self, amount: u64) -> u64 {
        let scaled = u128::from(amount) * u128::from(self.token_deposit_bp);
        u64::try_from(scaled.div_ceil(10_000)).unwrap_or(u64::MAX)
    }

    /// Native units released when `amount` custom tokens are melted
    #[must_use]
    pub fn token_withdraw(&self, amount: u64) -> u64 {
        let scaled = u128::from(amount) * u128::from(self.token_deposit_bp);
        u64::try_from(scaled / 10_000).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_roundtrip() {
        let settings = RuntimeSettings::default();
        let serialized = settings.to_toml_string().unwrap();
        let parsed = RuntimeSettings::from_toml_str(&serialized).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = RuntimeSettings::from_toml_str(
            "max_call_depth = 8\n\n[fuel]\ncall = 1\n",
        )
        .unwrap();
        assert_eq!(parsed.max_call_depth, 8);
        assert_eq!(parsed.fuel.call, 1);
        assert_eq!(parsed.fuel.action, FuelCosts::default().action);
        assert_eq!(parsed.native_symbol, DEFAULT_NATIVE_SYMBOL);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            RuntimeSettings::from_toml_str("max_call_depth = 0"),
            Err(ConfigError::Invalid { field: "max_call_depth", .. })
        ));
        assert!(matches!(
            RuntimeSettings::from_toml_str("token_deposit_bp = 10001"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            RuntimeSettings::from_toml_str("max_call_depth = \"deep\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("nc-settings-{}.toml", std::process::id()));
        std::fs::write(&path, "token_deposit_bp = 250\nnative_symbol = \"TNT\"\n").unwrap();
        let loaded = RuntimeSettings::load_from_file(&path);
        std::fs::remove_file(&path).unwrap();

        let loaded = loaded.unwrap();
        assert_eq!(loaded.token_deposit_bp, 250);
        assert_eq!(loaded.native_symbol, "TNT");
        assert_eq!(loaded.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("nc-settings-missing/none.toml");
        assert!(matches!(
            RuntimeSettings::load_from_file(&path),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_token_deposit_rounding() {
        let settings = RuntimeSettings::default();
        assert_eq!(settings.token_deposit(10_000), 100);
        assert_eq!(settings.token_deposit(1), 1);
        assert_eq!(settings.token_withdraw(1), 0);
        assert_eq!(settings.token_withdraw(250), 2);

        let free = RuntimeSettings {
            token_deposit_bp: 0,
            ..RuntimeSettings::default()
        };
        assert_eq!(free.token_deposit(10_000), 0);

        let unchecked = RuntimeSettings {
            token_deposit_bp: 20_000,
            ..RuntimeSettings::default()
        };
        assert_eq!(unchecked.token_deposit(u64::MAX), u64::MAX);
    }
}
