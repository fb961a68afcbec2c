//! Index update records.
//!
//! A committed receipt lists what the transaction did to contracts, tokens
//! and authorities so indexers do not have to diff balances themselves.

use serde::{Deserialize, Serialize};

use crate::types::{Amount, BlueprintId, ContractId, TokenUid};

/// One index update, in execution order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexRecord {
    /// A contract was created
    CreateContract {
        /// Blueprint it runs
        blueprint_id: BlueprintId,
        /// New contract
        contract_id: ContractId,
    },
    /// A custom token was created
    CreateToken {
        /// New token
        token_uid: TokenUid,
        /// Initial supply
        amount: Amount,
        /// Ticker
        token_symbol: String,
        /// Name
        token_name: String,
    },
    /// Total supply of a token changed outside of actions (mint, melt, token deposit)
    UpdateTokenBalance {
        /// Token
        token_uid: TokenUid,
        /// Signed change
        amount: i128,
    },
    /// A contract gained authorities
    GrantAuthorities {
        /// Contract
        contract_id: ContractId,
        /// Token
        token_uid: TokenUid,
        /// Mint flag moved
        mint: bool,
        /// Melt flag moved
        melt: bool,
    },
    /// A contract lost authorities
    RevokeAuthorities {
        /// Contract
        contract_id: ContractId,
        /// Token
        token_uid: TokenUid,
        /// Mint flag moved
        mint: bool,
        /// Melt flag moved
        melt: bool,
    },
}

impl IndexRecord {
    /// Render as JSON for the indexing layer
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let record = IndexRecord::CreateContract {
            blueprint_id: BlueprintId::from_bytes([1u8; 32]),
            contract_id: ContractId::from_bytes([2u8; 32]),
        };
        let json = record.to_json();
        assert_eq!(json["type"], "create_contract");
        assert!(json["contract_id"].is_array() || json["contract_id"].is_string());

        let melt = IndexRecord::UpdateTokenBalance {
            token_uid: TokenUid::NATIVE,
            amount: -25,
        };
        assert_eq!(melt.to_json()["amount"], -25);
        assert_eq!(melt.to_json()["type"], "update_token_balance");
    }
}
