//! Deterministic identity derivation.
//!
//! Every derived identity is SHA-256d over a domain tag followed by the
//! inputs. Ids are written as raw 32 bytes; variable-length fields are
//! prefixed with their length as u32 LE, so `("ab", "c")` and `("a", "bc")`
//! never encode to the same preimage.

use crate::crypto::sha256d;
use crate::types::{BlueprintId, ContractId, TokenUid};

const CONTRACT_TAG: &[u8] = b"nc-contract-id:v1";
const TOKEN_TAG: &[u8] = b"nc-token-uid:v1";
const BLUEPRINT_TAG: &[u8] = b"nc-native-blueprint:v1";

/// Little-endian u32 length prefix
///
/// Lengths above `u32::MAX` saturate; no salt, symbol, name, key or value
/// of a ledger transaction comes near that size.
pub(crate) fn len_prefix(len: usize) -> [u8; 4] {
    u32::try_from(len).unwrap_or(u32::MAX).to_le_bytes()
}

struct Preimage(Vec<u8>);

impl Preimage {
    fn new(tag: &[u8]) -> Self {
        let mut preimage = Self(Vec::with_capacity(128));
        preimage.var(tag);
        preimage
    }

    fn fixed(&mut self, bytes: &[u8; 32]) -> &mut Self {
        self.0.extend_from_slice(bytes);
        self
    }

    fn var(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.extend_from_slice(&len_prefix(bytes.len()));
        self.0.extend_from_slice(bytes);
        self
    }
}

/// Id of the contract `parent` creates from `blueprint` with `salt`
#[must_use]
pub fn derive_contract_id(parent: &ContractId, salt: &[u8], blueprint: &BlueprintId) -> ContractId {
    let mut preimage = Preimage::new(CONTRACT_TAG);
    preimage
        .fixed(parent.as_bytes())
        .var(salt)
        .fixed(blueprint.as_bytes());
    ContractId::from_hash(sha256d(&preimage.0))
}

/// Uid of the token `parent` issues under `symbol`
#[must_use]
pub fn derive_token_id(parent: &ContractId, symbol: &str) -> TokenUid {
    let mut preimage = Preimage::new(TOKEN_TAG);
    preimage.fixed(parent.as_bytes()).var(symbol.as_bytes());
    TokenUid::from_hash(sha256d(&preimage.0))
}

/// Id of a blueprint compiled into the node under `name`
#[must_use]
pub fn derive_blueprint_id(name: &str) -> BlueprintId {
    let mut preimage = Preimage::new(BLUEPRINT_TAG);
    preimage.var(name.as_bytes());
    BlueprintId::from_hash(sha256d(&preimage.0))
}
