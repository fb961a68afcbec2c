//! 32-byte digests.
//!
//! Two hash functions are in use:
//! - SHA-256d for every identity the ledger derives (transaction ids,
//!   contract ids, token uids, blueprint ids)
//! - BLAKE3 for internal digests such as the committed write batch digest

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::{CryptoError, CryptoResult};

/// Size of every digest in bytes
pub const HASH_SIZE: usize = 32;

/// A 32-byte digest
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// All-zero digest
    pub const ZERO: Self = Self([0u8; HASH_SIZE]);

    /// Wrap raw bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Lowercase hex, no prefix
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex (with or without `0x` prefix)
    ///
    /// # Errors
    /// Returns error if hex is invalid or not 32 bytes long
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHash(e.to_string()))?;
        let arr: [u8; HASH_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::InvalidHash(format!("expected {HASH_SIZE} bytes, got {}", b.len()))
        })?;
        Ok(Self(arr))
    }

    /// Check for the all-zero digest
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_SIZE]
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Double SHA-256 of `data`
#[must_use]
pub fn sha256d(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    Hash(Sha256::digest(first).into())
}

/// Incremental BLAKE3 hasher
#[derive(Default)]
pub struct Hasher(blake3::Hasher);

impl Hasher {
    /// Fresh hasher
    #[must_use]
    pub fn new() -> Self {
        Self(blake3::Hasher::new())
    }

    /// Feed bytes
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.0.update(data);
        self
    }

    /// Finish and return the digest
    #[must_use]
    pub fn finalize(&self) -> Hash {
        Hash(*self.0.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let h = sha256d(b"ledger");
        assert_eq!(Hash::from_hex(&h.to_hex()).unwrap(), h);
        assert_eq!(Hash::from_hex(&format!("0x{}", h.to_hex())).unwrap(), h);
    }

    #[test]
    fn test_from_hex_rejects_wrong_length() {
        assert!(Hash::from_hex("abcd").is_err());
        assert!(Hash::from_hex("zz").is_err());
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let mut hasher = Hasher::new();
        hasher.update(b"hello ").update(b"world");
        assert_eq!(hasher.finalize().as_bytes(), blake3::hash(b"hello world").as_bytes());
    }

    #[test]
    fn test_sha256d_differs_from_blake3() {
        assert_ne!(sha256d(b"x").as_bytes(), blake3::hash(b"x").as_bytes());
        assert!(!sha256d(b"x").is_zero());
    }
}
