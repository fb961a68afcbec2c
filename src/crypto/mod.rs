//! Cryptographic primitives.
//!
//! - SHA-256d for ledger identities (transactions, contracts, tokens, blueprints)
//! - BLAKE3 for fast internal digests

mod hash;

pub use hash::{sha256d, Hash, Hasher, HASH_SIZE};

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid hash format
    #[error("invalid hash: {0}")]
    InvalidHash(String),
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;
