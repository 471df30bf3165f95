//! Password hashing strategies for authgate.
//!
//! Two algorithm versions coexist so deployments can migrate stored hashes
//! without forcing a password reset: the legacy deterministic digest chain
//! and the current salted Argon2id scheme. Call sites select a strategy
//! through [`Algorithm`] instead of branching on digest formats themselves.

mod current;
mod legacy;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

pub use current::{current_hash, current_verify};
pub use legacy::{legacy_hash, legacy_verify};

/// Password hashing errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    HashError(String),

    /// Stored digest is not in the expected self-describing format.
    #[error("invalid password hash format")]
    InvalidHash,
}

/// Hash algorithm version governing new digest creation.
///
/// Verification may still consult the other strategy during a migration
/// window; this value only selects how fresh digests are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Deterministic hex(SHA1(hex(MD5))) chain.
    Legacy,
    /// Salted Argon2id, self-describing PHC string.
    #[default]
    Current,
}

impl Algorithm {
    /// Convert algorithm to its configuration string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Legacy => "legacy",
            Algorithm::Current => "current",
        }
    }

    /// Produce a digest of `secret` under this algorithm.
    ///
    /// The current strategy salts every call, so two digests of the same
    /// secret differ; the legacy strategy is deterministic.
    pub fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        match self {
            Algorithm::Legacy => Ok(legacy_hash(secret)),
            Algorithm::Current => current_hash(secret),
        }
    }

    /// Verify `secret` against a stored digest produced by this algorithm.
    pub fn verify(&self, secret: &str, digest: &str) -> bool {
        match self {
            Algorithm::Legacy => legacy_verify(secret, digest),
            Algorithm::Current => current_verify(secret, digest),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" => Ok(Algorithm::Legacy),
            "current" => Ok(Algorithm::Current),
            _ => Err(format!("unknown algorithm version: {s}")),
        }
    }
}
