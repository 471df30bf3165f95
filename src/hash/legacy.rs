//! Legacy password digest: hex(SHA1(hex(MD5(secret)))).
//!
//! Deterministic and unsalted. Kept only so existing stored digests keep
//! verifying during the migration window; new digests always come from the
//! current strategy.

use md5::Md5;
use sha1::{Digest, Sha1};

/// Compute the legacy digest of a secret.
pub fn legacy_hash(secret: &str) -> String {
    let inner = hex::encode(Md5::digest(secret.as_bytes()));
    hex::encode(Sha1::digest(inner.as_bytes()))
}

/// Verify a secret against a stored legacy digest.
///
/// Recomputes the chain and compares; the digest carries no parameters.
pub fn legacy_verify(secret: &str, digest: &str) -> bool {
    legacy_hash(secret) == digest
}
