//! Current password digest: salted Argon2id.
//!
//! Digests are PHC-formatted strings embedding the algorithm id, parameters,
//! and salt, so verification never needs out-of-band state and never uses
//! string equality.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use rand_core::OsRng;

use super::PasswordError;

/// Create the Argon2 hasher with recommended parameters.
///
/// Parameters:
/// - Memory cost: 64 MB (65536 KiB)
/// - Time cost: 3 iterations
/// - Parallelism: 4 threads
fn create_argon2() -> Argon2<'static> {
    let m_cost = 65536;
    let t_cost = 3;
    let p_cost = 4;

    let params = Params::new(m_cost, t_cost, p_cost, None).expect("valid Argon2 params");
    Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
}

/// Hash a secret with Argon2id under a fresh random salt.
///
/// Two calls on the same secret produce different digests; use
/// [`current_verify`], never equality, to check a secret against a digest.
pub fn current_hash(secret: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = create_argon2();
    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a secret against a stored self-describing digest.
///
/// Parameters and salt come from the parsed digest, not from
/// `create_argon2`, so digests hashed under older parameters keep verifying.
pub fn current_verify(secret: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };

    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}
