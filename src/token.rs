//! Portable encrypted login tokens for authgate.
//!
//! A login token carries a minimal identity claim (primary key, username,
//! and a salted re-hash of the stored password hash) encrypted with
//! AES-256-CTR under a process-wide key. The key is lazily generated once
//! and persisted to a private file, so tokens stay redeemable across
//! restarts. Each token gets its own random 16-byte IV, carried alongside
//! the ciphertext and an HMAC-SHA256 tag over both. CTR by itself is
//! malleable, so the tag is what rejects a modified ciphertext.

use std::fs;
use std::path::{Path, PathBuf};

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes256;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ctr::Ctr128BE;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

type Aes256Ctr = Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Key length for AES-256, in bytes.
const KEY_LEN: usize = 32;

/// IV length for the CTR cipher, in bytes.
const IV_LEN: usize = 16;

/// Token errors.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Token is malformed, tampered with, or encrypted under another key.
    ///
    /// Distinct from a normal wrong-credential outcome: an undecryptable
    /// token indicates corruption, not a user typing the wrong password.
    #[error("invalid login token")]
    Invalid,

    /// Key-material file could not be read or written.
    #[error("key file error: {0}")]
    Key(#[from] std::io::Error),

    /// Key-material file exists but does not hold a usable key.
    #[error("corrupt key file: {0}")]
    CorruptKey(String),
}

/// Identity claim sealed inside a login token.
///
/// `verifier` is a fresh salted hash of the record's stored password hash;
/// the raw stored hash itself is never placed in a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaim {
    /// Primary-key value of the record.
    pub id: Value,
    /// Username of the record.
    pub username: String,
    /// Salted re-hash of the stored password hash.
    pub verifier: String,
}

/// An opaque, transportable login token: text-encoded IV, ciphertext, and
/// authentication tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginToken {
    /// Hex-encoded 16-byte initialization vector, unique per token.
    pub iv: String,
    /// Base64-encoded AES-256-CTR ciphertext of the serialized claim.
    pub data: String,
    /// Hex-encoded HMAC-SHA256 tag over the IV and ciphertext bytes.
    pub mac: String,
}

/// Process-wide token-encryption key, persisted to a private file.
#[derive(Debug, Clone)]
pub struct KeyFile {
    path: PathBuf,
}

impl KeyFile {
    /// Create a key handle for the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the key-material file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the key, generating and persisting it on first use.
    ///
    /// Known risk: concurrent first-time initialization by multiple workers
    /// is unguarded; writes are last-writer-wins, so two workers racing here
    /// can briefly hold different keys. Deployments that care must create
    /// the file before forking workers.
    pub fn load_or_generate(&self) -> Result<[u8; KEY_LEN], TokenError> {
        if self.path.exists() {
            let text = fs::read_to_string(&self.path)?;
            let bytes = hex::decode(text.trim())
                .map_err(|e| TokenError::CorruptKey(e.to_string()))?;
            let key: [u8; KEY_LEN] = bytes
                .try_into()
                .map_err(|_| TokenError::CorruptKey("wrong key length".to_string()))?;
            return Ok(key);
        }

        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, hex::encode(key))?;
        debug!(path = %self.path.display(), "generated token encryption key");
        Ok(key)
    }
}

/// Seals identity claims into login tokens and opens them back up.
#[derive(Debug, Clone)]
pub struct TokenSealer {
    key: [u8; KEY_LEN],
}

impl TokenSealer {
    /// Create a sealer from loaded key material.
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Create a sealer backed by a key file, generating the key on first use.
    pub fn from_key_file(key_file: &KeyFile) -> Result<Self, TokenError> {
        Ok(Self::new(key_file.load_or_generate()?))
    }

    /// HMAC over the IV and ciphertext, keyed by the token key.
    fn tag(&self, iv: &[u8], ciphertext: &[u8]) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC-SHA256 takes any key length");
        mac.update(iv);
        mac.update(ciphertext);
        mac
    }

    /// Encrypt a claim into a portable token under a fresh IV.
    pub fn seal(&self, claim: &TokenClaim) -> Result<LoginToken, TokenError> {
        let mut buf = serde_json::to_vec(claim).map_err(|_| TokenError::Invalid)?;

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut cipher = Aes256Ctr::new(&self.key.into(), &iv.into());
        cipher.apply_keystream(&mut buf);

        let mac = self.tag(&iv, &buf).finalize().into_bytes();

        Ok(LoginToken {
            iv: hex::encode(iv),
            data: BASE64.encode(buf),
            mac: hex::encode(mac),
        })
    }

    /// Decrypt a token back into its claim.
    ///
    /// The tag is checked before decryption, so a single flipped bit
    /// anywhere in the IV, ciphertext, or tag fails here. Any failure (bad
    /// encoding, mismatched tag, ciphertext that does not decrypt to a
    /// parseable claim) is reported as [`TokenError::Invalid`].
    pub fn open(&self, token: &LoginToken) -> Result<TokenClaim, TokenError> {
        let iv_bytes = hex::decode(&token.iv).map_err(|_| TokenError::Invalid)?;
        let iv: [u8; IV_LEN] = iv_bytes.try_into().map_err(|_| TokenError::Invalid)?;

        let mut buf = BASE64.decode(&token.data).map_err(|_| TokenError::Invalid)?;

        let mac_bytes = hex::decode(&token.mac).map_err(|_| TokenError::Invalid)?;
        self.tag(&iv, &buf)
            .verify_slice(&mac_bytes)
            .map_err(|_| TokenError::Invalid)?;

        let mut cipher = Aes256Ctr::new(&self.key.into(), &iv.into());
        cipher.apply_keystream(&mut buf);

        serde_json::from_slice(&buf).map_err(|_| TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealer() -> TokenSealer {
        TokenSealer::new([7u8; KEY_LEN])
    }

    fn claim() -> TokenClaim {
        TokenClaim {
            id: Value::from(7),
            username: "ana".to_string(),
            verifier: "$argon2id$fake".to_string(),
        }
    }

    #[test]
    fn test_seal_open_round_trip() {
        let sealer = sealer();
        let token = sealer.seal(&claim()).unwrap();
        let opened = sealer.open(&token).unwrap();

        assert_eq!(opened.id, Value::from(7));
        assert_eq!(opened.username, "ana");
        assert_eq!(opened.verifier, "$argon2id$fake");
    }

    #[test]
    fn test_fresh_iv_per_seal() {
        let sealer = sealer();
        let first = sealer.seal(&claim()).unwrap();
        let second = sealer.seal(&claim()).unwrap();

        assert_ne!(first.iv, second.iv);
        // Same plaintext, different IV, different ciphertext.
        assert_ne!(first.data, second.data);
    }

    #[test]
    fn test_iv_is_sixteen_bytes_hex() {
        let token = sealer().seal(&claim()).unwrap();
        assert_eq!(hex::decode(&token.iv).unwrap().len(), IV_LEN);
    }

    #[test]
    fn test_tampered_ciphertext_is_invalid() {
        let sealer = sealer();
        let token = sealer.seal(&claim()).unwrap();

        let mut raw = BASE64.decode(&token.data).unwrap();
        raw[0] ^= 0xff;
        let tampered = LoginToken {
            iv: token.iv.clone(),
            data: BASE64.encode(raw),
            mac: token.mac.clone(),
        };

        assert!(matches!(sealer.open(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_single_bit_flip_mid_ciphertext_is_invalid() {
        // CTR decrypts any ciphertext; the tag is what must catch a flip
        // that would otherwise land inside a still-parseable claim.
        let sealer = sealer();
        let token = sealer.seal(&claim()).unwrap();

        let mut raw = BASE64.decode(&token.data).unwrap();
        let middle = raw.len() / 2;
        raw[middle] ^= 0x01;
        let tampered = LoginToken {
            iv: token.iv.clone(),
            data: BASE64.encode(raw),
            mac: token.mac.clone(),
        };

        assert!(matches!(sealer.open(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_tampered_tag_is_invalid() {
        let sealer = sealer();
        let token = sealer.seal(&claim()).unwrap();

        let mut mac_bytes = hex::decode(&token.mac).unwrap();
        mac_bytes[0] ^= 0x01;
        let tampered = LoginToken {
            iv: token.iv.clone(),
            data: token.data.clone(),
            mac: hex::encode(mac_bytes),
        };

        assert!(matches!(sealer.open(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_tampered_iv_is_invalid() {
        let sealer = sealer();
        let token = sealer.seal(&claim()).unwrap();

        let mut iv_bytes = hex::decode(&token.iv).unwrap();
        iv_bytes[0] ^= 0x01;
        let tampered = LoginToken {
            iv: hex::encode(iv_bytes),
            data: token.data.clone(),
            mac: token.mac.clone(),
        };

        assert!(matches!(sealer.open(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_wrong_key_is_invalid() {
        let token = sealer().seal(&claim()).unwrap();
        let other = TokenSealer::new([8u8; KEY_LEN]);
        assert!(matches!(other.open(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_garbage_encodings_are_invalid() {
        let sealer = sealer();
        let mac = hex::encode([0u8; 32]);

        let bad_iv = LoginToken {
            iv: "zz".to_string(),
            data: BASE64.encode(b"junk"),
            mac: mac.clone(),
        };
        assert!(matches!(sealer.open(&bad_iv), Err(TokenError::Invalid)));

        let short_iv = LoginToken {
            iv: hex::encode([0u8; 4]),
            data: BASE64.encode(b"junk"),
            mac: mac.clone(),
        };
        assert!(matches!(sealer.open(&short_iv), Err(TokenError::Invalid)));

        let bad_data = LoginToken {
            iv: hex::encode([0u8; IV_LEN]),
            data: "not base64 !!!".to_string(),
            mac: mac.clone(),
        };
        assert!(matches!(sealer.open(&bad_data), Err(TokenError::Invalid)));

        let bad_mac = LoginToken {
            iv: hex::encode([0u8; IV_LEN]),
            data: BASE64.encode(b"junk"),
            mac: "not hex".to_string(),
        };
        assert!(matches!(sealer.open(&bad_mac), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_key_file_generate_and_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = KeyFile::new(dir.path().join("token.key"));

        let first = key_file.load_or_generate().unwrap();
        let second = key_file.load_or_generate().unwrap();
        assert_eq!(first, second);

        // Tokens sealed before a restart open after it.
        let token = TokenSealer::new(first).seal(&claim()).unwrap();
        let reloaded = TokenSealer::from_key_file(&key_file).unwrap();
        assert!(reloaded.open(&token).is_ok());
    }

    #[test]
    fn test_key_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = KeyFile::new(dir.path().join("private/keys/token.key"));
        key_file.load_or_generate().unwrap();
        assert!(key_file.path().exists());
    }

    #[test]
    fn test_key_file_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.key");
        fs::write(&path, "deadbeef").unwrap(); // too short

        let result = KeyFile::new(&path).load_or_generate();
        assert!(matches!(result, Err(TokenError::CorruptKey(_))));
    }
}
