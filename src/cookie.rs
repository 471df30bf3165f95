//! Remember-me cookie handling for authgate.
//!
//! A remembered login is a pair of long-lived cookies: an identifier cookie
//! holding the record's primary-key value, and a verifier cookie holding a
//! fresh salted hash of the record's *stored password hash*. The raw stored
//! hash never leaves the server; the verifier is a hash of a hash, recomputed
//! at every issuance so it cannot outlive a password change.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::hash::{current_hash, current_verify, PasswordError};
use crate::session::AuthNamespace;

/// Fixed lifetime of the remember pair: 90 days from issuance.
///
/// There is no sliding renewal; restoring a session from the pair does not
/// re-issue it.
pub const REMEMBER_TTL_DAYS: i64 = 90;

/// Client-side cookie I/O, as exposed by the surrounding request layer.
pub trait CookieJar {
    /// Set a cookie with an absolute expiry time.
    fn set(&self, name: &str, value: &str, expires: DateTime<Utc>);

    /// Read a cookie value.
    fn get(&self, name: &str) -> Option<String>;

    /// Expire and remove a cookie.
    fn clear(&self, name: &str);
}

/// In-memory cookie jar for tests and non-HTTP embedders.
#[derive(Debug, Default)]
pub struct MemoryJar {
    cookies: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryJar {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expiry timestamp of a cookie, if present.
    pub fn expires(&self, name: &str) -> Option<DateTime<Utc>> {
        self.cookies.lock().unwrap().get(name).map(|(_, e)| *e)
    }
}

impl CookieJar for MemoryJar {
    fn set(&self, name: &str, value: &str, expires: DateTime<Utc>) {
        self.cookies
            .lock()
            .unwrap()
            .insert(name.to_string(), (value.to_string(), expires));
    }

    fn get(&self, name: &str) -> Option<String> {
        let cookies = self.cookies.lock().unwrap();
        let (value, expires) = cookies.get(name)?;
        if *expires <= Utc::now() {
            return None;
        }
        Some(value.clone())
    }

    fn clear(&self, name: &str) {
        self.cookies.lock().unwrap().remove(name);
    }
}

/// The two cookie values of a remembered login.
#[derive(Debug, Clone)]
pub struct RememberPair {
    /// Primary-key value of the remembered record, as cookie text.
    pub identifier: String,
    /// Salted hash of the record's stored password hash.
    pub verifier: String,
}

/// Codec for the remember cookie pair of one authentication namespace.
///
/// Cookie names are namespaced (`user-{n}` / `password-{n}`) so independent
/// login slots in one process never clobber each other.
#[derive(Debug, Clone, Copy)]
pub struct RememberCookies {
    namespace: AuthNamespace,
}

impl RememberCookies {
    /// Create the codec for a namespace.
    pub fn new(namespace: AuthNamespace) -> Self {
        Self { namespace }
    }

    /// Name of the identifier cookie.
    pub fn user_cookie(&self) -> String {
        format!("user-{}", self.namespace)
    }

    /// Name of the verifier cookie.
    pub fn password_cookie(&self) -> String {
        format!("password-{}", self.namespace)
    }

    /// Issue the pair with a fresh verifier and the fixed 90-day expiry.
    ///
    /// `stored_hash` is the record's current password-hash field; the
    /// verifier is recomputed from it on every issuance.
    pub fn issue<J: CookieJar>(
        &self,
        jar: &J,
        primary: &Value,
        stored_hash: &str,
    ) -> Result<(), PasswordError> {
        let verifier = current_hash(stored_hash)?;
        let expires = Utc::now() + Duration::days(REMEMBER_TTL_DAYS);
        jar.set(&self.user_cookie(), &cookie_text(primary), expires);
        jar.set(&self.password_cookie(), &verifier, expires);
        debug!(namespace = self.namespace, "issued remember cookie pair");
        Ok(())
    }

    /// Read the pair; `None` unless both cookies are present.
    pub fn read<J: CookieJar>(&self, jar: &J) -> Option<RememberPair> {
        let identifier = jar.get(&self.user_cookie())?;
        let verifier = jar.get(&self.password_cookie())?;
        Some(RememberPair {
            identifier,
            verifier,
        })
    }

    /// True if either cookie of the pair is present.
    pub fn present<J: CookieJar>(&self, jar: &J) -> bool {
        jar.get(&self.user_cookie()).is_some() || jar.get(&self.password_cookie()).is_some()
    }

    /// Expire and remove both cookies.
    pub fn clear<J: CookieJar>(&self, jar: &J) {
        jar.clear(&self.user_cookie());
        jar.clear(&self.password_cookie());
        debug!(namespace = self.namespace, "cleared remember cookie pair");
    }

    /// Check a verifier cookie against the record's stored password hash.
    ///
    /// The verifier embeds its own salt, so this goes through the current
    /// strategy's verify operation, never string equality.
    pub fn verifier_matches(verifier: &str, stored_hash: &str) -> bool {
        current_verify(stored_hash, verifier)
    }
}

/// Render a primary-key value as cookie text.
///
/// Strings go in bare; numbers use their canonical decimal form.
pub fn cookie_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse cookie text back into a primary-key value.
///
/// Integer-looking text becomes a number so it compares equal to numeric
/// primary keys; anything else stays a string.
pub fn cookie_value(text: &str) -> Value {
    text.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(text))
}
