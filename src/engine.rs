//! Authentication engine for authgate.
//!
//! `AuthEngine` orchestrates the credential store, hash strategies, session
//! store, remember cookies, and login tokens for one authentication
//! namespace over the lifetime of one request. It owns no I/O of its own;
//! every side effect goes through the injected collaborators.
//!
//! Per namespace the engine is a two-state machine: Anonymous and
//! Authenticated. Login, direct-login, cookie restore, and token restore
//! move to Authenticated; logout moves back. Recoverable authentication
//! failures are reported as `Ok(None)`, never as errors.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::cookie::{cookie_value, CookieJar, RememberCookies};
use crate::error::{AuthError, Result};
use crate::hash::{current_hash, current_verify, legacy_verify};
use crate::record::Record;
use crate::request::RequestContext;
use crate::session::{AuthNamespace, SessionStore};
use crate::store::{Filter, RecordStore};
use crate::token::{KeyFile, LoginToken, TokenClaim, TokenSealer};

/// An already-fetched record or a primary-key value to resolve.
#[derive(Debug, Clone)]
pub enum UserHandle {
    /// A record fetched by the caller.
    Record(Record),
    /// A primary-key value, resolved through the credential store.
    Id(Value),
}

impl From<Record> for UserHandle {
    fn from(record: Record) -> Self {
        UserHandle::Record(record)
    }
}

impl From<Value> for UserHandle {
    fn from(id: Value) -> Self {
        UserHandle::Id(id)
    }
}

impl From<i64> for UserHandle {
    fn from(id: i64) -> Self {
        UserHandle::Id(Value::from(id))
    }
}

/// Per-request authentication engine for one namespace.
pub struct AuthEngine<'a, S, J, R>
where
    S: RecordStore,
    J: CookieJar,
    R: RequestContext,
{
    config: AuthConfig,
    namespace: AuthNamespace,
    store: &'a S,
    session: Arc<SessionStore>,
    cookies: &'a J,
    request: &'a R,
    remember: RememberCookies,
    key_file: KeyFile,
}

impl<'a, S, J, R> AuthEngine<'a, S, J, R>
where
    S: RecordStore,
    J: CookieJar,
    R: RequestContext,
{
    /// Create an engine for one request.
    ///
    /// `session` is the process-wide session store, shared between engines;
    /// `key_file` locates the token-encryption key material.
    pub fn new(
        config: AuthConfig,
        namespace: AuthNamespace,
        store: &'a S,
        session: Arc<SessionStore>,
        cookies: &'a J,
        request: &'a R,
        key_file: KeyFile,
    ) -> Self {
        let remember = RememberCookies::new(namespace);
        Self {
            config,
            namespace,
            store,
            session,
            cookies,
            request,
            remember,
            key_file,
        }
    }

    /// Run the request-startup sequence.
    ///
    /// Restores the session from remember cookies (interactive contexts
    /// only, at most once, and only if no session entry exists yet), then
    /// applies the mandatory-auth gate. Returns the redirect URL if the gate
    /// fired.
    pub fn start(&self) -> Result<Option<String>> {
        if self.request.is_interactive() {
            self.cookie_login()?;
        }
        Ok(self.check_mandatory())
    }

    /// Primary-key column name.
    pub fn primary_column(&self) -> &str {
        &self.config.primary
    }

    /// Username column name.
    pub fn username_column(&self) -> &str {
        &self.config.username
    }

    /// Password-hash column name.
    pub fn password_column(&self) -> &str {
        &self.config.password
    }

    /// Hash a secret under the configured algorithm version.
    pub fn crypt(&self, secret: &str) -> Result<String> {
        Ok(self.config.algorithm.hash(secret)?)
    }

    /// Authenticate a username/password pair.
    ///
    /// Any existing session for this namespace is logged out first. The
    /// record is looked up by the static filters, `extra` filters, and the
    /// username column; the password is then verified under the configured
    /// algorithm version, migrating legacy hashes opportunistically (see
    /// [`AuthConfig::legacy_password`]). On success the record becomes the
    /// session entry and, if `remember` is set in an interactive context,
    /// the remember cookie pair is issued.
    ///
    /// Returns the primary-key value, or `None` for a disabled target, an
    /// unknown user, or a wrong password.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        remember: bool,
        extra: &Filter,
    ) -> Result<Option<Value>> {
        self.logout();
        let Some(table) = self.config.table.clone() else {
            return Ok(None);
        };

        let mut filter = self.config.filters.clone();
        filter.extend(extra.clone());
        filter.insert(self.config.username.clone(), Value::from(username));

        let Some(mut user) = self.store.select(&table, &filter)? else {
            warn!(username, "login failed: user not found");
            return Ok(None);
        };

        if !self.verify_and_migrate(&table, &mut user, password)? {
            warn!(username, "login failed: wrong password");
            return Ok(None);
        }

        self.direct_login(user, remember)
    }

    /// Verify `password` against the record under the configured algorithm.
    ///
    /// With the current algorithm configured and a populated legacy column,
    /// a successful legacy verification immediately rehashes the password
    /// under the current algorithm, persists it, and clears the legacy
    /// column, so the migration runs once per record.
    fn verify_and_migrate(&self, table: &str, user: &mut Record, password: &str) -> Result<bool> {
        let stored = user.get_str(&self.config.password).unwrap_or("");

        match self.config.algorithm {
            crate::hash::Algorithm::Legacy => Ok(legacy_verify(password, stored)),
            crate::hash::Algorithm::Current => {
                if let Some(legacy_column) = self.config.legacy_password.clone() {
                    if !user.is_empty_field(&legacy_column) {
                        let legacy_stored = user.get_str(&legacy_column).unwrap_or("");
                        if !legacy_verify(password, legacy_stored) {
                            return Ok(false);
                        }

                        let rehashed = self.config.algorithm.hash(password)?;
                        let fields = Record::new()
                            .with(self.config.password.clone(), rehashed)
                            .with(legacy_column, "");
                        if let Some(id) = user.get(&self.config.primary).cloned() {
                            self.store.update(table, &self.config.primary, &id, &fields)?;
                        }
                        user.apply(&fields);
                        info!("migrated legacy password hash");
                        return Ok(true);
                    }
                }
                Ok(current_verify(password, stored))
            }
        }
    }

    /// Log in an already-verified user.
    ///
    /// Accepts a fetched record or a primary-key value; a missing id is a
    /// failure, not an error. Replaces any prior session entry whole. When
    /// `remember` is set and the context is interactive, issues the remember
    /// cookie pair with its fixed expiry.
    pub fn direct_login(
        &self,
        user: impl Into<UserHandle>,
        remember: bool,
    ) -> Result<Option<Value>> {
        let Some(table) = self.config.table.clone() else {
            return Ok(None);
        };
        let remember = remember && self.request.is_interactive();

        let user = match user.into() {
            UserHandle::Record(record) => record,
            UserHandle::Id(id) => {
                let mut filter = Filter::new();
                filter.insert(self.config.primary.clone(), id.clone());
                match self.store.select(&table, &filter)? {
                    Some(record) => record,
                    None => {
                        warn!(id = %id, "direct login failed: no such record");
                        return Ok(None);
                    }
                }
            }
        };

        let Some(id) = user.get(&self.config.primary).cloned() else {
            return Err(AuthError::Config(format!(
                "record has no primary column '{}'",
                self.config.primary
            )));
        };

        if remember {
            let stored = user.get_str(&self.config.password).unwrap_or("");
            self.remember.issue(self.cookies, &id, stored)?;
        }
        self.session.set(self.namespace, user);

        info!(namespace = self.namespace, id = %id, "login successful");
        Ok(Some(id))
    }

    /// Log out this namespace.
    ///
    /// Removes the session entry; in interactive contexts also expires the
    /// remember cookie pair if present. Always succeeds.
    pub fn logout(&self) {
        self.session.remove(self.namespace);
        if self.request.is_interactive() && self.remember.present(self.cookies) {
            self.remember.clear(self.cookies);
        }
        debug!(namespace = self.namespace, "logged out");
    }

    /// Primary-key value of the authenticated record, or `None`.
    pub fn logged(&self) -> Option<Value> {
        self.session
            .get(self.namespace)?
            .get(&self.config.primary)
            .cloned()
    }

    /// The full authenticated record, or `None`.
    pub fn user(&self) -> Option<Record> {
        self.session.get(self.namespace)
    }

    /// One field of the authenticated record, or `None`.
    pub fn user_field(&self, name: &str) -> Option<Value> {
        self.session.get(self.namespace)?.get(name).cloned()
    }

    /// Re-fetch the session record from the store, replacing the entry.
    ///
    /// Keeps the session consistent with storage after an external
    /// mutation. No-op when unauthenticated; if the record has vanished the
    /// entry is removed.
    pub fn reload(&self) -> Result<()> {
        let Some(table) = self.config.table.clone() else {
            return Ok(());
        };
        let Some(entry) = self.session.get(self.namespace) else {
            return Ok(());
        };
        let Some(id) = entry.get(&self.config.primary).cloned() else {
            return Ok(());
        };

        let mut filter = Filter::new();
        filter.insert(self.config.primary.clone(), id);
        match self.store.select(&table, &filter)? {
            Some(fresh) => self.session.set(self.namespace, fresh),
            None => {
                warn!(namespace = self.namespace, "reload: record vanished");
                self.session.remove(self.namespace);
            }
        }
        Ok(())
    }

    /// Restore the session from the remember cookie pair.
    ///
    /// Runs at most once per request, only while anonymous. The record is
    /// fetched by the identifier cookie, then the verifier cookie is checked
    /// against a fresh hash of the stored password hash. Any mismatch or
    /// missing record clears the stale pair via [`AuthEngine::logout`] so
    /// the client does not get stuck with dead cookies.
    pub fn cookie_login(&self) -> Result<Option<Value>> {
        let Some(table) = self.config.table.clone() else {
            return Ok(None);
        };
        if self.session.contains(self.namespace) {
            return Ok(None);
        }
        let Some(pair) = self.remember.read(self.cookies) else {
            return Ok(None);
        };

        let mut filter = self.config.filters.clone();
        filter.insert(self.config.primary.clone(), cookie_value(&pair.identifier));

        let user = self.store.select(&table, &filter)?;
        let verified = user.as_ref().is_some_and(|u| {
            let stored = u.get_str(&self.config.password).unwrap_or("");
            RememberCookies::verifier_matches(&pair.verifier, stored)
        });

        if let (Some(user), true) = (user, verified) {
            debug!(namespace = self.namespace, "restored session from cookies");
            self.direct_login(user, true)
        } else {
            warn!(namespace = self.namespace, "stale remember cookies, clearing");
            self.logout();
            Ok(None)
        }
    }

    /// Apply the mandatory-auth gate for the current request.
    ///
    /// No-op when authenticated, when `mandatory` is off, when the current
    /// execution group is not among the affected groups (an empty list
    /// affects all groups), or when the resolved handler is the login
    /// handler or an exempted one. Otherwise issues a redirect to the login
    /// handler carrying the originally requested path, and returns the
    /// redirect URL. This is the engine's only control-flow redirection.
    pub fn check_mandatory(&self) -> Option<String> {
        if self.logged().is_some() || !self.config.mandatory {
            return None;
        }
        if !self.config.groups.is_empty()
            && !self.config.groups.iter().any(|g| g == self.request.group())
        {
            return None;
        }

        let handler = self.request.handler_name();
        if handler == self.config.login_handler
            || self.config.except.iter().any(|e| e == handler)
        {
            return None;
        }

        let mut target = self.request.path_segments().join("/");
        if self.request.is_interactive() {
            target = urlencoding::encode(&target).into_owned();
        }
        let url = format!(
            "{}?redirect={}",
            self.request.build_url(&self.config.login_handler),
            target
        );

        info!(handler, url, "unauthenticated request, redirecting to login");
        self.request.redirect(&url);
        Some(url)
    }

    /// Issue a portable encrypted login token for the active session.
    ///
    /// The claim carries the primary key, the username, and a fresh salted
    /// hash of the stored password hash; the raw stored hash never enters
    /// the token. Returns `None` without a session.
    pub fn login_token(&self) -> Result<Option<LoginToken>> {
        let Some(entry) = self.session.get(self.namespace) else {
            return Ok(None);
        };
        let Some(id) = entry.get(&self.config.primary).cloned() else {
            return Ok(None);
        };
        let username = entry.get_str(&self.config.username).unwrap_or("").to_string();
        let stored = entry.get_str(&self.config.password).unwrap_or("");

        // The verifier must be salted and self-describing regardless of the
        // configured creation algorithm, so it always uses the current
        // strategy.
        let claim = TokenClaim {
            id,
            username,
            verifier: current_hash(stored)?,
        };

        let sealer = TokenSealer::from_key_file(&self.key_file)?;
        let token = sealer.seal(&claim)?;
        debug!(namespace = self.namespace, "issued login token");
        Ok(Some(token))
    }

    /// Authenticate from a portable login token.
    ///
    /// An undecryptable or unparseable token is an error (it signals
    /// tampering or corruption). A decrypted claim that fails lookup or
    /// verification is a recoverable failure: the session is cleared and
    /// `None` is returned, so callers can fall back to the login form.
    pub fn token_login(&self, token: &LoginToken) -> Result<Option<Value>> {
        let Some(table) = self.config.table.clone() else {
            return Ok(None);
        };

        let sealer = TokenSealer::from_key_file(&self.key_file)?;
        let claim = sealer.open(token)?;

        let mut filter = self.config.filters.clone();
        filter.insert(self.config.primary.clone(), claim.id.clone());
        filter.insert(self.config.username.clone(), Value::from(claim.username.clone()));

        let user = self.store.select(&table, &filter)?;
        let verified = user.as_ref().is_some_and(|u| {
            let stored = u.get_str(&self.config.password).unwrap_or("");
            current_verify(stored, &claim.verifier)
        });

        if let (Some(user), true) = (user, verified) {
            info!(namespace = self.namespace, "token login successful");
            self.direct_login(user, true)
        } else {
            warn!(namespace = self.namespace, "token login failed");
            self.logout();
            Ok(None)
        }
    }
}
