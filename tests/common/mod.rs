//! Test helpers for engine integration tests.
//!
//! Provides a harness owning the engine's collaborators plus seeding helpers.

use std::sync::{Arc, Once};

use tempfile::TempDir;

use authgate::{
    AuthConfig, AuthEngine, KeyFile, MemoryJar, MemoryStore, Record, SessionStore, StaticRequest,
};

/// Owns the collaborators an engine borrows, so tests can build several
/// engines against the same store, cookie jar, or key material.
pub struct Harness {
    pub store: MemoryStore,
    pub jar: MemoryJar,
    pub request: StaticRequest,
    pub session: Arc<SessionStore>,
    key_dir: TempDir,
}

impl Harness {
    /// Harness with an interactive request on an ordinary handler.
    pub fn new() -> Self {
        Self::with_request(StaticRequest::interactive("Dashboard"))
    }

    /// Harness with a specific request context.
    pub fn with_request(request: StaticRequest) -> Self {
        // One console subscriber per test binary; engine tracing goes there.
        static LOGGING: Once = Once::new();
        LOGGING.call_once(|| authgate::logging::init_console_only("warn"));

        Self {
            store: MemoryStore::new(),
            jar: MemoryJar::new(),
            request,
            session: Arc::new(SessionStore::new()),
            key_dir: TempDir::new().expect("temp key dir"),
        }
    }

    /// Key file shared by every engine of this harness.
    pub fn key_file(&self) -> KeyFile {
        KeyFile::new(self.key_dir.path().join("token.key"))
    }

    /// Engine sharing the harness session store.
    pub fn engine(&self, config: AuthConfig) -> AuthEngine<'_, MemoryStore, MemoryJar, StaticRequest> {
        AuthEngine::new(
            config,
            0,
            &self.store,
            self.session.clone(),
            &self.jar,
            &self.request,
            self.key_file(),
        )
    }

    /// Engine with its own empty session store, as a fresh process/request
    /// with no prior authentication state would see it.
    pub fn engine_fresh_session(
        &self,
        config: AuthConfig,
    ) -> AuthEngine<'_, MemoryStore, MemoryJar, StaticRequest> {
        AuthEngine::new(
            config,
            0,
            &self.store,
            Arc::new(SessionStore::new()),
            &self.jar,
            &self.request,
            self.key_file(),
        )
    }
}

/// Seed a user whose password column already holds `digest`.
pub fn seed_user(store: &MemoryStore, id: i64, username: &str, digest: &str) {
    store.insert(
        "users",
        Record::new()
            .with("id", id)
            .with("username", username)
            .with("password", digest),
    );
}

/// Seed a pre-migration user: populated legacy column, stale password column.
pub fn seed_legacy_user(store: &MemoryStore, id: i64, username: &str, legacy_digest: &str) {
    store.insert(
        "users",
        Record::new()
            .with("id", id)
            .with("username", username)
            .with("password", "")
            .with("old_password", legacy_digest),
    );
}
