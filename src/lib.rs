//! authgate - per-request user authentication
//!
//! Verifies credentials against a stored record, establishes and restores
//! authenticated sessions, supports remember-me persistence via cookies,
//! migrates users between password-hashing algorithms, and issues portable
//! encrypted login tokens for cross-context authentication.

pub mod config;
pub mod cookie;
pub mod engine;
pub mod error;
pub mod hash;
pub mod logging;
pub mod record;
pub mod request;
pub mod session;
pub mod store;
pub mod token;

pub use config::{AuthConfig, Config, LoggingConfig, TokenConfig};
pub use cookie::{CookieJar, MemoryJar, RememberCookies, RememberPair, REMEMBER_TTL_DAYS};
pub use engine::{AuthEngine, UserHandle};
pub use error::{AuthError, Result};
pub use hash::{Algorithm, PasswordError};
pub use record::Record;
pub use request::{RequestContext, StaticRequest};
pub use session::{AuthNamespace, SessionStore};
pub use store::{Filter, MemoryStore, RecordStore, StoreError};
pub use token::{KeyFile, LoginToken, TokenClaim, TokenError, TokenSealer};
