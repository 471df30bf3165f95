//! Configuration module for authgate.

use serde::{de, Deserialize, Deserializer};
use std::path::Path;

use crate::hash::Algorithm;
use crate::store::Filter;
use crate::{AuthError, Result};

/// Authentication target configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Credential table name, or `false` in TOML to disable the target.
    ///
    /// A disabled target makes every authentication operation degrade to a
    /// failure result without side effects.
    #[serde(default = "default_table", deserialize_with = "deserialize_table")]
    pub table: Option<String>,
    /// Primary-key column.
    #[serde(default = "default_primary")]
    pub primary: String,
    /// Username column.
    #[serde(default = "default_username")]
    pub username: String,
    /// Password-hash column.
    #[serde(default = "default_password")]
    pub password: String,
    /// Legacy password-hash column, if the deployment is mid-migration.
    #[serde(default)]
    pub legacy_password: Option<String>,
    /// Static filters applied to every credential lookup.
    #[serde(default)]
    pub filters: Filter,
    /// Whether unauthenticated requests are redirected to the login handler.
    #[serde(default)]
    pub mandatory: bool,
    /// Handlers exempt from the mandatory gate. The login handler is always
    /// implicitly exempt.
    #[serde(default)]
    pub except: Vec<String>,
    /// Handler that renders the login form.
    #[serde(default = "default_login_handler")]
    pub login_handler: String,
    /// Algorithm version governing new hash creation.
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Execution groups the mandatory gate applies to. Empty means all.
    #[serde(default)]
    pub groups: Vec<String>,
}

fn default_table() -> Option<String> {
    Some("users".to_string())
}

fn default_primary() -> String {
    "id".to_string()
}

fn default_username() -> String {
    "username".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn default_login_handler() -> String {
    "Login".to_string()
}

/// Accept either a table name or the literal `false` to disable the target.
fn deserialize_table<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TableOption {
        Name(String),
        Toggle(bool),
    }

    match TableOption::deserialize(deserializer)? {
        TableOption::Name(name) => Ok(Some(name)),
        TableOption::Toggle(false) => Ok(None),
        TableOption::Toggle(true) => Err(de::Error::custom(
            "table must be a table name or false to disable",
        )),
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            primary: default_primary(),
            username: default_username(),
            password: default_password(),
            legacy_password: None,
            filters: Filter::new(),
            mandatory: false,
            except: Vec::new(),
            login_handler: default_login_handler(),
            algorithm: Algorithm::default(),
            groups: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// True when the authentication target is turned off.
    pub fn disabled(&self) -> bool {
        self.table.is_none()
    }
}

/// Login-token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Path of the private key-material file for token encryption.
    #[serde(default = "default_key_path")]
    pub key_path: String,
}

fn default_key_path() -> String {
    "data/token.key".to_string()
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            key_path: default_key_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/authgate.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Authentication target configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Login-token configuration.
    #[serde(default)]
    pub token: TokenConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(AuthError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// An unrecognized algorithm version fails here, before any engine is
    /// built; it is a deployment error, not an authentication outcome.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| AuthError::Config(format!("config parse error: {e}")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(table) = &self.auth.table {
            if table.is_empty() {
                return Err(AuthError::Config(
                    "table must not be empty; use table = false to disable".to_string(),
                ));
            }
        }
        if self.auth.mandatory && self.auth.login_handler.is_empty() {
            return Err(AuthError::Config(
                "mandatory auth requires a login_handler".to_string(),
            ));
        }
        if self.auth.legacy_password.as_deref() == Some(self.auth.password.as_str()) {
            return Err(AuthError::Config(
                "legacy_password must differ from the password column".to_string(),
            ));
        }
        Ok(())
    }
}
