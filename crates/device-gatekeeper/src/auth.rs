//! Admin credential checks.

use crate::config::AdminConfig;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

/// Decides whether a username/password pair may perform admin actions.
#[cfg_attr(test, mockall::automock)]
pub trait AdminAuthorizer: Send + Sync {
    fn authorize(&self, username: &str, password: &str) -> bool;
}

/// A single configured admin account.
///
/// Only a SHA-256 digest of the password is kept in memory.
pub struct StaticCredentials {
    username: String,
    password_hash: String,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: &SecretString) -> Self {
        Self {
            username: username.into(),
            password_hash: hash_secret(password.expose_secret()),
        }
    }
}

impl AdminAuthorizer for StaticCredentials {
    fn authorize(&self, username: &str, password: &str) -> bool {
        // Always hash, even for an unknown username
        let password_ok = hash_secret(password) == self.password_hash;
        username == self.username && password_ok
    }
}

/// Rejects everything. Used when no admin password is configured.
pub struct DenyAll;

impl AdminAuthorizer for DenyAll {
    fn authorize(&self, _username: &str, _password: &str) -> bool {
        false
    }
}

/// Build the authorizer for the configured admin account.
pub fn from_config(config: &AdminConfig) -> Arc<dyn AdminAuthorizer> {
    match &config.password {
        Some(password) if !password.expose_secret().is_empty() => {
            Arc::new(StaticCredentials::new(config.username.clone(), password))
        }
        _ => {
            warn!("ADMIN__PASSWORD is not set, admin-only actions are disabled");
            Arc::new(DenyAll)
        }
    }
}

/// Hash a secret using SHA-256.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
