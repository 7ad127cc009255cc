use bcrypt::{DEFAULT_COST, hash, verify};

use crate::error::{AppError, Result};

/// Checks a username/password pair against deployment configuration.
pub trait CredentialStore: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// bcrypt hash of the configured password, kept in its `$2b$<cost>$...` form.
#[derive(Clone)]
pub struct PasswordHash {
    encoded: String,
}

impl PasswordHash {
    /// Hashes `password` at bcrypt's default cost under a fresh salt.
    pub fn new(password: &str) -> Result<Self> {
        Self::with_cost(password, DEFAULT_COST)
    }

    pub fn with_cost(password: &str, cost: u32) -> Result<Self> {
        let encoded = hash(password, cost)
            .map_err(|e| AppError::ConfigError(format!("Failed to hash password: {}", e)))?;
        Ok(Self { encoded })
    }

    /// Accepts a stored bcrypt string such as the output of `hash-password`.
    pub fn parse(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        verify("", encoded)
            .map_err(|e| AppError::ConfigError(format!("Invalid password hash: {}", e)))?;
        Ok(Self {
            encoded: encoded.to_string(),
        })
    }

    pub fn encode(&self) -> &str {
        &self.encoded
    }

    pub fn matches(&self, password: &str) -> bool {
        verify(password, &self.encoded).unwrap_or(false)
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// The single configured login.
#[derive(Debug, Clone)]
pub struct HashedCredentials {
    username: String,
    password: PasswordHash,
}

impl HashedCredentials {
    pub fn new(username: impl Into<String>, password: PasswordHash) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl CredentialStore for HashedCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        // Run bcrypt even for an unknown user so the reply time does not tell them apart.
        let user_ok = username == self.username;
        let pass_ok = self.password.matches(password);
        user_ok & pass_ok
    }
}
