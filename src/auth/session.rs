use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Default lifetime of a login.
pub const SESSION_TTL_DAYS: i64 = 30;

const TOKEN_BYTES: usize = 32;

/// One authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Mints a session with a fresh token. The expiry is truncated to whole
    /// seconds so it survives the persisted Unix-timestamp layout unchanged.
    pub fn mint(username: &str, ttl: Duration, now: DateTime<Utc>) -> Result<Self> {
        let expires_at = now
            .checked_add_signed(ttl)
            .and_then(|expiry| DateTime::from_timestamp(expiry.timestamp(), 0))
            .ok_or_else(|| {
                AppError::ConfigError(format!("session lifetime of {} days is out of range", ttl.num_days()))
            })?;

        Ok(Self {
            username: username.to_string(),
            token: generate_token(),
            expires_at,
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// 256 bits from the thread-local CSPRNG, base64url without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// The durable client-side layout: three string fields, expiry as a decimal
/// Unix timestamp in seconds. Cleared sessions keep the fields but empty them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub auth_username: String,
    #[serde(default)]
    pub auth_expiry: String,
}

impl PersistedSession {
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Any missing field or a non-numeric expiry means "no session".
    pub fn to_session(&self) -> Option<Session> {
        if self.auth_token.is_empty() || self.auth_username.is_empty() {
            return None;
        }
        let secs = self.auth_expiry.trim().parse::<i64>().ok()?;
        let expires_at = DateTime::from_timestamp(secs, 0)?;

        Some(Session {
            username: self.auth_username.clone(),
            token: self.auth_token.clone(),
            expires_at,
        })
    }
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            auth_token: session.token.clone(),
            auth_username: session.username.clone(),
            auth_expiry: session.expires_at.timestamp().to_string(),
        }
    }
}
