//! Encrypted-cookie session persistence.
//!
//! The three persisted fields are serialised to JSON, sealed with AES-256-GCM
//! under a key derived from `SESSION_SECRET`, and carried by the client in an
//! `HttpOnly` cookie. A cookie that fails to decrypt or parse reads as "no
//! session".

use std::sync::Arc;

use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, AeadCore, OsRng},
};
use axum::http::{HeaderMap, HeaderValue, header};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::session::{PersistedSession, Session};
use super::store::SessionStore;
use crate::error::{AppError, Result};

pub const SESSION_COOKIE_NAME: &str = "ws_session";

const NONCE_LEN: usize = 12;

pub struct SessionCipher {
    cipher: Aes256Gcm,
}

impl SessionCipher {
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(AppError::ConfigError("session secret must not be empty".to_string()));
        }
        let key = Sha256::digest(secret.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| AppError::ConfigError(format!("Invalid session key: {}", e)))?;
        Ok(Self { cipher })
    }

    /// `base64url(nonce || ciphertext)`
    pub fn seal(&self, fields: &PersistedSession) -> Result<String> {
        let plaintext = serde_json::to_vec(fields)
            .map_err(|e| AppError::StorageError(e.to_string()))?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_ref())
            .map_err(|_| AppError::StorageError("failed to encrypt session".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    pub fn open(&self, sealed: &str) -> Option<PersistedSession> {
        let bytes = URL_SAFE_NO_PAD.decode(sealed).ok()?;
        if bytes.len() <= NONCE_LEN {
            return None;
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .ok()?;
        serde_json::from_slice(&plaintext).ok()
    }
}

/// Per-request view of the session cookie. Writes are buffered as a
/// `Set-Cookie` value for the response.
pub struct CookieSessionStore {
    cipher: Arc<SessionCipher>,
    fields: Option<PersistedSession>,
    pending: Option<HeaderValue>,
}

impl CookieSessionStore {
    pub fn from_headers(cipher: Arc<SessionCipher>, headers: &HeaderMap) -> Self {
        let fields = find_cookie(headers, SESSION_COOKIE_NAME).and_then(|value| {
            let opened = cipher.open(&value);
            if opened.is_none() {
                debug!("Ignoring session cookie that failed to decrypt");
            }
            opened
        });

        Self {
            cipher,
            fields,
            pending: None,
        }
    }

    /// The `Set-Cookie` value produced by the last `set`/`clear`, if any.
    pub fn take_set_cookie(&mut self) -> Option<HeaderValue> {
        self.pending.take()
    }

    fn write(&mut self, fields: PersistedSession, max_age: i64) -> Result<()> {
        let sealed = self.cipher.seal(&fields)?;
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE_NAME, sealed, max_age
        );
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        self.fields = Some(fields);
        self.pending = Some(value);
        Ok(())
    }
}

impl SessionStore for CookieSessionStore {
    fn get(&self) -> Option<PersistedSession> {
        self.fields.clone()
    }

    fn set(&mut self, session: &Session) -> Result<()> {
        let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
        self.write(PersistedSession::from(session), max_age)
    }

    fn clear(&mut self) -> Result<()> {
        self.write(PersistedSession::cleared(), 0)
    }
}

fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cipher() -> Arc<SessionCipher> {
        Arc::new(SessionCipher::new("test-secret").unwrap())
    }

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    /// Pulls `name=value` out of a `Set-Cookie` header.
    fn cookie_pair(set_cookie: &HeaderValue) -> String {
        set_cookie.to_str().unwrap().split(';').next().unwrap().to_string()
    }

    #[test]
    fn test_seal_open() {
        let cipher = cipher();
        let session = Session::mint("alice", Duration::hours(1), Utc::now()).unwrap();
        let fields = PersistedSession::from(&session);

        let sealed = cipher.seal(&fields).unwrap();
        assert!(!sealed.contains(&session.token));
        assert_eq!(cipher.open(&sealed), Some(fields));
    }

    #[test]
    fn test_open_rejects_tampering_and_other_keys() {
        let cipher = cipher();
        let sealed = cipher.seal(&PersistedSession::cleared()).unwrap();

        let other = SessionCipher::new("other-secret").unwrap();
        assert!(other.open(&sealed).is_none());

        let mut tampered = sealed.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        assert!(cipher.open(&String::from_utf8(tampered).unwrap()).is_none());

        assert!(cipher.open("not base64 !!").is_none());
        assert!(cipher.open("").is_none());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(SessionCipher::new("").is_err());
    }

    #[test]
    fn test_set_then_read_back_from_request() {
        let cipher = cipher();
        let mut store = CookieSessionStore::from_headers(cipher.clone(), &HeaderMap::new());
        assert!(store.get().is_none());

        let session = Session::mint("alice", Duration::days(30), Utc::now()).unwrap();
        store.set(&session).unwrap();
        let set_cookie = store.take_set_cookie().unwrap();
        let text = set_cookie.to_str().unwrap();
        assert!(text.contains("HttpOnly"));
        assert!(text.contains("Max-Age="));

        let next = CookieSessionStore::from_headers(
            cipher,
            &headers_with_cookie(&format!("theme=dark; {}", cookie_pair(&set_cookie))),
        );
        assert_eq!(next.get().and_then(|f| f.to_session()), Some(session));
    }

    #[test]
    fn test_clear_expires_cookie_with_empty_fields() {
        let cipher = cipher();
        let mut store = CookieSessionStore::from_headers(cipher.clone(), &HeaderMap::new());
        store.clear().unwrap();

        let set_cookie = store.take_set_cookie().unwrap();
        assert!(set_cookie.to_str().unwrap().contains("Max-Age=0"));
        assert!(store.take_set_cookie().is_none());

        let next = CookieSessionStore::from_headers(cipher, &headers_with_cookie(&cookie_pair(&set_cookie)));
        assert_eq!(next.get(), Some(PersistedSession::cleared()));
    }

    #[test]
    fn test_garbage_cookie_reads_as_absent() {
        let store = CookieSessionStore::from_headers(
            cipher(),
            &headers_with_cookie(&format!("{}=garbage", SESSION_COOKIE_NAME)),
        );
        assert!(store.get().is_none());
    }
}
