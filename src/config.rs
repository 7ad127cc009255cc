use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;

use crate::auth::PasswordHash;
use crate::auth::session::SESSION_TTL_DAYS;
use crate::error::{AppError, Result};
use crate::llm::{DEFAULT_API_URL, DEFAULT_MODEL};
use crate::summarize::{DEFAULT_MAX_CHARS, ReductionMode, SummarizerSettings};

/// Map levels allowed when `SUMMARY_REDUCTION=recursive`.
const RECURSIVE_MAX_DEPTH: usize = 4;

/// Upper bound for `SESSION_TTL_DAYS`.
const MAX_SESSION_TTL_DAYS: i64 = 3650;

#[derive(Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub openrouter_api_key: String,
    pub llm_model: String,
    pub llm_api_url: String,
    pub site_url: Option<String>,
    pub site_name: Option<String>,
    pub auth_user: String,
    pub auth_password: PasswordHash,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub prompts_dir: PathBuf,
    pub summary_max_chars: usize,
    pub reduction: ReductionMode,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let openrouter_api_key = required("OPENROUTER_API_KEY")?;
        let llm_model = env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let llm_api_url = env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let site_url = env::var("OPENROUTER_SITE_URL").ok().filter(|v| !v.is_empty());
        let site_name = env::var("OPENROUTER_SITE_NAME").ok().filter(|v| !v.is_empty());

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
        let server_addr = SocketAddr::new(ip, port);

        let auth_user = required("AUTH_USER")?;
        let auth_password = match env::var("AUTH_PASSWORD_HASH") {
            Ok(encoded) => PasswordHash::parse(&encoded)?,
            Err(_) => PasswordHash::new(&required("AUTH_PASSWORD")?)?,
        };
        let session_secret = required("SESSION_SECRET")?;
        let session_ttl = session_ttl(parse_var("SESSION_TTL_DAYS", SESSION_TTL_DAYS)?)?;

        let prompts_dir = PathBuf::from(env::var("PROMPTS_DIR").unwrap_or_else(|_| "prompts".to_string()));
        let summary_max_chars = parse_var("SUMMARY_MAX_CHARS", DEFAULT_MAX_CHARS)?;
        if summary_max_chars == 0 {
            return Err(AppError::ConfigError("SUMMARY_MAX_CHARS must be positive".to_string()));
        }
        let reduction = parse_reduction(&env::var("SUMMARY_REDUCTION").unwrap_or_default())?;

        Ok(Config {
            server_addr,
            openrouter_api_key,
            llm_model,
            llm_api_url,
            site_url,
            site_name,
            auth_user,
            auth_password,
            session_secret,
            session_ttl,
            prompts_dir,
            summary_max_chars,
            reduction,
        })
    }

    /// Base settings every profile starts from.
    pub fn summarizer_settings(&self) -> SummarizerSettings {
        SummarizerSettings {
            max_chars: self.summary_max_chars,
            reduction: self.reduction,
            ..SummarizerSettings::default()
        }
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::ConfigError(format!("{} is not set", name)))
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn session_ttl(days: i64) -> Result<Duration> {
    if !(1..=MAX_SESSION_TTL_DAYS).contains(&days) {
        return Err(AppError::ConfigError(format!(
            "SESSION_TTL_DAYS must be between 1 and {}, got {}",
            MAX_SESSION_TTL_DAYS, days
        )));
    }
    Ok(Duration::days(days))
}

fn parse_reduction(raw: &str) -> Result<ReductionMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "single" => Ok(ReductionMode::SinglePass),
        "recursive" => Ok(ReductionMode::Recursive {
            max_depth: RECURSIVE_MAX_DEPTH,
        }),
        other => Err(AppError::ConfigError(format!(
            "SUMMARY_REDUCTION must be 'single' or 'recursive', got '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reduction() {
        assert_eq!(parse_reduction("").unwrap(), ReductionMode::SinglePass);
        assert_eq!(parse_reduction("Single").unwrap(), ReductionMode::SinglePass);
        assert_eq!(
            parse_reduction(" recursive ").unwrap(),
            ReductionMode::Recursive { max_depth: RECURSIVE_MAX_DEPTH }
        );
        assert!(parse_reduction("twice").is_err());
    }

    #[test]
    fn test_session_ttl_bounds() {
        assert_eq!(session_ttl(30).unwrap(), Duration::days(30));
        assert_eq!(session_ttl(MAX_SESSION_TTL_DAYS).unwrap(), Duration::days(MAX_SESSION_TTL_DAYS));
        assert!(matches!(session_ttl(0), Err(AppError::ConfigError(_))));
        assert!(matches!(session_ttl(-1), Err(AppError::ConfigError(_))));
        assert!(matches!(session_ttl(MAX_SESSION_TTL_DAYS + 1), Err(AppError::ConfigError(_))));
        assert!(matches!(session_ttl(100_000_000), Err(AppError::ConfigError(_))));
        assert!(matches!(session_ttl(i64::MAX), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_parse_var_falls_back_to_default() {
        assert_eq!(parse_var("WEB_SUMMARIZER_TEST_UNSET_VAR", 42usize).unwrap(), 42);
    }
}
