pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod llm;
pub mod scraper;
pub mod summarize;

use std::sync::Arc;

use auth::{HashedCredentials, SessionCipher, SessionGate};
use config::Config;
use error::Result;
use llm::{CompletionService, OpenRouterClient};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gate: Arc<SessionGate>,
    pub cipher: Arc<SessionCipher>,
    pub completion: Arc<dyn CompletionService>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let client = OpenRouterClient::new(
            &config.openrouter_api_key,
            &config.llm_api_url,
            &config.llm_model,
        )?
        .with_site(config.site_url.clone(), config.site_name.clone());

        Self::with_completion_service(config, Arc::new(client))
    }

    /// Builds the state around any completion backend.
    pub fn with_completion_service(
        config: Config,
        completion: Arc<dyn CompletionService>,
    ) -> Result<Self> {
        let credentials = HashedCredentials::new(config.auth_user.clone(), config.auth_password.clone());
        let gate = SessionGate::new(Arc::new(credentials), config.session_ttl);
        let cipher = SessionCipher::new(&config.session_secret)?;

        Ok(Self {
            config: Arc::new(config),
            gate: Arc::new(gate),
            cipher: Arc::new(cipher),
            completion,
        })
    }
}
