use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};

pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3-0324";
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// One text-in/text-out call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Opaque completion endpoint. Any transport, quota or response-shape
/// failure is reported as [`AppError::LlmError`].
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenRouter (OpenAI-compatible) chat completions client.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    site_url: Option<String>,
    site_name: Option<String>,
}

impl OpenRouterClient {
    pub fn new(api_key: &str, api_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            api_url: api_url.to_string(),
            model: model.to_string(),
            site_url: None,
            site_name: None,
        })
    }

    /// Attribution headers OpenRouter shows in its dashboard.
    pub fn with_site(mut self, site_url: Option<String>, site_name: Option<String>) -> Self {
        self.site_url = site_url;
        self.site_name = site_name;
        self
    }
}

#[async_trait]
impl CompletionService for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &request.system_prompt,
                },
                Message {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        };

        let mut builder = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body);

        if let Some(url) = &self.site_url {
            builder = builder.header("HTTP-Referer", url);
        }
        if let Some(name) = &self.site_name {
            builder = builder.header("X-Title", name);
        }

        debug!("Calling {} with {} prompt chars", self.model, request.user_prompt.len());
        let res = builder
            .send()
            .await
            .map_err(|e| AppError::LlmError(format!("request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            return Err(AppError::LlmError(format!("HTTP {}: {}", status, detail)));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| AppError::LlmError(format!("Invalid response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::LlmError("Invalid response format from LLM".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_body_shape() {
        let body = ChatRequest {
            model: DEFAULT_MODEL,
            messages: vec![
                Message { role: "system", content: "persona" },
                Message { role: "user", content: "text" },
            ],
            max_tokens: 3000,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "text");
        assert_eq!(json["max_tokens"], 3000);
        assert_eq!(json["temperature"], 0.5);
    }

    #[test]
    fn test_response_without_choices_parses_empty() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"error":{"message":"quota"}}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn test_response_content_extracted() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }
}
