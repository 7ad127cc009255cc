use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::summarize::SummaryProfile;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Never carries the token; that only travels in the sealed cookie.
#[derive(Serialize)]
pub struct SessionInfo {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            username: session.username.clone(),
            expires_at: session.expires_at,
        }
    }
}

/// Either `url` (fetched and extracted) or inline `text`.
#[derive(Deserialize)]
pub struct SummarizeRequest {
    pub url: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub profile: SummaryProfile,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    pub source: String,
    pub profile: SummaryProfile,
    #[serde(rename = "summary_markdown")]
    pub summary: String,
    pub chunk_count: usize,
    pub char_count: usize,
    pub word_count: usize,
    pub summarized_at: DateTime<Utc>,
}
