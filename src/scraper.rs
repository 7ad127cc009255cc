use std::collections::HashSet;
use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder, StatusCode};
use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::error::{AppError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Create a static client to reuse connections
static CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build HTTP client")
});

static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("body").expect("Failed to parse body selector")
});

static SKIPPED_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, noscript").expect("Failed to parse skipped selector")
});

/// Retries for transient fetch failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

pub async fn fetch_html(url: &str) -> Result<String> {
    fetch_html_with(&CLIENT, url, &RetryPolicy::default()).await
}

/// GETs `url`, retrying 500/502/503/504 and connect/timeout errors with
/// exponential backoff. Everything else fails immediately.
pub async fn fetch_html_with(client: &Client, url: &str, policy: &RetryPolicy) -> Result<String> {
    let mut attempt = 0;
    let mut delay = policy.initial_backoff;

    loop {
        let reason = match client.get(url).send().await {
            Ok(response) if is_retryable_status(response.status()) => {
                format!("HTTP {}", response.status())
            }
            Ok(response) => {
                let response = response.error_for_status()?;
                return Ok(response.text().await?);
            }
            Err(e) if e.is_connect() || e.is_timeout() => e.to_string(),
            Err(e) => return Err(e.into()),
        };

        if attempt >= policy.max_retries {
            return Err(AppError::FetchError(format!(
                "giving up on {} after {} attempts: {}",
                url,
                attempt + 1,
                reason
            )));
        }
        attempt += 1;
        warn!(
            "Fetch of {} failed ({}), retry {}/{} in {:?}",
            url, reason, attempt, policy.max_retries, delay
        );
        tokio::time::sleep(delay).await;
        delay *= policy.multiplier;
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

/// Visible text of `<body>`, one trimmed line per text block. `None` when
/// the document has no body.
pub fn extract_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let body = document.select(&BODY_SELECTOR).next()?;

    let skipped: HashSet<_> = body.select(&SKIPPED_SELECTOR).map(|el| el.id()).collect();
    let mut text = String::new();
    for node in body.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        if node.ancestors().any(|a| skipped.contains(&a.id())) {
            continue;
        }
        text.push_str(fragment);
        text.push('\n');
    }

    Some(normalize_whitespace(&text))
}

pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(trimmed);
        }
    }

    result
}

/// Fetches `url` and returns its body text.
pub async fn fetch_text(url: &str) -> Result<String> {
    info!("Fetching HTML for URL: {}", url);
    let html = fetch_html(url).await?;
    let text = extract_text(&html)
        .ok_or_else(|| AppError::ParseError("No <body> tag found in the HTML".to_string()))?;
    if text.is_empty() {
        return Err(AppError::ParseError("page has no readable text".to_string()));
    }
    Ok(text)
}
