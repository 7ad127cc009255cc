use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use axum::{
    Router,
    body::Bytes,
    extract::{Json, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::AppState;
use crate::api::models::{LoginRequest, SessionInfo, SummarizeRequest, SummarizeResponse};
use crate::api::response;
use crate::auth::{Access, CookieSessionStore, SessionContext};
use crate::error::{AppError, Result};
use crate::scraper::fetch_text;
use crate::summarize::{ChunkedSummarizer, PromptTemplate, SummaryProfile};

/// N chunk calls plus the reduction all have to fit in here.
const SUMMARIZE_TIMEOUT: Duration = Duration::from_secs(300);

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/login", post(login_handler))
        .route("/api/logout", post(logout_handler))
        .route("/api/session", get(session_handler))
        .route("/api/summarize", post(summarize_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

fn session_store(state: &AppState, headers: &HeaderMap) -> CookieSessionStore {
    CookieSessionStore::from_headers(state.cipher.clone(), headers)
}

/// Attaches whatever the store wants persisted on the client.
fn with_cookie(mut response: Response, store: &mut CookieSessionStore) -> Response {
    if let Some(value) = store.take_set_cookie() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Response {
    let mut store = session_store(&state, &headers);
    let mut ctx = SessionContext::new();

    match state.gate.login(&mut ctx, &mut store, &req.username, &req.password) {
        Ok(session) => {
            let body = response::success(SessionInfo::from(&session)).into_response();
            with_cookie(body, &mut store)
        }
        Err(err) => err.into_response(),
    }
}

async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut store = session_store(&state, &headers);
    let mut ctx = SessionContext::new();
    // Restore the flag so the log line names who left.
    state.gate.authorize(&mut ctx, &store);

    match state.gate.logout(&mut ctx, &mut store) {
        Ok(()) => with_cookie(response::message("Logged out").into_response(), &mut store),
        Err(err) => err.into_response(),
    }
}

async fn session_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = session_store(&state, &headers);
    let mut ctx = SessionContext::new();
    if state.gate.authorize(&mut ctx, &store) == Access::Denied {
        return AppError::Unauthorized.into_response();
    }

    match state.gate.current_session(&store, Utc::now()) {
        Some(session) => response::success(SessionInfo::from(&session)).into_response(),
        None => AppError::Unauthorized.into_response(),
    }
}

// The body is decoded only after the gate so anonymous callers always get 401.
async fn summarize_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let store = session_store(&state, &headers);
    let mut ctx = SessionContext::new();
    if state.gate.authorize(&mut ctx, &store) == Access::Denied {
        info!("Rejected unauthenticated summarize request");
        return AppError::Unauthorized.into_response();
    }

    let req: SummarizeRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            return AppError::ParseError(format!("Invalid summarize request: {}", e)).into_response();
        }
    };

    info!(
        "Processing {:?} summary for {}",
        req.profile,
        ctx.username().unwrap_or("unknown")
    );
    let start_time = Instant::now();

    let result = tokio::time::timeout(SUMMARIZE_TIMEOUT, process_summarize_request(&state, &req)).await;

    let elapsed = start_time.elapsed();
    info!("Request processing took: {:?}", elapsed);

    match result {
        Ok(Ok(data)) => response::success(data).into_response(),
        Ok(Err(err)) => {
            error!("Summarize failed: {}", err);
            err.into_response()
        }
        Err(_) => {
            error!("Request timed out after {:?}", elapsed);
            response::error::<()>(
                StatusCode::REQUEST_TIMEOUT,
                "Request processing timed out".to_string(),
            )
            .into_response()
        }
    }
}

async fn process_summarize_request(state: &AppState, req: &SummarizeRequest) -> Result<SummarizeResponse> {
    // A broken deployment should fail before we spend a fetch.
    let template_path = state.config.prompts_dir.join(req.profile.template_file());
    let template = PromptTemplate::load(&template_path).await?;

    let url = req.url.as_deref().map(str::trim).filter(|url| !url.is_empty());
    let (source, text) = match (url, req.text.as_deref()) {
        (Some(url), _) => (url.to_string(), fetch_text(url).await?),
        (None, Some(text)) => ("text".to_string(), text.to_string()),
        (None, None) => {
            return Err(AppError::ParseError("either url or text is required".to_string()));
        }
    };

    let char_count = text.chars().count();
    let word_count = text.split_whitespace().count();
    info!("Document size: {} chars, {} words", char_count, word_count);

    let settings = req.profile.settings(&state.config.summarizer_settings());
    let summarizer = ChunkedSummarizer::new(state.completion.clone(), settings);
    let outcome = summarizer
        .summarize_document(&text, &template, &AtomicBool::new(false))
        .await?;

    info!(
        "Summarized {} chunks with {} completion calls",
        outcome.chunk_count, outcome.completion_calls
    );

    Ok(SummarizeResponse {
        source,
        profile: req.profile,
        summary: ensure_markdown_formatting(&outcome.summary, req.profile),
        chunk_count: outcome.chunk_count,
        char_count,
        word_count,
        summarized_at: Utc::now(),
    })
}

/// Prepends a heading when the reply has none. A short first line is moved
/// into the heading; otherwise the profile's title is used.
fn ensure_markdown_formatting(text: &str, profile: SummaryProfile) -> String {
    let text = text.trim();

    if text.starts_with('#') {
        return text.to_string();
    }

    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    let first = first.trim();
    let (title, body) = if !first.is_empty() && first.chars().count() <= 50 {
        (first, rest.trim_start())
    } else {
        (profile.title(), text)
    };

    if body.is_empty() {
        format!("# {}", title)
    } else {
        format!("# {}\n\n{}", title, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_heading_kept() {
        let md = "# Title\n\n- point";
        assert_eq!(ensure_markdown_formatting(md, SummaryProfile::WebContent), md);
    }

    #[test]
    fn test_short_first_line_becomes_heading() {
        let out = ensure_markdown_formatting("Key findings\n- growth", SummaryProfile::WebContent);
        assert_eq!(out, "# Key findings\n\n- growth");
    }

    #[test]
    fn test_promoted_line_not_repeated() {
        let out = ensure_markdown_formatting("Overview\r\n\n- one\n- two", SummaryProfile::Transcript);
        assert_eq!(out, "# Overview\n\n- one\n- two");
        assert_eq!(out.matches("Overview").count(), 1);

        assert_eq!(ensure_markdown_formatting("Only a title", SummaryProfile::Transcript), "# Only a title");
    }

    #[test]
    fn test_long_first_line_uses_profile_title() {
        let long = "x".repeat(80);
        let out = ensure_markdown_formatting(&long, SummaryProfile::FinancialReport);
        assert!(out.starts_with("# Financial Report Analysis\n\n"));
        assert!(out.ends_with(&long));
    }
}
