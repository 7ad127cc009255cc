//! Chunk → per-chunk summarize → reduce.
//!
//! Chunks are summarized sequentially in document order and the partial
//! summaries are joined with `\n` before one final reduction call. Any
//! completion failure ends the run: no partial result is returned and no
//! further calls are issued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use super::chunk::{DEFAULT_MAX_CHARS, chunk_text};
use super::template::PromptTemplate;
use crate::error::{AppError, Result};
use crate::llm::{CompletionRequest, CompletionService};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a highly skilled analyst who writes accurate, well-structured summaries.";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 3000;
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// How the joined partial summaries are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReductionMode {
    /// One reduction call over the joined partials, however long they are.
    #[default]
    SinglePass,
    /// While the joined partials exceed `max_chars`, chunk and summarize them
    /// again, up to `max_depth` map levels. Ends with one reduction call.
    Recursive { max_depth: usize },
}

#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    pub max_chars: usize,
    pub system_prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub reduction: ReductionMode,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            reduction: ReductionMode::SinglePass,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutcome {
    pub summary: String,
    /// Chunks in the original document.
    pub chunk_count: usize,
    pub completion_calls: usize,
}

pub struct ChunkedSummarizer {
    service: Arc<dyn CompletionService>,
    settings: SummarizerSettings,
}

impl ChunkedSummarizer {
    pub fn new(service: Arc<dyn CompletionService>, settings: SummarizerSettings) -> Self {
        Self { service, settings }
    }

    pub fn settings(&self) -> &SummarizerSettings {
        &self.settings
    }

    pub async fn summarize_chunk(&self, chunk: &str, template: &PromptTemplate) -> Result<String> {
        let request = CompletionRequest {
            system_prompt: self.settings.system_prompt.clone(),
            user_prompt: template.render(chunk),
            max_output_tokens: self.settings.max_output_tokens,
            temperature: self.settings.temperature,
        };
        self.service.complete(request).await
    }

    pub async fn summarize_long(&self, text: &str, template: &PromptTemplate) -> Result<String> {
        let never = AtomicBool::new(false);
        self.summarize_document(text, template, &never)
            .await
            .map(|outcome| outcome.summary)
    }

    /// Like [`summarize_long`](Self::summarize_long), checking `cancel` before
    /// every completion call.
    pub async fn summarize_document(
        &self,
        text: &str,
        template: &PromptTemplate,
        cancel: &AtomicBool,
    ) -> Result<SummaryOutcome> {
        let max_chars = self.settings.max_chars;
        if max_chars == 0 {
            return Err(AppError::ConfigError("max_chars must be positive".to_string()));
        }
        if text.trim().is_empty() {
            return Err(AppError::ParseError("document is empty".to_string()));
        }

        let mut calls = 0;
        let mut chunk_count = None;
        let mut depth = 0;
        let mut current = text.to_string();

        let joined = loop {
            let chunks = chunk_text(&current, max_chars);
            let total = chunks.len();
            chunk_count.get_or_insert(total);
            depth += 1;

            let mut partials = Vec::with_capacity(total);
            for (idx, chunk) in chunks.into_iter().enumerate() {
                check_cancelled(cancel)?;
                info!(
                    "Summarizing chunk {}/{} ({} chars, level {})",
                    idx + 1,
                    total,
                    chunk.chars().count(),
                    depth
                );
                partials.push(self.summarize_chunk(chunk, template).await?);
                calls += 1;
            }
            let joined = partials.join("\n");

            match self.settings.reduction {
                ReductionMode::Recursive { max_depth }
                    if depth < max_depth && joined.chars().count() > max_chars =>
                {
                    debug!(
                        "Joined partials are {} chars, summarizing again",
                        joined.chars().count()
                    );
                    current = joined;
                }
                _ => break joined,
            }
        };

        check_cancelled(cancel)?;
        info!("Reducing {} chars of partial summaries", joined.chars().count());
        let summary = self.summarize_chunk(&joined, template).await?;
        calls += 1;

        Ok(SummaryOutcome {
            summary,
            chunk_count: chunk_count.unwrap_or(0),
            completion_calls: calls,
        })
    }
}

fn check_cancelled(cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        return Err(AppError::Cancelled);
    }
    Ok(())
}
