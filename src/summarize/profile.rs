use serde::{Deserialize, Serialize};

use super::pipeline::SummarizerSettings;

/// Which kind of document is being summarized. Each profile brings its own
/// persona, limits and prompt template file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryProfile {
    FinancialReport,
    #[default]
    WebContent,
    Transcript,
    MindMap,
}

impl SummaryProfile {
    pub fn system_prompt(self) -> &'static str {
        match self {
            SummaryProfile::FinancialReport | SummaryProfile::WebContent => {
                "You are a highly skilled financial analyst."
            }
            SummaryProfile::Transcript => "You are an assistant that summarizes video transcripts.",
            SummaryProfile::MindMap => {
                "You are an assistant that analyzes transcripts and produces Markdown mind-map outlines."
            }
        }
    }

    /// File name under the prompts directory.
    pub fn template_file(self) -> &'static str {
        match self {
            SummaryProfile::FinancialReport => "financial_analyst.txt",
            SummaryProfile::WebContent => "url_summary.txt",
            SummaryProfile::Transcript => "summary.txt",
            SummaryProfile::MindMap => "mindmap.txt",
        }
    }

    /// Chunk size override; `None` keeps the configured default.
    pub fn max_chars(self) -> Option<usize> {
        match self {
            SummaryProfile::MindMap => Some(2000),
            _ => None,
        }
    }

    pub fn max_output_tokens(self) -> u32 {
        match self {
            SummaryProfile::MindMap => 1500,
            _ => 3000,
        }
    }

    /// Heading used when the model's reply has none.
    pub fn title(self) -> &'static str {
        match self {
            SummaryProfile::FinancialReport => "Financial Report Analysis",
            SummaryProfile::WebContent => "Website Summary",
            SummaryProfile::Transcript => "Video Summary",
            SummaryProfile::MindMap => "Mind Map",
        }
    }

    pub fn settings(self, base: &SummarizerSettings) -> SummarizerSettings {
        SummarizerSettings {
            max_chars: self.max_chars().unwrap_or(base.max_chars),
            system_prompt: self.system_prompt().to_string(),
            max_output_tokens: self.max_output_tokens(),
            temperature: base.temperature,
            reduction: base.reduction,
        }
    }
}
