pub mod chunk;
pub mod pipeline;
pub mod profile;
pub mod template;

pub use chunk::{DEFAULT_MAX_CHARS, chunk_text};
pub use pipeline::{ChunkedSummarizer, ReductionMode, SummarizerSettings, SummaryOutcome};
pub use profile::SummaryProfile;
pub use template::PromptTemplate;
