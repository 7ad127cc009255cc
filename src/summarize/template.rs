use std::path::Path;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Slot,
}

/// A prompt with one content placeholder, written `{}` or `{name}`.
///
/// `{{` and `}}` produce literal braces. The placeholder may appear more than
/// once, but every occurrence must use the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
    placeholder: String,
}

impl PromptTemplate {
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut placeholder: Option<String> = None;
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => {
                                return Err(AppError::TemplateError(
                                    "unclosed '{' in prompt template".to_string(),
                                ));
                            }
                            Some(other) => name.push(other),
                        }
                    }
                    match &placeholder {
                        Some(existing) if *existing != name => {
                            return Err(AppError::TemplateError(format!(
                                "prompt template mixes placeholders {{{}}} and {{{}}}",
                                existing, name
                            )));
                        }
                        Some(_) => {}
                        None => placeholder = Some(name),
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot);
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(AppError::TemplateError(
                        "single '}' in prompt template".to_string(),
                    ));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let placeholder = placeholder.ok_or_else(|| {
            AppError::TemplateError("prompt template has no placeholder".to_string())
        })?;

        Ok(Self {
            segments,
            placeholder,
        })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::TemplateError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&source)
    }

    /// Placeholder name; empty for `{}`.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn render(&self, content: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot => out.push_str(content),
            }
        }
        out
    }
}
