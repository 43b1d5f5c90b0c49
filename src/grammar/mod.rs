mod languagetool;
mod rules;

pub use languagetool::LanguageToolEngine;
pub use rules::RuleEngine;

use async_trait::async_trait;

use std::sync::Arc;

use crate::dto::{GrammarCheckResponse, GrammarIssue};

/// Characters of surrounding text included on each side of an issue.
const CONTEXT_CHARS: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("request to grammar engine failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("grammar engine responded with {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid grammar rule: {0}")]
    Rule(#[from] regex::Error),
}

/// An issue as reported by an engine, before normalization.
/// Offsets and lengths count Unicode scalar values, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineMatch {
    pub message: String,
    pub offset: usize,
    pub length: usize,
    pub suggestions: Vec<String>,
}

#[async_trait]
pub trait GrammarEngine: Send + Sync {
    async fn check(&self, text: &str) -> Result<Vec<EngineMatch>, GrammarError>;
}

#[derive(Clone)]
pub struct GrammarService {
    engine: Arc<dyn GrammarEngine>,
}

impl GrammarService {
    pub fn new(engine: Arc<dyn GrammarEngine>) -> Self {
        Self { engine }
    }

    /// Checks `text` and reports issues ordered by position. Missing or blank
    /// text is answered without consulting the engine.
    pub async fn check_grammar(
        &self,
        text: Option<&str>,
    ) -> Result<GrammarCheckResponse, GrammarError> {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return Ok(GrammarCheckResponse {
                total_errors: 0,
                errors: Vec::new(),
                summary: "No text provided for grammar check.".to_string(),
            });
        };

        let mut matches = self.engine.check(text).await?;
        matches.sort_by_key(|m| (m.offset, m.length));

        let chars: Vec<char> = text.chars().collect();
        let errors: Vec<GrammarIssue> = matches
            .into_iter()
            .map(|m| normalize(&chars, m))
            .collect();

        let summary = if errors.is_empty() {
            "No grammar issues found!".to_string()
        } else {
            format!("Found {} potential grammar issue(s).", errors.len())
        };

        tracing::debug!("Grammar check found {} issue(s)", errors.len());

        Ok(GrammarCheckResponse {
            total_errors: errors.len(),
            errors,
            summary,
        })
    }
}

fn normalize(chars: &[char], m: EngineMatch) -> GrammarIssue {
    let start = m.offset.min(chars.len());
    let end = (m.offset + m.length).min(chars.len());

    let preceding = &chars[..start];
    let line = 1 + preceding.iter().filter(|&&c| c == '\n').count();
    let column = 1 + preceding.iter().rev().take_while(|&&c| c != '\n').count();

    let context_start = start.saturating_sub(CONTEXT_CHARS);
    let context_end = (end + CONTEXT_CHARS).min(chars.len());

    GrammarIssue {
        message: m.message,
        line,
        column,
        length: end - start,
        context: chars[context_start..context_end].iter().collect(),
        suggestions: m.suggestions,
    }
}
