use async_trait::async_trait;
use serde::Deserialize;

use std::time::Duration;

use super::{EngineMatch, GrammarEngine, GrammarError};

/// Client for the `/v2/check` endpoint of a LanguageTool server.
pub struct LanguageToolEngine {
    client: reqwest::Client,
    check_url: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    matches: Vec<RemoteMatch>,
}

#[derive(Debug, Deserialize)]
struct RemoteMatch {
    message: String,
    offset: usize,
    length: usize,
    #[serde(default)]
    replacements: Vec<Replacement>,
}

#[derive(Debug, Deserialize)]
struct Replacement {
    value: String,
}

impl LanguageToolEngine {
    pub fn new(base_url: &str, language: &str, timeout: Duration) -> Result<Self, GrammarError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            check_url: format!("{}/v2/check", base_url.trim_end_matches('/')),
            language: language.to_string(),
        })
    }
}

#[async_trait]
impl GrammarEngine for LanguageToolEngine {
    async fn check(&self, text: &str) -> Result<Vec<EngineMatch>, GrammarError> {
        let response = self
            .client
            .post(&self.check_url)
            .form(&[("text", text), ("language", self.language.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("LanguageTool returned error: {}", status);
            return Err(GrammarError::Status { status, body });
        }

        let body: CheckResponse = response.json().await?;

        Ok(into_matches(text, body))
    }
}

// LanguageTool reports positions in UTF-16 code units.
fn into_matches(text: &str, body: CheckResponse) -> Vec<EngineMatch> {
    body.matches
        .into_iter()
        .map(|m| {
            let start = utf16_to_char_offset(text, m.offset);
            let end = utf16_to_char_offset(text, m.offset + m.length);

            EngineMatch {
                message: m.message,
                offset: start,
                length: end - start,
                suggestions: m.replacements.into_iter().map(|r| r.value).collect(),
            }
        })
        .collect()
}

fn utf16_to_char_offset(text: &str, utf16_offset: usize) -> usize {
    let mut units = 0;

    for (index, c) in text.chars().enumerate() {
        if units >= utf16_offset {
            return index;
        }
        units += c.len_utf16();
    }

    text.chars().count()
}
