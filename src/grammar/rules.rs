//! Small in-process grammar checker. It covers a handful of common English
//! mistakes and needs no external service.

use async_trait::async_trait;
use regex::Regex;

use super::{EngineMatch, GrammarEngine, GrammarError};

/// Words starting with a vowel letter that still take "a".
const CONSONANT_SOUND_PREFIXES: &[&str] = &["uni", "use", "usu", "uti", "ura", "eu", "one", "once"];

pub struct RuleEngine {
    singular_agreement: Regex,
    plural_agreement: Regex,
    a_before_vowel: Regex,
    an_before_consonant: Regex,
    word: Regex,
}

impl RuleEngine {
    pub fn new() -> Result<Self, GrammarError> {
        Ok(Self {
            singular_agreement: Regex::new(r"(?i)\b(this|it|he|she)\s+(are|were|have)\b")?,
            plural_agreement: Regex::new(r"(?i)\b(they|we|these|those)\s+(is|was|has)\b")?,
            a_before_vowel: Regex::new(r"(?i)\b(a)\s+([aeiou]\w*)")?,
            an_before_consonant: Regex::new(r"(?i)\b(an)\s+([bcdfgjklmnpqrstvwxz]\w*)")?,
            word: Regex::new(r"\b\w+\b")?,
        })
    }

    fn check_text(&self, text: &str) -> Vec<EngineMatch> {
        let mut matches = Vec::new();

        self.agreement(text, &mut matches);
        self.articles(text, &mut matches);
        self.repeated_words(text, &mut matches);

        matches
    }

    fn agreement(&self, text: &str, out: &mut Vec<EngineMatch>) {
        for caps in self.singular_agreement.captures_iter(text) {
            let (whole, subject, verb) = (&caps[0], &caps[1], &caps[2]);
            let fixed = match verb.to_lowercase().as_str() {
                "are" => "is",
                "were" => "was",
                _ => "has",
            };

            let mut suggestions = vec![format!("{subject} {fixed}")];
            if subject.eq_ignore_ascii_case("this") {
                suggestions.push(format!("{} {}", match_case("these", subject), verb));
            }

            out.push(span(
                text,
                caps.get(0).map_or(0, |m| m.start()),
                whole,
                format!("The verb '{verb}' does not agree with the singular subject '{subject}'."),
                suggestions,
            ));
        }

        for caps in self.plural_agreement.captures_iter(text) {
            let (whole, subject, verb) = (&caps[0], &caps[1], &caps[2]);
            let fixed = match verb.to_lowercase().as_str() {
                "is" => "are",
                "was" => "were",
                _ => "have",
            };

            out.push(span(
                text,
                caps.get(0).map_or(0, |m| m.start()),
                whole,
                format!("The verb '{verb}' does not agree with the plural subject '{subject}'."),
                vec![format!("{subject} {fixed}")],
            ));
        }
    }

    fn articles(&self, text: &str, out: &mut Vec<EngineMatch>) {
        for caps in self.a_before_vowel.captures_iter(text) {
            let (Some(article), Some(next)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let lower = next.as_str().to_lowercase();
            if CONSONANT_SOUND_PREFIXES.iter().any(|p| lower.starts_with(p)) {
                continue;
            }

            out.push(span(
                text,
                article.start(),
                article.as_str(),
                format!("Use 'an' instead of 'a' before '{}'.", next.as_str()),
                vec![match_case("an", article.as_str())],
            ));
        }

        for caps in self.an_before_consonant.captures_iter(text) {
            let (Some(article), Some(next)) = (caps.get(1), caps.get(2)) else {
                continue;
            };

            out.push(span(
                text,
                article.start(),
                article.as_str(),
                format!("Use 'a' instead of 'an' before '{}'.", next.as_str()),
                vec![match_case("a", article.as_str())],
            ));
        }
    }

    fn repeated_words(&self, text: &str, out: &mut Vec<EngineMatch>) {
        let words: Vec<_> = self.word.find_iter(text).collect();

        for pair in words.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            let gap = &text[first.end()..second.start()];

            if gap.is_empty()
                || !gap.chars().all(char::is_whitespace)
                || first.as_str().chars().all(|c| c.is_ascii_digit())
                || !first.as_str().eq_ignore_ascii_case(second.as_str())
            {
                continue;
            }

            out.push(span(
                text,
                first.start(),
                &text[first.start()..second.end()],
                "Possible typo: you repeated a word.".to_string(),
                vec![first.as_str().to_string()],
            ));
        }
    }
}

#[async_trait]
impl GrammarEngine for RuleEngine {
    async fn check(&self, text: &str) -> Result<Vec<EngineMatch>, GrammarError> {
        Ok(self.check_text(text))
    }
}

/// Builds a match from a byte position, converting to character offsets.
fn span(
    text: &str,
    byte_start: usize,
    flagged: &str,
    message: String,
    suggestions: Vec<String>,
) -> EngineMatch {
    EngineMatch {
        message,
        offset: text[..byte_start].chars().count(),
        length: flagged.chars().count(),
        suggestions,
    }
}

/// Capitalizes `word` when `like` starts with an uppercase letter.
fn match_case(word: &str, like: &str) -> String {
    let upper = like.chars().next().is_some_and(char::is_uppercase);
    let mut chars = word.chars();

    match chars.next() {
        Some(first) if upper => first.to_uppercase().chain(chars).collect(),
        _ => word.to_string(),
    }
}
