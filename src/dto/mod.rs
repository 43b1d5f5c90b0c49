use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Note;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    /// Note ID
    pub id: i64,
    /// Note title
    pub title: String,
    /// Markdown source
    pub content: String,
    /// Original filename, for notes created by upload
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            file_name: note.file_name,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// Body of both create and update requests. Fields are optional so that a
/// null or missing value is reported as a validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrammarCheckRequest {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderRequest {
    pub markdown: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderResponse {
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarCheckResponse {
    pub total_errors: usize,
    pub errors: Vec<GrammarIssue>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarIssue {
    pub message: String,
    /// 1-based line of the issue start
    pub line: usize,
    /// 1-based column of the issue start
    pub column: usize,
    /// Length of the flagged region in characters
    pub length: usize,
    /// Flagged region with up to 20 characters on either side
    pub context: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: String,
    pub message: String,
}
