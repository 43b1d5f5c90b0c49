use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

use std::sync::Arc;

use crate::{
    dto::{NoteRequest, NoteResponse},
    models::NewNote,
    repository::{NoteRepository, RepositoryError},
};

/// Suffix an uploaded file must carry to be accepted as a note.
pub const MARKDOWN_EXTENSION: &str = ".md";

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("{0}")]
    Validation(String),

    #[error("Note not found with id: {0}")]
    NotFound(i64),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

#[derive(Clone)]
pub struct NoteService {
    repo: Arc<dyn NoteRepository>,
}

impl NoteService {
    pub fn new(repo: Arc<dyn NoteRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_note(&self, request: NoteRequest) -> Result<NoteResponse, NoteError> {
        let (title, content) = require_fields(request)?;
        let now = now();

        let note = self
            .repo
            .insert(NewNote {
                title,
                content,
                file_name: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!("Created note {}", note.id);

        Ok(note.into())
    }

    /// Creates a note from an uploaded markdown file. The title is the file
    /// name without its `.md` suffix. Invalid UTF-8 is replaced with U+FFFD.
    pub async fn upload_note(
        &self,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<NoteResponse, NoteError> {
        if bytes.is_empty() {
            return Err(NoteError::Validation("File is empty".to_string()));
        }

        let (file_name, title) = file_name
            .and_then(|name| {
                name.strip_suffix(MARKDOWN_EXTENSION)
                    .map(|title| (name.to_string(), title.to_string()))
            })
            .ok_or_else(|| NoteError::Validation("Only .md files are allowed".to_string()))?;

        let content = String::from_utf8_lossy(bytes).into_owned();
        let now = now();

        let note = self
            .repo
            .insert(NewNote {
                title,
                content,
                file_name: Some(file_name),
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(
            "Created note {} from upload '{}'",
            note.id,
            note.file_name.as_deref().unwrap_or_default()
        );

        Ok(note.into())
    }

    pub async fn get_all_notes(&self) -> Result<Vec<NoteResponse>, NoteError> {
        let notes = self.repo.find_all_order_by_created_at_desc().await?;

        Ok(notes.into_iter().map(NoteResponse::from).collect())
    }

    pub async fn get_one_note(&self, id: i64) -> Result<NoteResponse, NoteError> {
        self.repo
            .find_by_id(id)
            .await?
            .map(NoteResponse::from)
            .ok_or(NoteError::NotFound(id))
    }

    /// Replaces title and content. `created_at` and `file_name` are kept.
    pub async fn update_note(
        &self,
        id: i64,
        request: NoteRequest,
    ) -> Result<NoteResponse, NoteError> {
        let mut note = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(NoteError::NotFound(id))?;

        let (title, content) = require_fields(request)?;
        note.title = title;
        note.content = content;
        note.updated_at = next_update_time(note.updated_at);

        // The row can vanish between the read and the write.
        let note = self
            .repo
            .save(&note)
            .await?
            .ok_or(NoteError::NotFound(id))?;

        tracing::info!("Updated note {}", note.id);

        Ok(note.into())
    }

    pub async fn delete_note(&self, id: i64) -> Result<(), NoteError> {
        if !self.repo.exists_by_id(id).await? || !self.repo.delete_by_id(id).await? {
            return Err(NoteError::NotFound(id));
        }

        tracing::info!("Deleted note {}", id);

        Ok(())
    }

    pub async fn get_note_content(&self, id: i64) -> Result<String, NoteError> {
        self.repo
            .find_by_id(id)
            .await?
            .map(|note| note.content)
            .ok_or(NoteError::NotFound(id))
    }
}

fn require_fields(request: NoteRequest) -> Result<(String, String), NoteError> {
    let title = request
        .title
        .ok_or_else(|| NoteError::Validation("Title is required".to_string()))?;
    let content = request
        .content
        .ok_or_else(|| NoteError::Validation("Content is required".to_string()))?;

    Ok((title, content))
}

// Microsecond precision matches what postgres stores, so a note reads back
// with exactly the timestamps it was written with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn next_update_time(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}
