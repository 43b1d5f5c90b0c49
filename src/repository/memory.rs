//! In-memory note storage, used when no database is configured and in tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use std::collections::BTreeMap;

use super::{NoteRepository, RepositoryError};
use crate::models::{NewNote, Note};

#[derive(Default)]
struct State {
    last_id: i64,
    notes: BTreeMap<i64, Note>,
}

/// Notes kept in process memory. Data is lost on restart.
///
/// Ids start at 1 and are never reused, even after a delete.
#[derive(Default)]
pub struct MemoryNoteRepository {
    state: RwLock<State>,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn insert(&self, note: NewNote) -> Result<Note, RepositoryError> {
        let mut state = self.state.write().await;
        state.last_id += 1;

        let note = note.with_id(state.last_id);
        state.notes.insert(note.id, note.clone());

        Ok(note)
    }

    async fn save(&self, note: &Note) -> Result<Option<Note>, RepositoryError> {
        let mut state = self.state.write().await;

        Ok(state.notes.get_mut(&note.id).map(|stored| {
            stored.title.clone_from(&note.title);
            stored.content.clone_from(&note.content);
            stored.file_name.clone_from(&note.file_name);
            stored.updated_at = note.updated_at;
            stored.clone()
        }))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Note>, RepositoryError> {
        Ok(self.state.read().await.notes.get(&id).cloned())
    }

    async fn find_all_order_by_created_at_desc(&self) -> Result<Vec<Note>, RepositoryError> {
        let mut notes: Vec<Note> = self.state.read().await.notes.values().cloned().collect();
        notes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(notes)
    }

    async fn exists_by_id(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.state.read().await.notes.contains_key(&id))
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.state.write().await.notes.remove(&id).is_some())
    }
}
