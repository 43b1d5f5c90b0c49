mod embedded;
mod memory;
mod postgres;

pub use memory::MemoryNoteRepository;
pub use postgres::PgNoteRepository;

use async_trait::async_trait;

use crate::models::{NewNote, Note};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),
}

/// Storage for notes. Every method is a single atomic operation against the
/// backing store; callers get no cross-call isolation.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Persists a new note and returns it with its assigned id.
    async fn insert(&self, note: NewNote) -> Result<Note, RepositoryError>;

    /// Replaces the stored row with the same id. Returns `None` if the row
    /// no longer exists.
    async fn save(&self, note: &Note) -> Result<Option<Note>, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Note>, RepositoryError>;

    /// All notes, newest `created_at` first, ties broken by id descending.
    async fn find_all_order_by_created_at_desc(&self) -> Result<Vec<Note>, RepositoryError>;

    async fn exists_by_id(&self, id: i64) -> Result<bool, RepositoryError>;

    /// Returns whether a row was removed.
    async fn delete_by_id(&self, id: i64) -> Result<bool, RepositoryError>;
}
