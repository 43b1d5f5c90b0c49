use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};

use super::{NoteRepository, RepositoryError, embedded::migrations};
use crate::models::{NewNote, Note};

pub struct PgNoteRepository {
    client: Client,
}

impl PgNoteRepository {
    pub async fn new(database_dsn: &str) -> Result<Self, RepositoryError> {
        let (client, con) = tokio_postgres::connect(database_dsn, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = con.await {
                tracing::error!("connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    pub async fn migrate(&mut self) -> Result<(), RepositoryError> {
        let migrations_report = migrations::runner().run_async(&mut self.client).await?;

        for migration in migrations_report.applied_migrations() {
            tracing::info!(
                "Migration Applied -  Name: {}, Version: {}",
                migration.name(),
                migration.version()
            );
        }

        tracing::info!("DB migrations finished!");

        Ok(())
    }
}

fn note_from_row(row: &Row) -> Note {
    Note {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        file_name: row.get("file_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, note: NewNote) -> Result<Note, RepositoryError> {
        let row = self
            .client
            .query_one(
                "INSERT INTO notes (title, content, file_name, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING id, title, content, file_name, created_at, updated_at",
                &[
                    &note.title,
                    &note.content,
                    &note.file_name,
                    &note.created_at,
                    &note.updated_at,
                ],
            )
            .await?;

        Ok(note_from_row(&row))
    }

    async fn save(&self, note: &Note) -> Result<Option<Note>, RepositoryError> {
        let row = self
            .client
            .query_opt(
                "UPDATE notes SET title = $1, content = $2, file_name = $3, updated_at = $4 \
                 WHERE id = $5 \
                 RETURNING id, title, content, file_name, created_at, updated_at",
                &[
                    &note.title,
                    &note.content,
                    &note.file_name,
                    &note.updated_at,
                    &note.id,
                ],
            )
            .await?;

        Ok(row.as_ref().map(note_from_row))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Note>, RepositoryError> {
        let row = self
            .client
            .query_opt(
                "SELECT id, title, content, file_name, created_at, updated_at \
                 FROM notes WHERE id = $1",
                &[&id],
            )
            .await?;

        Ok(row.as_ref().map(note_from_row))
    }

    async fn find_all_order_by_created_at_desc(&self) -> Result<Vec<Note>, RepositoryError> {
        let rows = self
            .client
            .query(
                "SELECT id, title, content, file_name, created_at, updated_at \
                 FROM notes ORDER BY created_at DESC, id DESC",
                &[],
            )
            .await?;

        Ok(rows.iter().map(note_from_row).collect())
    }

    async fn exists_by_id(&self, id: i64) -> Result<bool, RepositoryError> {
        let row = self
            .client
            .query_one("SELECT EXISTS(SELECT 1 FROM notes WHERE id = $1)", &[&id])
            .await?;

        Ok(row.get(0))
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, RepositoryError> {
        let rows = self
            .client
            .execute("DELETE FROM notes WHERE id = $1", &[&id])
            .await?;

        Ok(rows == 1)
    }
}
