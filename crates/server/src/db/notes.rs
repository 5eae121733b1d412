//! Note repository for database operations.

use sqlx::PgPool;

use clients_finder_core::{ClientId, NoteId};

use super::RepositoryError;
use crate::models::Note;

/// Repository for client notes.
pub struct NoteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NoteRepository<'a> {
    /// Create a new note repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a client's notes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<Note>, RepositoryError> {
        let notes = sqlx::query_as::<_, Note>(
            r"
            SELECT id, client_id, content, created_at, updated_at
            FROM notes
            WHERE client_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(client_id)
        .fetch_all(self.pool)
        .await?;

        Ok(notes)
    }

    /// Add a note to a client.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the client does not exist.
    pub async fn create(&self, client_id: ClientId, content: &str) -> Result<Note, RepositoryError> {
        sqlx::query_as::<_, Note>(
            r"
            INSERT INTO notes (client_id, content)
            VALUES ($1, $2)
            RETURNING id, client_id, content, created_at, updated_at
            ",
        )
        .bind(client_id)
        .bind(content)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Replace a note's content.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the note does not belong to the client.
    pub async fn update(
        &self,
        client_id: ClientId,
        note_id: NoteId,
        content: &str,
    ) -> Result<Note, RepositoryError> {
        sqlx::query_as::<_, Note>(
            r"
            UPDATE notes SET content = $3, updated_at = NOW()
            WHERE id = $1 AND client_id = $2
            RETURNING id, client_id, content, created_at, updated_at
            ",
        )
        .bind(note_id)
        .bind(client_id)
        .bind(content)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a note.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the note does not belong to the client.
    pub async fn delete(&self, client_id: ClientId, note_id: NoteId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND client_id = $2")
            .bind(note_id)
            .bind(client_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
