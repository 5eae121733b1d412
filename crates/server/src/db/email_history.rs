//! Email history repository.

use sqlx::PgPool;

use clients_finder_core::ClientId;

use super::RepositoryError;
use crate::models::{EmailHistory, NewEmailHistory};

const HISTORY_COLUMNS: &str = "id, client_id, recipient, subject, body, method, status, \
     error_message, message_id, sent_at";

/// Repository for the outreach delivery log.
pub struct EmailHistoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EmailHistoryRepository<'a> {
    /// Create a new email history repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append one send attempt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the client does not exist.
    pub async fn record(&self, entry: &NewEmailHistory) -> Result<EmailHistory, RepositoryError> {
        sqlx::query_as::<_, EmailHistory>(&format!(
            "INSERT INTO email_history \
             (client_id, recipient, subject, body, method, status, error_message, message_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {HISTORY_COLUMNS}"
        ))
        .bind(entry.client_id)
        .bind(&entry.recipient)
        .bind(&entry.subject)
        .bind(&entry.body)
        .bind(entry.method)
        .bind(entry.status)
        .bind(&entry.error_message)
        .bind(&entry.message_id)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// A client's send attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_client(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<EmailHistory>, RepositoryError> {
        let rows = sqlx::query_as::<_, EmailHistory>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM email_history \
             WHERE client_id = $1 ORDER BY sent_at DESC, id DESC"
        ))
        .bind(client_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
