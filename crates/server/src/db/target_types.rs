//! Custom target type repository.

use sqlx::PgPool;

use clients_finder_core::TargetTypeId;

use super::RepositoryError;
use crate::models::{CustomTargetType, NewCustomTargetType};

/// Repository for user-defined template audiences.
pub struct TargetTypeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TargetTypeRepository<'a> {
    /// Create a new target type repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All custom target types, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<CustomTargetType>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomTargetType>(
            "SELECT id, name, description, color, created_at FROM custom_target_types \
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Create a custom target type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        new: &NewCustomTargetType,
    ) -> Result<CustomTargetType, RepositoryError> {
        let row = sqlx::query_as::<_, CustomTargetType>(
            r"
            INSERT INTO custom_target_types (name, description, color)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, color, created_at
            ",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.color)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Delete a custom target type. Templates referencing it are unlinked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it does not exist.
    pub async fn delete(&self, id: TargetTypeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM custom_target_types WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
