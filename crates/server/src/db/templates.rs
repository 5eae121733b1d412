//! Email template repository.

use sqlx::{PgPool, Postgres, QueryBuilder};

use clients_finder_core::{EmailTemplateId, TemplateTargetType};

use super::RepositoryError;
use crate::models::{EmailTemplate, NewEmailTemplate, TemplateChanges};

const TEMPLATE_COLUMNS: &str = "id, name, subject, body, target_type, custom_target_id, \
     attachments, created_at, updated_at";

/// Repository for email templates.
pub struct TemplateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TemplateRepository<'a> {
    /// Create a new template repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List templates, newest first, optionally restricted to one target type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        target_type: Option<TemplateTargetType>,
    ) -> Result<Vec<EmailTemplate>, RepositoryError> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {TEMPLATE_COLUMNS} FROM email_templates"));
        if let Some(target_type) = target_type {
            qb.push(" WHERE target_type = ").push_bind(target_type);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        Ok(qb
            .build_query_as::<EmailTemplate>()
            .fetch_all(self.pool)
            .await?)
    }

    /// Get a template by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: EmailTemplateId) -> Result<Option<EmailTemplate>, RepositoryError> {
        let template = sqlx::query_as::<_, EmailTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM email_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(template)
    }

    /// Create a template.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if `custom_target_id` does not exist.
    pub async fn create(&self, new: &NewEmailTemplate) -> Result<EmailTemplate, RepositoryError> {
        sqlx::query_as::<_, EmailTemplate>(&format!(
            "INSERT INTO email_templates \
             (name, subject, body, target_type, custom_target_id, attachments) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {TEMPLATE_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.subject)
        .bind(&new.body)
        .bind(new.target_type)
        .bind(new.custom_target_id)
        .bind(&new.attachments)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the template does not exist and
    /// `RepositoryError::Conflict` for an unknown `custom_target_id`.
    pub async fn update(
        &self,
        id: EmailTemplateId,
        changes: &TemplateChanges,
    ) -> Result<EmailTemplate, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE email_templates SET updated_at = NOW()");
        push_changes(&mut qb, changes);
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {TEMPLATE_COLUMNS}"));

        qb.build_query_as::<EmailTemplate>()
            .fetch_optional(self.pool)
            .await
            .map_err(RepositoryError::from_write)?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a template.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the template does not exist.
    pub async fn delete(&self, id: EmailTemplateId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM email_templates WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn push_changes(qb: &mut QueryBuilder<'_, Postgres>, changes: &TemplateChanges) {
    if let Some(name) = &changes.name {
        qb.push(", name = ").push_bind(name.clone());
    }
    if let Some(subject) = &changes.subject {
        qb.push(", subject = ").push_bind(subject.clone());
    }
    if let Some(body) = &changes.body {
        qb.push(", body = ").push_bind(body.clone());
    }
    if let Some(target_type) = changes.target_type {
        qb.push(", target_type = ").push_bind(target_type);
    }
    if let Some(custom_target_id) = changes.custom_target_id {
        qb.push(", custom_target_id = ").push_bind(custom_target_id);
    }
    if let Some(attachments) = &changes.attachments {
        qb.push(", attachments = ").push_bind(attachments.clone());
    }
}
