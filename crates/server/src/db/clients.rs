//! Client repository for database operations.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use clients_finder_core::{ClientId, ClientStatus};

use super::{ClientFilter, RepositoryError};
use crate::models::{Client, NewClient};

const CLIENT_COLUMNS: &str = "id, place_id, name, category, address, street, city, state, \
     postcode, country, country_code, phone, email, website, latitude, longitude, status, \
     opening_hours, facilities, datasource, created_at, updated_at";

/// Result of inserting a client keyed by `place_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(ClientId),
    /// A row with the same `place_id` already exists.
    AlreadyExists,
}

/// Navigation direction through a filtered client list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Next newer client (ascending `created_at`).
    Next,
    /// Next older client (descending `created_at`).
    Prev,
}

impl Direction {
    /// Row-value cursor over the `(created_at, id)` sort key.
    const fn comparison(self) -> &'static str {
        match self {
            Self::Next => "(created_at, id) > (",
            Self::Prev => "(created_at, id) < (",
        }
    }

    fn push_cursor(
        self,
        qb: &mut QueryBuilder<'_, Postgres>,
        created_at: DateTime<Utc>,
        id: ClientId,
    ) {
        qb.push(self.comparison())
            .push_bind(created_at)
            .push(", ")
            .push_bind(id)
            .push(")");
    }

    const fn order(self) -> &'static str {
        match self {
            Self::Next => " ORDER BY created_at ASC, id ASC LIMIT 1",
            Self::Prev => " ORDER BY created_at DESC, id DESC LIMIT 1",
        }
    }
}

/// Repository for client database operations.
#[derive(Clone, Copy)]
pub struct ClientRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ClientRepository<'a> {
    /// Create a new client repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List clients matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ClientFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Client>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {CLIENT_COLUMNS} FROM clients"));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = limit.filter(|l| *l >= 0) {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = offset.filter(|o| *o > 0) {
            qb.push(" OFFSET ").push_bind(offset);
        }

        Ok(qb.build_query_as::<Client>().fetch_all(self.pool).await?)
    }

    /// Count clients matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &ClientFilter) -> Result<i64, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clients");
        filter.push_where(&mut qb);
        Ok(qb.build_query_scalar::<i64>().fetch_one(self.pool).await?)
    }

    /// Get a client by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(client)
    }

    /// Set a client's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the client does not exist.
    pub async fn update_status(
        &self,
        id: ClientId,
        status: ClientStatus,
    ) -> Result<Client, RepositoryError> {
        sqlx::query_as::<_, Client>(&format!(
            "UPDATE clients SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Apply the post-outreach status transition.
    ///
    /// Returns the new status when it changed. The update only applies if the
    /// status has not moved since it was read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the client does not exist.
    pub async fn advance_after_outreach(
        &self,
        id: ClientId,
    ) -> Result<Option<ClientStatus>, RepositoryError> {
        let current: ClientStatus = sqlx::query_scalar("SELECT status FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let next = current.after_outreach();
        if next == current {
            return Ok(None);
        }

        let updated = sqlx::query(
            "UPDATE clients SET status = $2, updated_at = NOW() WHERE id = $1 AND status = $3",
        )
        .bind(id)
        .bind(next)
        .bind(current)
        .execute(self.pool)
        .await?;

        Ok((updated.rows_affected() > 0).then_some(next))
    }

    /// Delete a client; notes and email history cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the client does not exist.
    pub async fn delete(&self, id: ClientId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Look up a client ID by its places-provider identifier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_place_id(
        &self,
        place_id: &str,
    ) -> Result<Option<ClientId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, ClientId>("SELECT id FROM clients WHERE place_id = $1")
            .bind(place_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(id)
    }

    /// Insert a new `PENDING` client unless its `place_id` is already stored.
    ///
    /// A concurrent insert of the same `place_id` resolves to
    /// [`InsertOutcome::AlreadyExists`] through the unique constraint.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, client: &NewClient) -> Result<InsertOutcome, RepositoryError> {
        let id = sqlx::query_scalar::<_, ClientId>(
            r"
            INSERT INTO clients (
                place_id, name, category, address, street, city, state, postcode,
                country, country_code, phone, email, website, latitude, longitude,
                status, opening_hours, facilities, datasource
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19)
            ON CONFLICT (place_id) DO NOTHING
            RETURNING id
            ",
        )
        .bind(&client.place_id)
        .bind(&client.name)
        .bind(&client.category)
        .bind(&client.address)
        .bind(&client.street)
        .bind(&client.city)
        .bind(&client.state)
        .bind(&client.postcode)
        .bind(&client.country)
        .bind(&client.country_code)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(&client.website)
        .bind(client.latitude)
        .bind(client.longitude)
        .bind(ClientStatus::Pending)
        .bind(&client.opening_hours)
        .bind(&client.facilities)
        .bind(&client.datasource)
        .fetch_optional(self.pool)
        .await?;

        Ok(id.map_or(InsertOutcome::AlreadyExists, InsertOutcome::Inserted))
    }

    /// Find the client adjacent to `id` within `filter`, wrapping around at
    /// either end of the list.
    ///
    /// Returns `None` only when nothing matches the filter at all.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `id` does not exist.
    pub async fn adjacent(
        &self,
        id: ClientId,
        direction: Direction,
        filter: &ClientFilter,
    ) -> Result<Option<ClientId>, RepositoryError> {
        let created_at: DateTime<Utc> =
            sqlx::query_scalar("SELECT created_at FROM clients WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM clients");
        let mut conds = filter.push_where(&mut qb);
        conds.next(&mut qb);
        direction.push_cursor(&mut qb, created_at, id);
        qb.push(direction.order());

        if let Some(found) = qb
            .build_query_scalar::<ClientId>()
            .fetch_optional(self.pool)
            .await?
        {
            return Ok(Some(found));
        }

        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM clients");
        filter.push_where(&mut qb);
        qb.push(direction.order());

        Ok(qb
            .build_query_scalar::<ClientId>()
            .fetch_optional(self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parses_lowercase() {
        let next: Direction = serde_json::from_str("\"next\"").unwrap_or(Direction::Prev);
        assert_eq!(next, Direction::Next);
        assert!(serde_json::from_str::<Direction>("\"sideways\"").is_err());
    }

    #[test]
    fn test_direction_sql_fragments() {
        assert!(Direction::Next.order().contains("ASC"));
        assert!(Direction::Prev.order().contains("DESC"));
    }

    #[test]
    fn test_cursor_breaks_ties_on_id() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM clients WHERE ");
        Direction::Next.push_cursor(&mut qb, Utc::now(), ClientId::new(7));
        qb.push(Direction::Next.order());
        assert_eq!(
            qb.sql(),
            "SELECT id FROM clients WHERE (created_at, id) > ($1, $2) \
             ORDER BY created_at ASC, id ASC LIMIT 1"
        );

        let mut qb = QueryBuilder::<Postgres>::new("");
        Direction::Prev.push_cursor(&mut qb, Utc::now(), ClientId::new(7));
        assert_eq!(qb.sql(), "(created_at, id) < ($1, $2)");
    }
}
