//! Client notes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use clients_finder_core::{ClientId, NoteId};

/// A free-text note attached to a client.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub client_id: ClientId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
