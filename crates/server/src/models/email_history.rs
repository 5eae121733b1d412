//! Outreach delivery log.

use chrono::{DateTime, Utc};
use serde::Serialize;

use clients_finder_core::{ClientId, DeliveryStatus, EmailHistoryId, EmailMethod};

/// One send attempt to a client, successful or not.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmailHistory {
    pub id: EmailHistoryId,
    pub client_id: ClientId,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub method: EmailMethod,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    /// Provider message id, when the transport returned one.
    pub message_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Fields for recording a send attempt.
#[derive(Debug, Clone)]
pub struct NewEmailHistory {
    pub client_id: ClientId,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub method: EmailMethod,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub message_id: Option<String>,
}
