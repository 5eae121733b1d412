//! HTTP route handlers for the CRM JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                           - Health check
//! GET  /health/ready                     - Readiness (database reachable)
//!
//! # Clients
//! GET    /api/clients                    - Filtered, paginated listing
//! GET    /api/clients/export             - Filtered listing as .xlsx
//! GET    /api/clients/{id}               - Client detail
//! PATCH  /api/clients/{id}               - Change status
//! DELETE /api/clients/{id}               - Delete client (notes and history cascade)
//! GET    /api/clients/{id}/navigation    - Next/previous client within filters
//! GET    /api/clients/{id}/email-history - Outreach attempts, newest first
//! GET    /api/clients/{id}/templates     - Applicable templates, rendered
//!
//! # Notes
//! GET    /api/clients/{id}/notes             - List notes
//! POST   /api/clients/{id}/notes             - Add note
//! PATCH  /api/clients/{id}/notes/{note_id}   - Edit note
//! DELETE /api/clients/{id}/notes/{note_id}   - Remove note
//!
//! # Ingestion
//! POST /api/clients/auto-fetch           - Multi-location places ingestion
//! GET  /api/clients/search               - Single-center ingestion
//! POST /api/clients/geocode              - Address to coordinates
//!
//! # Templates
//! GET    /api/templates                  - List (optional targetType filter)
//! POST   /api/templates                  - Create
//! GET    /api/templates/{id}             - Detail
//! PATCH  /api/templates/{id}             - Partial update
//! DELETE /api/templates/{id}             - Delete
//! GET    /api/templates/{id}/preview     - Render for ?clientId=
//! POST   /api/templates/upload           - Upload attachment via upload API
//!
//! # Target types
//! GET    /api/target-types               - List custom target types
//! POST   /api/target-types               - Create
//! DELETE /api/target-types/{id}          - Delete
//!
//! # Outreach and storage
//! POST /api/send-email                   - Send outreach email
//! POST /api/upload                       - Upload file to S3 storage
//! ```

pub mod clients;
pub mod ingestion;
pub mod notes;
pub mod outreach;
pub mod target_types;
pub mod templates;
pub mod uploads;

use axum::Router;
use serde::Serialize;

use crate::state::AppState;

/// Body returned by delete endpoints.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub success: bool,
}

impl Default for Deleted {
    fn default() -> Self {
        Self { success: true }
    }
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(clients::router())
        .merge(notes::router())
        .merge(ingestion::router())
        .merge(templates::router())
        .merge(target_types::router())
        .merge(outreach::router())
        .merge(uploads::router())
}
