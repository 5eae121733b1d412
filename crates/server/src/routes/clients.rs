//! Client list, detail, status, navigation and export handlers.

use axum::{
    Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use clients_finder_core::{ClientId, ClientStatus};

use super::Deleted;
use crate::db::{
    ClientFilter, ClientQuery, ClientRepository, Direction, EmailHistoryRepository,
    TemplateRepository,
};
use crate::error::AppError;
use crate::extract::{Json, Path, Query};
use crate::models::{Client, EmailHistory, RenderedTemplate};
use crate::services::{XLSX_CONTENT_TYPE, clients_workbook, export_filename};
use crate::state::AppState;

/// Build the clients router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(list_clients))
        .route("/api/clients/export", get(export_clients))
        .route(
            "/api/clients/{id}",
            get(get_client).patch(update_client).delete(delete_client),
        )
        .route("/api/clients/{id}/navigation", get(navigate))
        .route("/api/clients/{id}/email-history", get(email_history))
        .route("/api/clients/{id}/templates", get(applicable_templates))
}

/// Filtered client page.
#[derive(Debug, Serialize)]
pub struct ClientListResponse {
    pub clients: Vec<Client>,
    /// Number of matching clients, ignoring pagination.
    pub total: i64,
}

/// List clients matching the query filters, newest first.
#[tracing::instrument(skip(state))]
async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ClientQuery>,
) -> Result<Json<ClientListResponse>, AppError> {
    let filter = ClientFilter::from(&query);
    let repo = ClientRepository::new(state.pool());

    let clients = repo.list(&filter, query.limit, query.offset).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(ClientListResponse { clients, total }))
}

async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<ClientId>,
) -> Result<Json<Client>, AppError> {
    ClientRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Client"))
}

/// Body of a status change.
#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub status: Option<String>,
}

async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<ClientId>,
    Json(body): Json<UpdateClientRequest>,
) -> Result<Json<Client>, AppError> {
    let status: ClientStatus = body
        .status
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing required field: status".to_string()))?
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid status".to_string()))?;

    let client = ClientRepository::new(state.pool())
        .update_status(id, status)
        .await?;
    tracing::info!(client_id = %id, status = %status, "Client status updated");
    Ok(Json(client))
}

async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<ClientId>,
) -> Result<Json<Deleted>, AppError> {
    ClientRepository::new(state.pool()).delete(id).await?;
    tracing::info!(client_id = %id, "Client deleted");
    Ok(Json(Deleted::default()))
}

#[derive(Debug, Deserialize)]
struct NavigationQuery {
    direction: Direction,
}

/// Adjacent client within the current filters.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResponse {
    pub client_id: Option<ClientId>,
}

/// Step to the next or previous client, wrapping at either end.
async fn navigate(
    State(state): State<AppState>,
    Path(id): Path<ClientId>,
    Query(nav): Query<NavigationQuery>,
    Query(query): Query<ClientQuery>,
) -> Result<Json<NavigationResponse>, AppError> {
    let filter = ClientFilter::from(&query);
    let client_id = ClientRepository::new(state.pool())
        .adjacent(id, nav.direction, &filter)
        .await?;
    Ok(Json(NavigationResponse { client_id }))
}

/// Export the filtered client list as a spreadsheet.
#[tracing::instrument(skip(state))]
async fn export_clients(
    State(state): State<AppState>,
    Query(query): Query<ClientQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ClientFilter::from(&query);
    let clients = ClientRepository::new(state.pool())
        .list(&filter, None, None)
        .await?;

    let workbook = clients_workbook(&clients)?;
    let filename = export_filename(&filter, Utc::now());
    tracing::info!(rows = clients.len(), filename = %filename, "Clients exported");

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        workbook,
    ))
}

#[derive(Debug, Serialize)]
pub struct EmailHistoryResponse {
    pub history: Vec<EmailHistory>,
}

async fn email_history(
    State(state): State<AppState>,
    Path(id): Path<ClientId>,
) -> Result<Json<EmailHistoryResponse>, AppError> {
    let history = EmailHistoryRepository::new(state.pool())
        .list_for_client(id)
        .await?;
    Ok(Json(EmailHistoryResponse { history }))
}

#[derive(Debug, Serialize)]
pub struct ApplicableTemplatesResponse {
    pub templates: Vec<RenderedTemplate>,
}

/// Templates whose target type matches the client, rendered for it.
async fn applicable_templates(
    State(state): State<AppState>,
    Path(id): Path<ClientId>,
) -> Result<Json<ApplicableTemplatesResponse>, AppError> {
    let client = ClientRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or(AppError::NotFound("Client"))?;

    let has_website = client.has_website();
    let templates = TemplateRepository::new(state.pool())
        .list(None)
        .await?
        .into_iter()
        .filter(|t| t.target_type.applies_to(has_website))
        .map(|t| t.render(&client))
        .collect();

    Ok(Json(ApplicableTemplatesResponse { templates }))
}
