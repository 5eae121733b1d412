//! Custom target type handlers.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};

use clients_finder_core::TargetTypeId;

use super::Deleted;
use crate::db::TargetTypeRepository;
use crate::error::AppError;
use crate::extract::{Json, Path};
use crate::models::{CustomTargetType, NewCustomTargetType};
use crate::state::AppState;

/// Build the target types router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/target-types",
            get(list_target_types).post(create_target_type),
        )
        .route("/api/target-types/{id}", delete(delete_target_type))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetTypesResponse {
    pub target_types: Vec<CustomTargetType>,
}

async fn list_target_types(
    State(state): State<AppState>,
) -> Result<Json<TargetTypesResponse>, AppError> {
    let target_types = TargetTypeRepository::new(state.pool()).list().await?;
    Ok(Json(TargetTypesResponse { target_types }))
}

#[derive(Debug, Deserialize)]
pub struct CreateTargetTypeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

async fn create_target_type(
    State(state): State<AppState>,
    Json(body): Json<CreateTargetTypeRequest>,
) -> Result<(StatusCode, Json<CustomTargetType>), AppError> {
    let new = NewCustomTargetType::parse(
        body.name.as_deref(),
        body.description.as_deref(),
        body.color.as_deref(),
    )
    .map_err(|msg| AppError::BadRequest(msg.to_string()))?;

    let target_type = TargetTypeRepository::new(state.pool()).create(&new).await?;
    Ok((StatusCode::CREATED, Json(target_type)))
}

async fn delete_target_type(
    State(state): State<AppState>,
    Path(id): Path<TargetTypeId>,
) -> Result<Json<Deleted>, AppError> {
    TargetTypeRepository::new(state.pool()).delete(id).await?;
    Ok(Json(Deleted::default()))
}
