//! Email template handlers.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};

use clients_finder_core::{ClientId, EmailTemplateId, TargetTypeId, TemplateTargetType};

use super::Deleted;
use crate::db::{ClientRepository, TemplateRepository};
use crate::error::AppError;
use crate::extract::{Json, Path, Query};
use crate::models::{EmailTemplate, NewEmailTemplate, RenderedTemplate, TemplateChanges};
use crate::state::AppState;

/// Build the templates router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/templates", get(list_templates).post(create_template))
        .route(
            "/api/templates/{id}",
            get(get_template)
                .patch(update_template)
                .delete(delete_template),
        )
        .route("/api/templates/{id}/preview", get(preview_template))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateListQuery {
    target_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TemplatesResponse {
    pub templates: Vec<EmailTemplate>,
}

/// List templates, optionally for one target type.
async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateListQuery>,
) -> Result<Json<TemplatesResponse>, AppError> {
    let target_type = query
        .target_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse::<TemplateTargetType>)
        .transpose()
        .map_err(|_| AppError::BadRequest("Invalid targetType".to_string()))?;

    let templates = TemplateRepository::new(state.pool())
        .list(target_type)
        .await?;
    Ok(Json(TemplatesResponse { templates }))
}

/// Body of a template create.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub target_type: Option<TemplateTargetType>,
    pub custom_target_id: Option<TargetTypeId>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl TryFrom<CreateTemplateRequest> for NewEmailTemplate {
    type Error = AppError;

    fn try_from(req: CreateTemplateRequest) -> Result<Self, Self::Error> {
        let missing = || {
            AppError::BadRequest(
                "Missing required fields: name, subject, body, targetType".to_string(),
            )
        };
        let required = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        Ok(Self {
            name: required(req.name).ok_or_else(missing)?,
            subject: required(req.subject).ok_or_else(missing)?,
            body: required(req.body).ok_or_else(missing)?,
            target_type: req.target_type.ok_or_else(missing)?,
            custom_target_id: req.custom_target_id,
            attachments: req.attachments,
        })
    }
}

async fn create_template(
    State(state): State<AppState>,
    Json(body): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<EmailTemplate>), AppError> {
    let new = NewEmailTemplate::try_from(body)?;
    let template = TemplateRepository::new(state.pool()).create(&new).await?;
    tracing::info!(template_id = %template.id, name = %template.name, "Template created");
    Ok((StatusCode::CREATED, Json(template)))
}

async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<EmailTemplateId>,
) -> Result<Json<EmailTemplate>, AppError> {
    TemplateRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Template"))
}

async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<EmailTemplateId>,
    Json(changes): Json<TemplateChanges>,
) -> Result<Json<EmailTemplate>, AppError> {
    let repo = TemplateRepository::new(state.pool());
    if changes.is_empty() {
        return repo
            .get(id)
            .await?
            .map(Json)
            .ok_or(AppError::NotFound("Template"));
    }
    Ok(Json(repo.update(id, &changes).await?))
}

async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<EmailTemplateId>,
) -> Result<Json<Deleted>, AppError> {
    TemplateRepository::new(state.pool()).delete(id).await?;
    Ok(Json(Deleted::default()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewQuery {
    client_id: ClientId,
}

/// Render a template for one client.
async fn preview_template(
    State(state): State<AppState>,
    Path(id): Path<EmailTemplateId>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<RenderedTemplate>, AppError> {
    let template = TemplateRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or(AppError::NotFound("Template"))?;
    let client = ClientRepository::new(state.pool())
        .get(query.client_id)
        .await?
        .ok_or(AppError::NotFound("Client"))?;

    Ok(Json(template.render(&client)))
}
