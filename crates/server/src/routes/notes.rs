//! Client note handlers.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};

use clients_finder_core::{ClientId, NoteId};

use super::Deleted;
use crate::db::{NoteRepository, RepositoryError};
use crate::error::AppError;
use crate::extract::{Json, Path};
use crate::models::Note;
use crate::state::AppState;

/// Build the notes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/clients/{id}/notes",
            get(list_notes).post(create_note),
        )
        .route(
            "/api/clients/{id}/notes/{note_id}",
            patch(update_note).delete(delete_note),
        )
}

/// Note body for create and edit.
#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub content: Option<String>,
}

impl NoteRequest {
    fn content(&self) -> Result<&str, AppError> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::BadRequest("Note content is required".to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub notes: Vec<Note>,
}

async fn list_notes(
    State(state): State<AppState>,
    Path(client_id): Path<ClientId>,
) -> Result<Json<NotesResponse>, AppError> {
    let notes = NoteRepository::new(state.pool())
        .list_for_client(client_id)
        .await?;
    Ok(Json(NotesResponse { notes }))
}

async fn create_note(
    State(state): State<AppState>,
    Path(client_id): Path<ClientId>,
    Json(body): Json<NoteRequest>,
) -> Result<(StatusCode, Json<Note>), AppError> {
    let content = body.content()?;
    let note = NoteRepository::new(state.pool())
        .create(client_id, content)
        .await
        .map_err(|e| match e {
            // The only foreign key on notes is the client.
            RepositoryError::Conflict(_) => AppError::NotFound("Client"),
            other => other.into(),
        })?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn update_note(
    State(state): State<AppState>,
    Path((client_id, note_id)): Path<(ClientId, NoteId)>,
    Json(body): Json<NoteRequest>,
) -> Result<Json<Note>, AppError> {
    let content = body.content()?;
    let note = NoteRepository::new(state.pool())
        .update(client_id, note_id, content)
        .await?;
    Ok(Json(note))
}

async fn delete_note(
    State(state): State<AppState>,
    Path((client_id, note_id)): Path<(ClientId, NoteId)>,
) -> Result<Json<Deleted>, AppError> {
    NoteRepository::new(state.pool())
        .delete(client_id, note_id)
        .await?;
    Ok(Json(Deleted::default()))
}
