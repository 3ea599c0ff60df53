// Suggestion handlers: evaluate stored/posted metrics, manage dismissals and notes

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use super::{AppState, ApiError};
use crate::models::{Suggestion, SuggestionBoard, SuggestionPref};
use crate::suggestions::{SuggestionInput, generate_suggestions, partition_suggestions};

const MAX_ID_LEN: usize = 64;
const MAX_NOTE_LEN: usize = 2000;

/// GET /api/suggestions — evaluates the stored history (latest row included) and applies prefs.
pub(super) async fn board_handler(
    State(state): State<AppState>,
) -> Result<Json<SuggestionBoard>, ApiError> {
    let history = state
        .metrics_repo
        .get_recent(state.config.database.max_history)
        .await?;
    let suggestions = generate_suggestions(history.last(), &history, &state.config.suggestions);
    let prefs = state.metrics_repo.get_suggestion_prefs().await?;
    Ok(Json(partition_suggestions(suggestions, &prefs)))
}

/// POST /api/suggestions/evaluate — pure evaluation of `{ latest, history }`.
pub(super) async fn evaluate_handler(
    State(state): State<AppState>,
    Json(input): Json<SuggestionInput>,
) -> Json<Vec<Suggestion>> {
    Json(input.evaluate(&state.config.suggestions))
}

/// POST /api/suggestions/{id}/dismiss
pub(super) async fn dismiss_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuggestionPref>, ApiError> {
    validate_id(&id)?;
    Ok(Json(state.metrics_repo.dismiss_suggestion(&id).await?))
}

/// POST /api/suggestions/{id}/restore
pub(super) async fn restore_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuggestionPref>, ApiError> {
    validate_id(&id)?;
    Ok(Json(state.metrics_repo.restore_suggestion(&id).await?))
}

#[derive(Debug, Deserialize)]
pub(super) struct NoteBody {
    note: String,
}

/// PUT /api/suggestions/{id}/note — body `{ "note": "..." }`.
pub(super) async fn note_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<NoteBody>,
) -> Result<Json<SuggestionPref>, ApiError> {
    validate_id(&id)?;
    if body.note.chars().count() > MAX_NOTE_LEN {
        return Err(ApiError::BadRequest(format!(
            "note must be at most {} characters",
            MAX_NOTE_LEN
        )));
    }
    Ok(Json(
        state
            .metrics_repo
            .update_suggestion_note(&id, &body.note)
            .await?,
    ))
}

fn validate_id(id: &str) -> Result<(), ApiError> {
    let ok = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid suggestion id: {:?}", id)))
    }
}
