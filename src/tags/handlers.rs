use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState, tags::repo};

pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/tags/", get(list_tags))
        .route("/tags/:id/", get(get_tag))
}

#[instrument(skip(state))]
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<repo::Tag>>, ApiError> {
    Ok(Json(repo::list(&state.db).await?))
}

#[instrument(skip(state))]
async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<repo::Tag>, ApiError> {
    let tag = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag not found".into()))?;
    Ok(Json(tag))
}
