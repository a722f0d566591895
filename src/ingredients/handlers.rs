use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{error::ApiError, ingredients::repo, state::AppState};

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

pub fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients/", get(list_ingredients))
        .route("/ingredients/:id/", get(get_ingredient))
}

#[instrument(skip(state))]
async fn list_ingredients(
    State(state): State<AppState>,
    Query(q): Query<IngredientQuery>,
) -> Result<Json<Vec<repo::Ingredient>>, ApiError> {
    Ok(Json(repo::list(&state.db, q.name.as_deref()).await?))
}

#[instrument(skip(state))]
async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<repo::Ingredient>, ApiError> {
    let ingredient = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ingredient not found".into()))?;
    Ok(Json(ingredient))
}
