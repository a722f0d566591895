use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{AuthUser, MaybeAuthUser},
    error::ApiError,
    pagination::{Page, Pagination},
    recipes::{
        dto::{
            IngredientInRecipe, RecipeFilters, RecipeMinified, RecipeOut, RecipePayload,
            RecipeUpdatePayload, ShortLinkResponse,
        },
        repo, shopping_list,
    },
    state::AppState,
    tags::repo::Tag,
    users::{self, dto::UserOut},
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/", get(list_recipes))
        .route("/recipes/:id/", get(get_recipe))
        .route("/recipes/:id/get-link/", get(get_link))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/", post(create_recipe))
        .route(
            "/recipes/:id/",
            axum::routing::patch(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/:id/favorite/", post(favorite).delete(unfavorite))
        .route(
            "/recipes/:id/shopping_cart/",
            post(cart_add).delete(cart_remove),
        )
        .route(
            "/recipes/download_shopping_cart/",
            get(download_shopping_cart),
        )
}

#[instrument(skip(state))]
async fn list_recipes(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(p): Query<Pagination>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Page<RecipeOut>>, ApiError> {
    let filters = RecipeFilters::from_pairs(&pairs)?;
    let page_size = p.page_size(state.config.page_size);
    let rows = repo::list(&state.db, viewer, &filters, page_size, p.offset(page_size)).await?;
    let count = repo::count(&state.db, viewer, &filters).await?;
    let results = hydrate(&state, viewer, rows).await?;
    Ok(Json(Page::new(
        "/api/recipes/",
        &pairs,
        p,
        page_size,
        count,
        results,
    )))
}

#[instrument(skip(state, payload))]
async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecipePayload>,
) -> Result<(StatusCode, Json<RecipeOut>), ApiError> {
    payload.validate()?;
    let recipe_id = repo::create(&state.db, user_id, &payload).await?;
    info!(user_id = %user_id, recipe_id = %recipe_id, "recipe created");
    let body = load_one(&state, Some(user_id), recipe_id).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state))]
async fn get_recipe(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeOut>, ApiError> {
    Ok(Json(load_one(&state, viewer, id).await?))
}

#[instrument(skip(state, payload))]
async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipeUpdatePayload>,
) -> Result<Json<RecipeOut>, ApiError> {
    require_author(&state, id, user_id).await?;
    payload.validate()?;
    repo::update(&state.db, id, &payload).await?;
    info!(user_id = %user_id, recipe_id = %id, "recipe updated");
    Ok(Json(load_one(&state, Some(user_id), id).await?))
}

#[instrument(skip(state))]
async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_author(&state, id, user_id).await?;
    repo::delete(&state.db, id).await?;
    info!(user_id = %user_id, recipe_id = %id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeMinified>), ApiError> {
    let recipe = find_minified(&state, id).await?;
    if !repo::favorite_add(&state.db, user_id, id).await? {
        return Err(ApiError::Conflict("Already in favorites".into()));
    }
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[instrument(skip(state))]
async fn unfavorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    find_minified(&state, id).await?;
    if !repo::favorite_remove(&state.db, user_id, id).await? {
        return Err(ApiError::Conflict("Not in favorites".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn cart_add(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeMinified>), ApiError> {
    let recipe = find_minified(&state, id).await?;
    if !repo::cart_add(&state.db, user_id, id).await? {
        return Err(ApiError::Conflict("Already in shopping cart".into()));
    }
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[instrument(skip(state))]
async fn cart_remove(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    find_minified(&state, id).await?;
    if !repo::cart_remove(&state.db, user_id, id).await? {
        return Err(ApiError::Conflict("Not in shopping cart".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShortLinkResponse>, ApiError> {
    if repo::author_of(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("Recipe not found".into()));
    }
    Ok(Json(ShortLinkResponse {
        short_link: format!("{}/r/{}", state.config.base_url, id),
    }))
}

/// Resolves a short link to the recipe detail endpoint. Mounted at /r/:id,
/// outside the /api prefix.
#[instrument(skip(state))]
pub async fn short_link_redirect(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Redirect, ApiError> {
    if repo::author_of(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("Recipe not found".into()));
    }
    Ok(Redirect::temporary(&format!("/api/recipes/{}/", id)))
}

#[instrument(skip(state))]
async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<([(header::HeaderName, &'static str); 1], String), ApiError> {
    let lines = repo::cart_ingredient_lines(&state.db, user_id).await?;
    let items = shopping_list::aggregate(lines);
    let body = shopping_list::render(&items);
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}

async fn require_author(state: &AppState, recipe_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
    let author = repo::author_of(&state.db, recipe_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;
    if author != user_id {
        return Err(ApiError::Forbidden(
            "Only the author can modify this recipe".into(),
        ));
    }
    Ok(())
}

async fn find_minified(state: &AppState, recipe_id: Uuid) -> Result<RecipeMinified, ApiError> {
    repo::minified(&state.db, recipe_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))
}

async fn load_one(
    state: &AppState,
    viewer: Option<Uuid>,
    recipe_id: Uuid,
) -> Result<RecipeOut, ApiError> {
    let row = repo::get(&state.db, viewer, recipe_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;
    let mut out = hydrate(state, viewer, vec![row]).await?;
    out.pop()
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))
}

/// Attaches tags, ingredient lines and author profiles to a page of recipe
/// rows with one query per relation instead of one per recipe.
async fn hydrate(
    state: &AppState,
    viewer: Option<Uuid>,
    rows: Vec<repo::RecipeRow>,
) -> Result<Vec<RecipeOut>, ApiError> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for tag in repo::tags_for(&state.db, &ids).await? {
        tags_by_recipe.entry(tag.recipe_id).or_default().push(Tag {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
        });
    }

    let mut lines_by_recipe: HashMap<Uuid, Vec<IngredientInRecipe>> = HashMap::new();
    for line in repo::ingredient_lines_for(&state.db, &ids).await? {
        lines_by_recipe
            .entry(line.recipe_id)
            .or_default()
            .push(IngredientInRecipe {
                id: line.id,
                name: line.name,
                measurement_unit: line.measurement_unit,
                amount: line.amount,
            });
    }

    let author_ids: Vec<Uuid> = {
        let mut ids: Vec<Uuid> = rows.iter().map(|r| r.author_id).collect();
        ids.sort();
        ids.dedup();
        ids
    };
    let authors: HashMap<Uuid, users::repo::User> =
        users::repo::find_by_ids(&state.db, &author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
    let followed = users::repo::subscribed_ids(&state.db, viewer, &author_ids).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let author = authors
            .get(&row.author_id)
            .cloned()
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("recipe author missing")))?;
        out.push(RecipeOut {
            id: row.id,
            tags: tags_by_recipe.remove(&row.id).unwrap_or_default(),
            author: UserOut::from_user(author, followed.contains(&row.author_id)),
            ingredients: lines_by_recipe.remove(&row.id).unwrap_or_default(),
            is_favorited: row.is_favorited,
            is_in_shopping_cart: row.is_in_shopping_cart,
            name: row.name,
            image: row.image,
            text: row.text,
            cooking_time: row.cooking_time,
        });
    }
    Ok(out)
}
