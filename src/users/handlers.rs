use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{password, AuthUser, MaybeAuthUser},
    error::ApiError,
    pagination::{Page, Pagination},
    recipes,
    state::AppState,
    users::{
        dto::{
            AvatarResponse, CreateUserRequest, RecipesLimitQuery, SetAvatarRequest,
            SetPasswordRequest, SubscriptionOut, UserOut,
        },
        repo,
        services::{is_data_url, validate_new_user},
    },
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users).post(register))
        .route("/users/:id/", get(get_user))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me/", get(me))
        .route("/users/me/avatar/", put(put_avatar).delete(delete_avatar))
        .route("/users/set_password/", post(set_password))
}

pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/users/subscriptions/", get(subscriptions))
        .route("/users/:id/subscribe/", post(subscribe).delete(unsubscribe))
}

#[instrument(skip(state))]
async fn list_users(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(p): Query<Pagination>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Page<UserOut>>, ApiError> {
    let page_size = p.page_size(state.config.page_size);
    let users = repo::list(&state.db, page_size, p.offset(page_size)).await?;
    let count = repo::count(&state.db).await?;

    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let followed = repo::subscribed_ids(&state.db, viewer, &ids).await?;
    let results = users
        .into_iter()
        .map(|u| {
            let is_subscribed = followed.contains(&u.id);
            UserOut::from_user(u, is_subscribed)
        })
        .collect();

    Ok(Json(Page::new(
        "/api/users/",
        &pairs,
        p,
        page_size,
        count,
        results,
    )))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserOut>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    validate_new_user(&payload)?;

    let hash = password::hash_password(&payload.password)?;
    let user = repo::create(
        &state.db,
        &payload.email,
        &payload.username,
        &payload.first_name,
        &payload.last_name,
        &hash,
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => {
            warn!(email = %payload.email, "email or username already taken");
            ApiError::Conflict("Email or username already registered".into())
        }
        other => other,
    })?;

    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserOut::from_user(user, false))))
}

#[instrument(skip(state))]
async fn get_user(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserOut>, ApiError> {
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    let is_subscribed = repo::is_subscribed(&state.db, viewer, user.id).await?;
    Ok(Json(UserOut::from_user(user, is_subscribed)))
}

#[instrument(skip(state))]
async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserOut>, ApiError> {
    let user = repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    Ok(Json(UserOut::from_user(user, false)))
}

#[instrument(skip(state, payload))]
async fn put_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SetAvatarRequest>,
) -> Result<Json<AvatarResponse>, ApiError> {
    if !is_data_url(&payload.avatar) {
        return Err(ApiError::validation(
            "avatar",
            "Expected a base64 image data URL",
        ));
    }
    repo::set_avatar(&state.db, user_id, Some(&payload.avatar)).await?;
    Ok(Json(AvatarResponse {
        avatar: payload.avatar,
    }))
}

#[instrument(skip(state))]
async fn delete_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, ApiError> {
    repo::set_avatar(&state.db, user_id, None).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
async fn set_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let user = repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    if !password::verify_password(&payload.current_password, &user.password_hash)? {
        return Err(ApiError::validation("current_password", "Wrong password"));
    }
    if payload.new_password.len() < 8 {
        return Err(ApiError::validation("new_password", "Password too short"));
    }

    let hash = password::hash_password(&payload.new_password)?;
    repo::set_password(&state.db, user_id, &hash).await?;
    info!(user_id = %user_id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
    Query(q): Query<RecipesLimitQuery>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Page<SubscriptionOut>>, ApiError> {
    let recipes_limit = q.validated()?;
    let page_size = p.page_size(state.config.page_size);
    let authors = repo::followed_authors(&state.db, user_id, page_size, p.offset(page_size)).await?;
    let count = repo::followed_authors_count(&state.db, user_id).await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(author_with_recipes(&state, author, true, recipes_limit).await?);
    }

    Ok(Json(Page::new(
        "/api/users/subscriptions/",
        &pairs,
        p,
        page_size,
        count,
        results,
    )))
}

#[instrument(skip(state))]
async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
    Query(q): Query<RecipesLimitQuery>,
) -> Result<(StatusCode, Json<SubscriptionOut>), ApiError> {
    let recipes_limit = q.validated()?;
    let author = repo::find_by_id(&state.db, author_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if author.id == user_id {
        return Err(ApiError::validation(
            "author",
            "Cannot subscribe to yourself",
        ));
    }

    if !repo::subscribe(&state.db, user_id, author.id).await? {
        return Err(ApiError::Conflict("Already subscribed".into()));
    }

    info!(user_id = %user_id, author_id = %author.id, "subscribed");
    let body = author_with_recipes(&state, author, true, recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state))]
async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let author = repo::find_by_id(&state.db, author_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !repo::unsubscribe(&state.db, user_id, author.id).await? {
        return Err(ApiError::Conflict("Not subscribed".into()));
    }
    info!(user_id = %user_id, author_id = %author.id, "unsubscribed");
    Ok(StatusCode::NO_CONTENT)
}

async fn author_with_recipes(
    state: &AppState,
    author: crate::users::repo::User,
    is_subscribed: bool,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionOut, ApiError> {
    let author_id = author.id;
    let preview = recipes::repo::minified_by_author(&state.db, author_id, recipes_limit).await?;
    let recipes_count = recipes::repo::count_by_author(&state.db, author_id).await?;
    Ok(SubscriptionOut {
        author: UserOut::from_user(author, is_subscribed),
        recipes: preview,
        recipes_count,
    })
}
