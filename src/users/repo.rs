use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str =
    "id, email, username, first_name, last_name, avatar, password_hash, created_at";

pub async fn create(
    db: &PgPool,
    email: &str,
    username: &str,
    first_name: &str,
    last_name: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (email, username, first_name, last_name, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(email)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(password_hash)
    .fetch_one(db)
    .await
}

pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_by_ids(db: &PgPool, ids: &[Uuid]) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(db)
    .await
}

pub async fn list(db: &PgPool, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY username LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count(db: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await
}

pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_avatar(db: &PgPool, id: Uuid, avatar: Option<&str>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET avatar = $2 WHERE id = $1")
        .bind(id)
        .bind(avatar)
        .execute(db)
        .await?;
    Ok(())
}

/// Whether `viewer` follows `author`. Anonymous viewers never do.
pub async fn is_subscribed(
    db: &PgPool,
    viewer: Option<Uuid>,
    author: Uuid,
) -> Result<bool, sqlx::Error> {
    let Some(viewer) = viewer else {
        return Ok(false);
    };
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE user_id = $1 AND author_id = $2)",
    )
    .bind(viewer)
    .bind(author)
    .fetch_one(db)
    .await
}

/// Subset of `authors` the viewer follows, for decorating listings without a
/// query per row.
pub async fn subscribed_ids(
    db: &PgPool,
    viewer: Option<Uuid>,
    authors: &[Uuid],
) -> Result<HashSet<Uuid>, sqlx::Error> {
    let Some(viewer) = viewer else {
        return Ok(HashSet::new());
    };
    let rows = sqlx::query_scalar::<_, Uuid>(
        "SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = ANY($2)",
    )
    .bind(viewer)
    .bind(authors)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Inserts the follow edge. Returns false when the pair already exists.
/// The unique constraint closes the race between concurrent inserts.
pub async fn subscribe(db: &PgPool, user: Uuid, author: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user)
    .bind(author)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Removes the follow edge. Returns false when there was nothing to remove.
pub async fn unsubscribe(db: &PgPool, user: Uuid, author: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user)
        .bind(author)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// One page of authors the user follows, ordered by username for stable pages.
pub async fn followed_authors(
    db: &PgPool,
    user: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
               u.avatar, u.password_hash, u.created_at
        FROM subscriptions s
        JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn followed_authors_count(db: &PgPool, user: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
        .bind(user)
        .fetch_one(db)
        .await
}
