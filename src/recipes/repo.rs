use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::recipes::dto::{
    IngredientAmount, RecipeFilters, RecipeMinified, RecipePayload, RecipeUpdatePayload,
};
use crate::recipes::shopping_list::IngredientLine;

/// Recipe row decorated with viewer-relative flags. `is_favorited` and
/// `is_in_shopping_cart` come from EXISTS subqueries against the viewer id
/// and are false for anonymous viewers.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, FromRow)]
pub struct RecipeTagRow {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, FromRow)]
pub struct RecipeIngredientRow {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

const RECIPE_SELECT: &str = r#"
    SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time,
           EXISTS(SELECT 1 FROM favorites f
                  WHERE f.recipe_id = r.id AND f.user_id = $1) AS is_favorited,
           EXISTS(SELECT 1 FROM shopping_cart c
                  WHERE c.recipe_id = r.id AND c.user_id = $1) AS is_in_shopping_cart
    FROM recipes r
"#;

const RECIPE_FILTER: &str = r#"
    WHERE ($2::uuid IS NULL OR r.author_id = $2)
      AND (cardinality($3::text[]) = 0 OR EXISTS(
               SELECT 1 FROM recipe_tags rt
               JOIN tags t ON t.id = rt.tag_id
               WHERE rt.recipe_id = r.id AND t.slug = ANY($3)))
      AND ($4::bool IS NULL OR $4 = EXISTS(
               SELECT 1 FROM favorites f
               WHERE f.recipe_id = r.id AND f.user_id = $1))
      AND ($5::bool IS NULL OR $5 = EXISTS(
               SELECT 1 FROM shopping_cart c
               WHERE c.recipe_id = r.id AND c.user_id = $1))
"#;

pub async fn list(
    db: &PgPool,
    viewer: Option<Uuid>,
    filters: &RecipeFilters,
    limit: i64,
    offset: i64,
) -> Result<Vec<RecipeRow>, sqlx::Error> {
    let sql = format!(
        "{RECIPE_SELECT} {RECIPE_FILTER} ORDER BY r.created_at DESC LIMIT $6 OFFSET $7"
    );
    sqlx::query_as::<_, RecipeRow>(&sql)
        .bind(viewer)
        .bind(filters.author)
        .bind(&filters.tags)
        .bind(filters.is_favorited)
        .bind(filters.is_in_shopping_cart)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
}

pub async fn count(
    db: &PgPool,
    viewer: Option<Uuid>,
    filters: &RecipeFilters,
) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM recipes r {RECIPE_FILTER}");
    // $1 is unused by COUNT itself but keeps the filter placeholders aligned.
    sqlx::query_scalar::<_, i64>(&sql)
        .bind(viewer)
        .bind(filters.author)
        .bind(&filters.tags)
        .bind(filters.is_favorited)
        .bind(filters.is_in_shopping_cart)
        .fetch_one(db)
        .await
}

pub async fn get(
    db: &PgPool,
    viewer: Option<Uuid>,
    id: Uuid,
) -> Result<Option<RecipeRow>, sqlx::Error> {
    let sql = format!("{RECIPE_SELECT} WHERE r.id = $2");
    sqlx::query_as::<_, RecipeRow>(&sql)
        .bind(viewer)
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Author id only, for permission checks without dragging the full row.
pub async fn author_of(db: &PgPool, id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT author_id FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn tags_for(db: &PgPool, recipe_ids: &[Uuid]) -> Result<Vec<RecipeTagRow>, sqlx::Error> {
    sqlx::query_as::<_, RecipeTagRow>(
        r#"
        SELECT rt.recipe_id, t.id, t.name, t.slug
        FROM recipe_tags rt
        JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
}

pub async fn ingredient_lines_for(
    db: &PgPool,
    recipe_ids: &[Uuid],
) -> Result<Vec<RecipeIngredientRow>, sqlx::Error> {
    sqlx::query_as::<_, RecipeIngredientRow>(
        r#"
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY i.name
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
}

async fn check_references<'a>(
    tx: &mut sqlx::Transaction<'a, sqlx::Postgres>,
    tags: &[Uuid],
    ingredients: &[IngredientAmount],
) -> Result<(), ApiError> {
    let ingredient_ids: Vec<Uuid> = ingredients.iter().map(|l| l.id).collect();
    let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients WHERE id = ANY($1)")
        .bind(&ingredient_ids)
        .fetch_one(&mut **tx)
        .await?;
    if found != ingredient_ids.len() as i64 {
        return Err(ApiError::validation(
            "ingredients",
            "Unknown ingredient id",
        ));
    }

    let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
        .bind(tags)
        .fetch_one(&mut **tx)
        .await?;
    if found != tags.len() as i64 {
        return Err(ApiError::validation("tags", "Unknown tag id"));
    }
    Ok(())
}

async fn insert_relations<'a>(
    tx: &mut sqlx::Transaction<'a, sqlx::Postgres>,
    recipe_id: Uuid,
    tags: &[Uuid],
    ingredients: &[IngredientAmount],
) -> Result<(), sqlx::Error> {
    for tag_id in tags {
        sqlx::query(
            "INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(recipe_id)
        .bind(tag_id)
        .execute(&mut **tx)
        .await?;
    }
    for line in ingredients {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES ($1, $2, $3)",
        )
        .bind(recipe_id)
        .bind(line.id)
        .bind(line.amount)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Creates the recipe and its tag/ingredient relations in one transaction.
/// The author is always the acting user.
pub async fn create(db: &PgPool, author: Uuid, payload: &RecipePayload) -> Result<Uuid, ApiError> {
    let mut tx = db.begin().await.map_err(ApiError::from)?;
    check_references(&mut tx, &payload.tags, &payload.ingredients).await?;

    let recipe_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(author)
    .bind(&payload.name)
    .bind(&payload.image)
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(ApiError::from)?;

    insert_relations(&mut tx, recipe_id, &payload.tags, &payload.ingredients)
        .await
        .map_err(ApiError::from)?;
    tx.commit().await.map_err(ApiError::from)?;
    Ok(recipe_id)
}

/// Replaces the recipe's tag/ingredient sets (delete-then-insert) and patches
/// the scalar fields, keeping current values where the payload omits them.
/// All in one transaction.
pub async fn update(
    db: &PgPool,
    recipe_id: Uuid,
    payload: &RecipeUpdatePayload,
) -> Result<(), ApiError> {
    let mut tx = db.begin().await.map_err(ApiError::from)?;
    check_references(&mut tx, &payload.tags, &payload.ingredients).await?;

    sqlx::query(
        r#"
        UPDATE recipes
        SET name = COALESCE($2, name),
            image = COALESCE($3, image),
            text = COALESCE($4, text),
            cooking_time = COALESCE($5, cooking_time),
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(recipe_id)
    .bind(&payload.name)
    .bind(&payload.image)
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .execute(&mut *tx)
    .await
    .map_err(ApiError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::from)?;
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::from)?;

    insert_relations(&mut tx, recipe_id, &payload.tags, &payload.ingredients)
        .await
        .map_err(ApiError::from)?;
    tx.commit().await.map_err(ApiError::from)?;
    Ok(())
}

pub async fn delete(db: &PgPool, recipe_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn minified(db: &PgPool, recipe_id: Uuid) -> Result<Option<RecipeMinified>, sqlx::Error> {
    sqlx::query_as::<_, RecipeMinified>(
        "SELECT id, name, image, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(recipe_id)
    .fetch_optional(db)
    .await
}

/// Newest-first preview of an author's recipes; NULL limit means all of them.
pub async fn minified_by_author(
    db: &PgPool,
    author: Uuid,
    limit: Option<i64>,
) -> Result<Vec<RecipeMinified>, sqlx::Error> {
    sqlx::query_as::<_, RecipeMinified>(
        r#"
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(author)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn count_by_author(db: &PgPool, author: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author)
        .fetch_one(db)
        .await
}

/// Inserts into favorites; false means the pair already existed.
pub async fn favorite_add(db: &PgPool, user: Uuid, recipe: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user)
    .bind(recipe)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn favorite_remove(db: &PgPool, user: Uuid, recipe: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user)
        .bind(recipe)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn cart_add(db: &PgPool, user: Uuid, recipe: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO shopping_cart (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user)
    .bind(recipe)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn cart_remove(db: &PgPool, user: Uuid, recipe: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
        .bind(user)
        .bind(recipe)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Every ingredient line across every recipe in the user's cart, ungrouped.
/// Aggregation happens in [`crate::recipes::shopping_list`].
pub async fn cart_ingredient_lines(
    db: &PgPool,
    user: Uuid,
) -> Result<Vec<IngredientLine>, sqlx::Error> {
    sqlx::query_as::<_, IngredientLine>(
        r#"
        SELECT i.name, i.measurement_unit, ri.amount
        FROM shopping_cart c
        JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        "#,
    )
    .bind(user)
    .fetch_all(db)
    .await
}
