use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

/// Escapes LIKE metacharacters so a user-supplied prefix matches literally.
fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Lists ingredients, optionally narrowed to a case-insensitive name prefix.
pub async fn list(db: &PgPool, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, sqlx::Error> {
    let pattern = name_prefix.map(|p| format!("{}%", escape_like(p)));
    sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, name, measurement_unit
        FROM ingredients
        WHERE $1::text IS NULL OR name ILIKE $1
        ORDER BY name, measurement_unit
        "#,
    )
    .bind(pattern)
    .fetch_all(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Ingredient>, sqlx::Error> {
    sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(escape_like("50% cocoa"), "50\\% cocoa");
        assert_eq!(escape_like("under_score"), "under\\_score");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("flour"), "flour");
    }
}
