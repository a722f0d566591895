use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::tags::repo::Tag;
use crate::users::dto::UserOut;

/// One `{id, amount}` pair in a recipe payload.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), ApiError> {
    if ingredients.is_empty() {
        return Err(ApiError::validation(
            "ingredients",
            "At least one ingredient is required",
        ));
    }
    let mut seen = HashSet::new();
    for line in ingredients {
        if !seen.insert(line.id) {
            return Err(ApiError::validation(
                "ingredients",
                "Ingredients must be unique",
            ));
        }
        if line.amount < 1 {
            return Err(ApiError::validation(
                "ingredients",
                "Amount must be at least 1",
            ));
        }
    }
    Ok(())
}

fn validate_tags(tags: &[Uuid]) -> Result<(), ApiError> {
    if tags.is_empty() {
        return Err(ApiError::validation("tags", "At least one tag is required"));
    }
    Ok(())
}

/// Create payload. The list fields default so a missing `ingredients` or
/// `tags` key is reported as a field error rather than a body parse failure.
#[derive(Debug, Deserialize)]
pub struct RecipePayload {
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipePayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_ingredients(&self.ingredients)?;
        validate_tags(&self.tags)?;
        if self.name.trim().is_empty() {
            return Err(ApiError::validation("name", "This field is required"));
        }
        if self.image.is_empty() {
            return Err(ApiError::validation("image", "This field is required"));
        }
        if self.cooking_time < 1 {
            return Err(ApiError::validation(
                "cooking_time",
                "Cooking time must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Update payload. Ingredient and tag sets are still mandatory and replaced
/// wholesale, but scalar fields may be omitted to keep their current values.
#[derive(Debug, Deserialize)]
pub struct RecipeUpdatePayload {
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

impl RecipeUpdatePayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_ingredients(&self.ingredients)?;
        validate_tags(&self.tags)?;
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ApiError::validation("name", "This field may not be blank"));
            }
        }
        if let Some(image) = &self.image {
            if image.is_empty() {
                return Err(ApiError::validation("image", "This field may not be blank"));
            }
        }
        if let Some(time) = self.cooking_time {
            if time < 1 {
                return Err(ApiError::validation(
                    "cooking_time",
                    "Cooking time must be at least 1",
                ));
            }
        }
        Ok(())
    }
}

/// Filters for the recipe listing. `tags` may repeat (`?tags=a&tags=b`) so
/// these are parsed from raw query pairs rather than a derived struct.
#[derive(Debug, Default, PartialEq)]
pub struct RecipeFilters {
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "True" => Some(true),
        "0" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl RecipeFilters {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut filters = RecipeFilters::default();
        for (key, value) in pairs {
            match key.as_str() {
                "author" => {
                    let id = value
                        .parse::<Uuid>()
                        .map_err(|_| ApiError::validation("author", "Invalid author id"))?;
                    filters.author = Some(id);
                }
                "tags" => filters.tags.push(value.clone()),
                "is_favorited" => filters.is_favorited = parse_flag(value),
                "is_in_shopping_cart" => filters.is_in_shopping_cart = parse_flag(value),
                _ => {}
            }
        }
        Ok(filters)
    }
}

/// Ingredient line as rendered inside a recipe response.
#[derive(Debug, Serialize)]
pub struct IngredientInRecipe {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe representation for list and detail responses.
#[derive(Debug, Serialize)]
pub struct RecipeOut {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserOut,
    pub ingredients: Vec<IngredientInRecipe>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Short form used by favorite/cart responses and subscription previews.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecipeMinified {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Debug, Serialize)]
pub struct ShortLinkResponse {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RecipePayload {
        RecipePayload {
            ingredients: vec![
                IngredientAmount {
                    id: Uuid::new_v4(),
                    amount: 200,
                },
                IngredientAmount {
                    id: Uuid::new_v4(),
                    amount: 2,
                },
            ],
            tags: vec![Uuid::new_v4()],
            name: "Pancakes".into(),
            image: "data:image/png;base64,iVBORw0KGgo=".into(),
            text: "Mix and fry.".into(),
            cooking_time: 20,
        }
    }

    #[test]
    fn accepts_well_formed_payload() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn rejects_empty_ingredients() {
        let mut p = payload();
        p.ingredients.clear();
        let err = p.validate().unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation { field: "ingredients", .. }
        ));
    }

    #[test]
    fn rejects_duplicate_ingredient_ids() {
        let mut p = payload();
        let dup = p.ingredients[0].id;
        p.ingredients.push(IngredientAmount { id: dup, amount: 5 });
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_zero_amount() {
        let mut p = payload();
        p.ingredients[0].amount = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_empty_tags() {
        let mut p = payload();
        p.tags.clear();
        let err = p.validate().unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "tags", .. }));
    }

    #[test]
    fn rejects_zero_cooking_time() {
        let mut p = payload();
        p.cooking_time = 0;
        let err = p.validate().unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation { field: "cooking_time", .. }
        ));
    }

    #[test]
    fn create_payload_missing_lists_fail_field_validation() {
        let p: RecipePayload = serde_json::from_value(serde_json::json!({
            "name": "Pancakes",
            "image": "data:image/png;base64,iVBORw0KGgo=",
            "text": "Mix and fry.",
            "cooking_time": 20
        }))
        .unwrap();
        let err = p.validate().unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation { field: "ingredients", .. }
        ));
    }

    fn update_payload() -> RecipeUpdatePayload {
        RecipeUpdatePayload {
            ingredients: vec![IngredientAmount {
                id: Uuid::new_v4(),
                amount: 100,
            }],
            tags: vec![Uuid::new_v4()],
            name: None,
            image: None,
            text: None,
            cooking_time: None,
        }
    }

    #[test]
    fn update_accepts_lists_only() {
        assert!(update_payload().validate().is_ok());
    }

    #[test]
    fn update_parses_without_scalar_fields() {
        let p: RecipeUpdatePayload = serde_json::from_value(serde_json::json!({
            "ingredients": [{"id": Uuid::new_v4(), "amount": 3}],
            "tags": [Uuid::new_v4()],
            "cooking_time": 15
        }))
        .unwrap();
        assert!(p.name.is_none());
        assert_eq!(p.cooking_time, Some(15));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn update_still_requires_ingredients_and_tags() {
        let p: RecipeUpdatePayload =
            serde_json::from_value(serde_json::json!({"name": "Renamed"})).unwrap();
        let err = p.validate().unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation { field: "ingredients", .. }
        ));

        let mut p = update_payload();
        p.tags.clear();
        let err = p.validate().unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "tags", .. }));
    }

    #[test]
    fn update_rejects_blank_name_and_zero_cooking_time() {
        let mut p = update_payload();
        p.name = Some("   ".into());
        let err = p.validate().unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "name", .. }));

        let mut p = update_payload();
        p.cooking_time = Some(0);
        let err = p.validate().unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation { field: "cooking_time", .. }
        ));
    }

    #[test]
    fn filters_collect_repeated_tags() {
        let pairs = vec![
            ("tags".to_string(), "breakfast".to_string()),
            ("tags".to_string(), "vegan".to_string()),
            ("is_favorited".to_string(), "1".to_string()),
            ("page".to_string(), "2".to_string()),
        ];
        let filters = RecipeFilters::from_pairs(&pairs).unwrap();
        assert_eq!(filters.tags, vec!["breakfast", "vegan"]);
        assert_eq!(filters.is_favorited, Some(true));
        assert_eq!(filters.is_in_shopping_cart, None);
        assert_eq!(filters.author, None);
    }

    #[test]
    fn filters_reject_malformed_author_id() {
        let pairs = vec![("author".to_string(), "not-a-uuid".to_string())];
        assert!(RecipeFilters::from_pairs(&pairs).is_err());
    }

    #[test]
    fn short_link_uses_hyphenated_key() {
        let body = ShortLinkResponse {
            short_link: "http://localhost:8080/r/abc".into(),
        };
        let value: serde_json::Value = serde_json::to_value(&body).unwrap();
        assert!(value.get("short-link").is_some());
    }
}
