use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::recipes::dto::RecipeMinified;
use crate::users::repo::User;

/// Request body for registration (POST /users/).
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Public part of the user returned to the client. `is_subscribed` is
/// relative to the viewer and false for anonymous requests.
#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_subscribed: bool,
}

impl UserOut {
    pub fn from_user(user: User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            avatar: user.avatar,
            is_subscribed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetAvatarRequest {
    pub avatar: String,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: String,
}

/// Followed author plus a preview of their recipes, newest first.
#[derive(Debug, Serialize)]
pub struct SubscriptionOut {
    #[serde(flatten)]
    pub author: UserOut,
    pub recipes: Vec<RecipeMinified>,
    pub recipes_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecipesLimitQuery {
    pub recipes_limit: Option<i64>,
}

impl RecipesLimitQuery {
    /// Negative limits would be rejected by Postgres; surface them as a
    /// client error instead.
    pub fn validated(&self) -> Result<Option<i64>, ApiError> {
        match self.recipes_limit {
            Some(l) if l < 0 => Err(ApiError::validation(
                "recipes_limit",
                "Must be a non-negative integer",
            )),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "cook@example.com".into(),
            username: "cook".into(),
            first_name: "Julia".into(),
            last_name: "Child".into(),
            avatar: None,
            password_hash: "secret-hash".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn user_out_never_exposes_password_hash() {
        let out = UserOut::from_user(user(), false);
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("cook@example.com"));
        assert!(!json.contains("secret-hash"));
    }

    #[test]
    fn recipes_limit_rejects_negative_values() {
        let err = RecipesLimitQuery {
            recipes_limit: Some(-1),
        }
        .validated()
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation { field: "recipes_limit", .. }
        ));
    }

    #[test]
    fn recipes_limit_passes_absent_and_zero() {
        assert_eq!(
            RecipesLimitQuery { recipes_limit: None }.validated().unwrap(),
            None
        );
        assert_eq!(
            RecipesLimitQuery {
                recipes_limit: Some(0)
            }
            .validated()
            .unwrap(),
            Some(0)
        );
    }

    #[test]
    fn subscription_out_flattens_author_fields() {
        let out = SubscriptionOut {
            author: UserOut::from_user(user(), true),
            recipes: vec![],
            recipes_count: 3,
        };
        let value: serde_json::Value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["username"], "cook");
        assert_eq!(value["is_subscribed"], true);
        assert_eq!(value["recipes_count"], 3);
    }
}
