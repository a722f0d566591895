use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ApiError;
use crate::users::dto::CreateUserRequest;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+\-]{1,150}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// Avatars arrive as base64 data URLs, e.g. "data:image/png;base64,iVBO...".
pub fn is_data_url(value: &str) -> bool {
    value
        .strip_prefix("data:image/")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, payload)| !payload.is_empty())
        .unwrap_or(false)
}

pub fn validate_new_user(payload: &CreateUserRequest) -> Result<(), ApiError> {
    if !is_valid_email(&payload.email) {
        return Err(ApiError::validation("email", "Invalid email"));
    }
    if !is_valid_username(&payload.username) {
        return Err(ApiError::validation("username", "Invalid username"));
    }
    if payload.first_name.trim().is_empty() {
        return Err(ApiError::validation("first_name", "This field is required"));
    }
    if payload.last_name.trim().is_empty() {
        return Err(ApiError::validation("last_name", "This field is required"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::validation("password", "Password too short"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreateUserRequest {
        CreateUserRequest {
            email: "cook@example.com".into(),
            username: "cook".into(),
            first_name: "Julia".into(),
            last_name: "Child".into(),
            password: "mastering-the-art".into(),
        }
    }

    #[test]
    fn accepts_well_formed_user() {
        assert!(validate_new_user(&payload()).is_ok());
    }

    #[test]
    fn rejects_bad_email() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("user@nodot"));
        assert!(is_valid_email("user@example.org"));
    }

    #[test]
    fn rejects_short_password() {
        let mut p = payload();
        p.password = "short".into();
        let err = validate_new_user(&p).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ApiError::Validation { field: "password", .. }
        ));
    }

    #[test]
    fn rejects_blank_names() {
        let mut p = payload();
        p.first_name = "  ".into();
        assert!(validate_new_user(&p).is_err());
    }

    #[test]
    fn data_url_detection() {
        assert!(is_data_url("data:image/png;base64,iVBORw0KGgo="));
        assert!(!is_data_url("data:image/png;base64,"));
        assert!(!is_data_url("https://example.com/avatar.png"));
        assert!(!is_data_url("data:text/plain;base64,aGk="));
    }
}
