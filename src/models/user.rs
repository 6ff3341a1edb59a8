use serde::{Deserialize, Serialize};

use super::null_as_default;

/// The authenticated operator as reported by the login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
}

/// Request body for `POST /api/auth/login`
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Response from `POST /api/auth/login`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_tolerates_partial_user() {
        let json = r#"{"success":true,"token":"t1","user":{"id":"u1"}}"#;
        let parsed: AuthResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.token.as_deref(), Some("t1"));
        let user = parsed.user.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "");
    }

    #[test]
    fn test_auth_response_tolerates_null_user_fields() {
        let json = r#"{"success":true,"token":"t1","user":{"id":"u1","name":null,"email":null}}"#;
        let parsed: AuthResponse = serde_json::from_str(json).unwrap();
        let user = parsed.user.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "");
        assert_eq!(user.email, "");
    }
}
