use serde::{Deserialize, Serialize};

pub const MSG_LOGIN_FAILED: &str = "Wrong username or password!";
pub const MSG_LOGIN_AGAIN: &str = "Please log in again!";
pub const MSG_DB_UNAVAILABLE: &str = "Database connection error";
pub const MSG_REGISTERED: &str = "Registration successful!";
pub const MSG_USER_EXISTS: &str = "Account already exists!";

/// Body of `POST /login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Body of `POST /register`
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Body of `POST /get_response`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
}

/// `{"status": ..., "msg": ...}` reply of the account and chat-control routes
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            msg: None,
        }
    }

    pub fn success_with(msg: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            msg: Some(msg.into()),
        }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            msg: Some(msg.into()),
        }
    }
}

/// Reply of `POST /get_response`
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_shape() {
        let json = serde_json::to_value(StatusResponse::success()).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "success" }));

        let json = serde_json::to_value(StatusResponse::fail(MSG_LOGIN_FAILED)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "fail", "msg": "Wrong username or password!" })
        );
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let req: RegisterRequest = serde_json::from_str(r#"{"username":"bob"}"#).unwrap();
        assert_eq!(req.username, "bob");
        assert!(req.password.is_empty());
        assert!(req.confirm_password.is_empty());
    }
}
