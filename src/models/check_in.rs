use serde::{Deserialize, Serialize};

/// Request body for `POST /api/scan/confirm`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest<'a> {
    pub pass_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<&'a str>,
}

/// Response from `POST /api/scan/confirm`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConfirmResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}
