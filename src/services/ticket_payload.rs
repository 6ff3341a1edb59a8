use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Ticket fields carried by a scanned code.
///
/// Codes are either the JSON object `{passId, userId, passType, token}` or an
/// opaque pass id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    pub pass_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub pass_type: String,
    #[serde(default)]
    pub token: String,
}

impl TicketPayload {
    /// Parses a decoded code, falling back to the raw text as the pass id.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<JsonValue>(raw) {
            Ok(JsonValue::Object(fields)) => match fields.get("passId").and_then(truthy_text) {
                Some(pass_id) => {
                    return Self {
                        pass_id,
                        user_id: fields.get("userId").map(text).unwrap_or_default(),
                        pass_type: fields.get("passType").map(text).unwrap_or_default(),
                        token: fields.get("token").map(text).unwrap_or_default(),
                    };
                }
                None => tracing::debug!("Scanned JSON has no passId, using as raw ID"),
            },
            Ok(_) => tracing::debug!("Scanned JSON is not an object, using as raw ID"),
            Err(_) => tracing::debug!("Scanned data is not JSON, using as raw ID"),
        }

        Self::raw(raw)
    }

    pub fn raw(pass_id: &str) -> Self {
        Self {
            pass_id: pass_id.to_string(),
            ..Default::default()
        }
    }

    /// JSON form suitable for encoding into a ticket QR code.
    pub fn to_qr_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// `passId` must be a non-empty string or a non-zero number.
fn truthy_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
