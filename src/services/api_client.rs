use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::models::{
    AuthResponse, ConfirmRequest, ConfirmResponse, LoginRequest, ScanRequest, ScanResponse,
    ScanResult,
};
use crate::services::credential_store::{CredentialStore, AUTH_TOKEN_KEY};
use crate::services::ticket_payload::TicketPayload;

pub const USER_AGENT: &str = "TKScannerApp/1.0";
pub const SCAN_TIMEOUT_MESSAGE: &str = "Request timed out. Is the server running?";
pub const CONFIRM_TIMEOUT_MESSAGE: &str = "Request timed out";
pub const LOGIN_TIMEOUT_MESSAGE: &str = "Connection failed: Request timed out";

/// Client for the ticket verification backend.
///
/// Every call resolves to a typed response; transport failures, timeouts and
/// malformed bodies are folded into the response rather than returned as errors.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    store: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("bypass-tunnel-reminder"),
            HeaderValue::from_static("true"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the stored bearer token, if any. A missing token is not an error.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.store.get(AUTH_TOKEN_KEY) {
            Ok(Some(token)) => request.bearer_auth(token),
            Ok(None) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read auth token, sending unauthenticated");
                request
            }
        }
    }

    /// Calls POST /api/auth/login
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &Secret<String>) -> AuthResponse {
        let url = self.url("/api/auth/login");
        tracing::info!(url = %url, "Attempting login");

        let request_body = LoginRequest {
            email,
            password: password.expose_secret(),
        };

        let response = match self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request_body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return login_transport_failure(e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return login_transport_failure(e),
        };

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Login failed");
            return AuthResponse::failure(login_error_message(status, &body));
        }

        match serde_json::from_str::<AuthResponse>(&body) {
            Ok(auth) => {
                tracing::info!(success = auth.success, "Login response received");
                auth
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse login response");
                AuthResponse::failure(format!("Malformed server response: {}", e))
            }
        }
    }

    /// Calls POST /api/scan for a decoded ticket code
    #[tracing::instrument(skip(self, payload))]
    pub async fn scan(&self, payload: &str, scanner_id: &str) -> ScanResult {
        let ticket = TicketPayload::parse(payload);
        let url = self.url("/api/scan");
        tracing::info!(url = %url, pass_id = %ticket.pass_id, "Calling scan API");

        let request_body = ScanRequest {
            pass_id: &ticket.pass_id,
            user_id: &ticket.user_id,
            pass_type: &ticket.pass_type,
            token: &ticket.token,
            scanner_id,
        };

        let response = match self
            .authorized(self.client.post(&url))
            .timeout(self.timeout)
            .json(&request_body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return scan_transport_failure(e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return scan_transport_failure(e),
        };

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Scan failed");
            if let Ok(structured) = serde_json::from_str::<ScanResponse>(&body) {
                return structured.into();
            }
            return ScanResult::invalid(format!("Server error ({})", status.as_u16()));
        }

        match serde_json::from_str::<ScanResponse>(&body) {
            Ok(scan_response) => {
                let result = ScanResult::from(scan_response);
                tracing::info!(status = ?result.status(), "Scan verified");
                result
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse scan response");
                ScanResult::invalid(format!("Malformed server response: {}", e))
            }
        }
    }

    /// Calls POST /api/scan/confirm for a whole ticket, or for one team member
    #[tracing::instrument(skip(self))]
    pub async fn confirm_check_in(&self, pass_id: &str, member_id: Option<&str>) -> ConfirmResponse {
        let url = self.url("/api/scan/confirm");
        let request_body = ConfirmRequest { pass_id, member_id };

        let response = match self
            .authorized(self.client.post(&url))
            .timeout(self.timeout)
            .json(&request_body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return confirm_transport_failure(e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return confirm_transport_failure(e),
        };

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Check-in confirmation failed");
            let error = error_field(&body).unwrap_or_else(|| "Confirmation failed".to_string());
            return ConfirmResponse::failure(error);
        }

        match serde_json::from_str::<ConfirmResponse>(&body) {
            Ok(confirm) => {
                tracing::info!(success = confirm.success, "Check-in confirmation received");
                confirm
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse confirm response");
                ConfirmResponse::failure(format!("Malformed server response: {}", e))
            }
        }
    }
}

/// Non-empty string `error` field of a JSON object body.
fn error_field(body: &str) -> Option<String> {
    serde_json::from_str::<JsonValue>(body)
        .ok()?
        .get("error")?
        .as_str()
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn login_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<JsonValue>(body) {
        Ok(_) => error_field(body).unwrap_or_else(|| format!("Error {}", status.as_u16())),
        Err(_) => format!("Server error: {}", status.as_u16()),
    }
}

fn login_transport_failure(e: reqwest::Error) -> AuthResponse {
    if e.is_timeout() {
        tracing::error!("Login request timed out");
        return AuthResponse::failure(LOGIN_TIMEOUT_MESSAGE);
    }
    tracing::error!(error = %e, "Login request failed");
    AuthResponse::failure(format!("Connection failed: {}", e))
}

fn scan_transport_failure(e: reqwest::Error) -> ScanResult {
    if e.is_timeout() {
        tracing::error!("Scan request timed out");
        return ScanResult::invalid(SCAN_TIMEOUT_MESSAGE);
    }
    tracing::error!(error = %e, "Scan request failed");
    ScanResult::invalid(format!("Network error: {}", e))
}

fn confirm_transport_failure(e: reqwest::Error) -> ConfirmResponse {
    if e.is_timeout() {
        tracing::error!("Confirm request timed out");
        return ConfirmResponse::failure(CONFIRM_TIMEOUT_MESSAGE);
    }
    tracing::error!(error = %e, "Confirm request failed");
    ConfirmResponse::failure("Network error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_message_prefers_json_error() {
        assert_eq!(
            login_error_message(StatusCode::UNAUTHORIZED, r#"{"error":"Invalid credentials"}"#),
            "Invalid credentials"
        );
        assert_eq!(
            login_error_message(StatusCode::FORBIDDEN, r#"{"message":"nope"}"#),
            "Error 403"
        );
        assert_eq!(
            login_error_message(StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>"),
            "Server error: 502"
        );
    }

    #[test]
    fn test_error_field_ignores_non_objects() {
        assert_eq!(error_field("[1]"), None);
        assert_eq!(error_field(r#"{"error":""}"#), None);
        assert_eq!(error_field(r#"{"error":42}"#), None);
        assert_eq!(
            error_field(r#"{"error":"Already checked in"}"#).as_deref(),
            Some("Already checked in")
        );
    }
}
