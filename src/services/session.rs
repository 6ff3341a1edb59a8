use secrecy::{ExposeSecret, Secret};

use crate::models::User;
use crate::services::api_client::ApiClient;
use crate::services::credential_store::{
    CredentialStore, StoreError, AUTH_TOKEN_KEY, USER_DATA_KEY,
};

/// Scanner label used when no operator identity is cached.
pub const UNKNOWN_SCANNER_ID: &str = "unknown_device";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Scan,
}

#[derive(thiserror::Error, Debug)]
pub enum LoginError {
    #[error("Please enter both email and password")]
    MissingCredentials,

    #[error("{0}")]
    Rejected(String),

    #[error("Could not save credentials: {0}")]
    Storage(#[from] StoreError),

    #[error("Could not encode operator identity: {0}")]
    Identity(#[source] serde_json::Error),
}

/// A stored bearer token plus the operator identity cached at login.
#[derive(Debug)]
pub struct Session {
    token: Secret<String>,
    user: Option<User>,
}

impl Session {
    /// Reads the stored session without contacting the server.
    pub fn load(store: &dyn CredentialStore) -> Result<Option<Self>, StoreError> {
        let Some(token) = store.get(AUTH_TOKEN_KEY)? else {
            return Ok(None);
        };

        let user = match store.get(USER_DATA_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring unparseable cached identity");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unreadable cached identity");
                None
            }
        };

        Ok(Some(Self {
            token: Secret::new(token),
            user,
        }))
    }

    pub fn token(&self) -> &Secret<String> {
        &self.token
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Label sent with every scan: the operator id, or [`UNKNOWN_SCANNER_ID`].
    pub fn scanner_id(&self) -> &str {
        self.user
            .as_ref()
            .map(|user| user.id.as_str())
            .filter(|id| !id.is_empty())
            .unwrap_or(UNKNOWN_SCANNER_ID)
    }
}

/// Decides the first screen from stored credentials alone.
pub fn startup_route(store: &dyn CredentialStore) -> Route {
    match store.get(AUTH_TOKEN_KEY) {
        Ok(Some(_)) => Route::Scan,
        Ok(None) => Route::Login,
        Err(e) => {
            tracing::warn!(error = %e, "Could not read credential store, routing to login");
            Route::Login
        }
    }
}

/// Authenticates and persists the token and identity.
#[tracing::instrument(skip(api, store, password))]
pub async fn login(
    api: &ApiClient,
    store: &dyn CredentialStore,
    email: &str,
    password: &Secret<String>,
) -> Result<Session, LoginError> {
    if email.is_empty() || password.expose_secret().is_empty() {
        return Err(LoginError::MissingCredentials);
    }

    let response = api.login(email, password).await;

    let token = match response.token {
        Some(token) if response.success => token,
        _ => {
            let message = response.error.unwrap_or_else(|| "Login failed".to_string());
            tracing::warn!(error = %message, "Login rejected");
            return Err(LoginError::Rejected(message));
        }
    };

    store.set(AUTH_TOKEN_KEY, &token)?;
    if let Some(user) = &response.user {
        let serialized = serde_json::to_string(user).map_err(LoginError::Identity)?;
        store.set(USER_DATA_KEY, &serialized)?;
    }

    tracing::info!("Operator logged in");
    Ok(Session {
        token: Secret::new(token),
        user: response.user,
    })
}

/// Forgets the stored token and identity.
pub fn logout(store: &dyn CredentialStore) -> Result<(), StoreError> {
    store.delete(AUTH_TOKEN_KEY)?;
    store.delete(USER_DATA_KEY)?;
    tracing::info!("Operator logged out");
    Ok(())
}
