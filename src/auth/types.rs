// Authentication types

use serde::Deserialize;

/// Scheme used when no token type came back from the token endpoint
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// The credential set currently held by the store.
///
/// Created on successful login or refresh, overwritten on each refresh,
/// cleared on logout or an irrecoverable 401.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
}

impl TokenSet {
    /// Assemble from raw stored values, applying the `Bearer` default when
    /// no token type was persisted.
    pub fn from_parts(
        access_token: String,
        refresh_token: Option<String>,
        token_type: Option<String>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
        }
    }

    /// Value for the `Authorization` header: `"{type} {access}"`
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Token endpoint response, Keycloak-shaped.
///
/// The same shape serves the password grant (login) and the refresh grant;
/// fields the backend omits on refresh are optional and unknown fields are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub refresh_expires_in: Option<u64>,
    pub id_token: Option<String>,
    #[serde(rename = "not-before-policy")]
    pub not_before_policy: Option<i64>,
    pub session_state: Option<String>,
    pub scope: Option<String>,
}

impl TokenResponse {
    /// The token set to persist for this response.
    pub fn token_set(&self) -> TokenSet {
        TokenSet::from_parts(
            self.access_token.clone(),
            self.refresh_token.clone(),
            self.token_type.clone(),
        )
    }
}

/// Session state-change notifications published by the token store.
///
/// Explicit events replace the reactive UI bindings of the original panel:
/// a front end subscribes and re-renders on its own terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new token set was saved (login or refresh)
    TokensSaved,
    /// The session was cleared (logout or irrecoverable auth failure)
    SessionCleared,
    /// The injected login redirect was invoked
    LoginRedirectRequested,
}
