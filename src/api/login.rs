// Password grant login and logout against the Keycloak token endpoint

use serde::Deserialize;
use tracing::info;

use crate::api::PanelApi;
use crate::auth::{TokenResponse, TokenSet};
use crate::error::{ApiError, AuthError};

/// Error body shape used by the token endpoint.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

impl PanelApi {
    /// Log in with operator credentials and store the returned session.
    ///
    /// This is the one authenticated-backend call that does not go through
    /// the request pipeline: there is nothing to attach yet.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenSet, ApiError> {
        let username = username.trim();
        let password = password.trim();

        if username.is_empty() || password.is_empty() {
            return Err(AuthError::LoginFailed {
                reason: "Username and password are required".to_string(),
            }
            .into());
        }

        let mut form = vec![
            ("grant_type", "password".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("scope", self.config.scope.clone()),
            ("username", username.to_string()),
            ("password", password.to_string()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let response = self
            .http
            .client()
            .post(self.config.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::LoginFailed {
                reason: format!("Request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            // Keycloak explains rejections in error_description
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<OAuthErrorBody>(&body)
                .ok()
                .and_then(|b| b.error_description.or(b.error))
                .unwrap_or_else(|| format!("Token endpoint returned {status}"));
            return Err(AuthError::LoginFailed { reason }.into());
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| AuthError::LoginFailed {
                reason: format!("Invalid token response: {e}"),
            })?;

        if token_response.access_token.is_empty() {
            return Err(AuthError::LoginFailed {
                reason: "Token endpoint returned an empty access token".to_string(),
            }
            .into());
        }

        let tokens = token_response.token_set();
        self.store.save(tokens.clone()).await;
        info!(username = %username, "Logged in");

        Ok(tokens)
    }

    /// Drop the stored session.
    pub async fn logout(&self) {
        self.store.clear().await;
        info!("Logged out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::anonymous_api;
    use crate::auth::SessionEvent;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_login_stores_session_and_emits_event() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oidc/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "password".into()),
                Matcher::UrlEncoded("client_id".into(), "admin-panel".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret".into()),
                Matcher::UrlEncoded("scope".into(), "openid".into()),
                Matcher::UrlEncoded("username".into(), "operator".into()),
                Matcher::UrlEncoded("password".into(), "hunter2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "access_token": "login-access",
                    "expires_in": 300,
                    "refresh_expires_in": 1800,
                    "refresh_token": "login-refresh",
                    "token_type": "Bearer",
                    "id_token": "login-id",
                    "not-before-policy": 0,
                    "session_state": "a8b0e9b4",
                    "scope": "openid profile email"
                }"#,
            )
            .create_async()
            .await;

        let api = anonymous_api(&server.url());
        let mut events = api.subscribe();

        let tokens = api.login("operator", "hunter2").await.unwrap();
        assert_eq!(tokens.access_token, "login-access");
        assert_eq!(tokens.refresh_token.as_deref(), Some("login-refresh"));

        let session = api.session().await.unwrap();
        assert_eq!(session.authorization_header(), "Bearer login-access");
        assert_eq!(events.recv().await.unwrap(), SessionEvent::TokensSaved);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_trims_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oidc/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "operator".into()),
                Matcher::UrlEncoded("password".into(), "hunter2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"a","token_type":"Bearer"}"#)
            .create_async()
            .await;

        let api = anonymous_api(&server.url());
        api.login("  operator  ", " hunter2 ").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_rejects_empty_credentials_without_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oidc/token")
            .expect(0)
            .create_async()
            .await;

        let api = anonymous_api(&server.url());
        let err = api.login("  ", "password").await.unwrap_err();
        match err {
            ApiError::Auth(AuthError::LoginFailed { reason }) => {
                assert!(reason.contains("required"));
            }
            other => panic!("Unexpected error: {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_surfaces_error_description() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oidc/token")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error":"invalid_grant","error_description":"Invalid user credentials"}"#,
            )
            .create_async()
            .await;

        let api = anonymous_api(&server.url());
        let err = api.login("operator", "wrong").await.unwrap_err();
        match err {
            ApiError::Auth(AuthError::LoginFailed { reason }) => {
                assert_eq!(reason, "Invalid user credentials");
            }
            other => panic!("Unexpected error: {other:?}"),
        }

        // A failed login leaves no session behind
        assert!(api.session().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let server = mockito::Server::new_async().await;
        let api = crate::api::test_support::authed_api(&server.url()).await;
        assert!(api.session().await.is_some());

        api.logout().await;
        assert!(api.session().await.is_none());
    }
}
