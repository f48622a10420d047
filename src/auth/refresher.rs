// Single-flight refresh token exchange against the OAuth token endpoint

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::auth::store::TokenStore;
use crate::auth::types::{TokenResponse, TokenSet};
use crate::error::AuthError;

type RefreshFuture = Shared<BoxFuture<'static, Result<TokenSet, AuthError>>>;

/// Exchanges the stored refresh token for a fresh token set.
///
/// Concurrent callers share one exchange: the first caller starts the flight,
/// everyone else awaits the same future and gets the same outcome. New tokens
/// are persisted through the store before any waiter resolves.
pub struct TokenRefresher {
    http: reqwest::Client,
    store: Arc<TokenStore>,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl TokenRefresher {
    pub fn new(
        http: reqwest::Client,
        store: Arc<TokenStore>,
        token_url: String,
        client_id: String,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            http,
            store,
            token_url,
            client_id,
            client_secret,
            in_flight: Mutex::new(None),
        }
    }

    /// Refresh the session, joining an already-running exchange if one exists.
    pub async fn refresh(self: &Arc<Self>) -> Result<TokenSet, AuthError> {
        let flight = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(existing) => {
                    debug!("Refresh already in flight, joining");
                    existing.clone()
                }
                None => {
                    let flight = self.spawn_exchange();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    fn spawn_exchange(self: &Arc<Self>) -> RefreshFuture {
        let this = self.clone();
        let task = tokio::spawn(async move {
            let result = this.exchange().await;
            // Empty the slot before the outcome settles so no caller can
            // observe a finished flight as still in progress
            let mut slot = this.in_flight.lock().await;
            *slot = None;
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(err) => Err(AuthError::RefreshRequestFailed {
                    reason: format!("Refresh task failed: {err}"),
                }),
            }
        }
        .boxed()
        .shared()
    }

    async fn exchange(&self) -> Result<TokenSet, AuthError> {
        let refresh_token = self
            .store
            .refresh_token()
            .await
            .ok_or(AuthError::MissingRefreshToken)?;

        debug!("Exchanging refresh token at {}", self.token_url);

        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("client_id", self.client_id.clone()),
            ("refresh_token", refresh_token),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::RefreshRequestFailed {
                reason: format!("Request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshRequestFailed {
                reason: format!("Token endpoint returned {status}: {body}"),
            });
        }

        let token_response: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| AuthError::RefreshRequestFailed {
                    reason: format!("Invalid token response: {e}"),
                })?;

        if token_response.access_token.is_empty() {
            return Err(AuthError::RefreshRequestFailed {
                reason: "Token endpoint returned an empty access token".to_string(),
            });
        }

        let tokens = token_response.token_set();
        self.store.save(tokens.clone()).await;
        info!("Access token refreshed");

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryStorage;
    use crate::auth::store::LogRedirect;
    use mockito::Matcher;

    fn refresher_for(server_url: &str, store: Arc<TokenStore>) -> Arc<TokenRefresher> {
        Arc::new(TokenRefresher::new(
            reqwest::Client::new(),
            store,
            format!("{server_url}/realms/panel/protocol/openid-connect/token"),
            "admin-panel".to_string(),
            Some("secret".to_string()),
        ))
    }

    async fn seeded_store(access: &str, refresh: Option<&str>) -> Arc<TokenStore> {
        let store = Arc::new(TokenStore::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(LogRedirect),
        ));
        store
            .save(TokenSet::from_parts(
                access.to_string(),
                refresh.map(str::to_string),
                None,
            ))
            .await;
        store
    }

    #[tokio::test]
    async fn test_refresh_persists_new_tokens() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/realms/panel/protocol/openid-connect/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("client_id".into(), "admin-panel".into()),
                Matcher::UrlEncoded("refresh_token".into(), "old-refresh".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"new-access","refresh_token":"new-refresh","token_type":"Bearer","expires_in":300}"#,
            )
            .create_async()
            .await;

        let store = seeded_store("old-access", Some("old-refresh")).await;
        let refresher = refresher_for(&server.url(), store.clone());

        let tokens = refresher.refresh().await.unwrap();
        assert_eq!(tokens.access_token, "new-access");

        // The store already held the new tokens when refresh resolved
        assert_eq!(store.access_token().await.as_deref(), Some("new-access"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("new-refresh"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails_without_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/realms/panel/protocol/openid-connect/token")
            .expect(0)
            .create_async()
            .await;

        let store = seeded_store("access-only", None).await;
        let refresher = refresher_for(&server.url(), store);

        let err = refresher.refresh().await.unwrap_err();
        assert_eq!(err, AuthError::MissingRefreshToken);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_surfaces_endpoint_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/realms/panel/protocol/openid-connect/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Session not active"}"#)
            .create_async()
            .await;

        let store = seeded_store("old-access", Some("expired-refresh")).await;
        let refresher = refresher_for(&server.url(), store);

        let err = refresher.refresh().await.unwrap_err();
        match err {
            AuthError::RefreshRequestFailed { reason } => {
                assert!(reason.contains("400"));
                assert!(reason.contains("invalid_grant"));
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_rejects_empty_access_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/realms/panel/protocol/openid-connect/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"","token_type":"Bearer"}"#)
            .create_async()
            .await;

        let store = seeded_store("old-access", Some("old-refresh")).await;
        let refresher = refresher_for(&server.url(), store);

        let err = refresher.refresh().await.unwrap_err();
        match err {
            AuthError::RefreshRequestFailed { reason } => {
                assert!(reason.contains("empty access token"));
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_exchange() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/realms/panel/protocol/openid-connect/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"shared-access","refresh_token":"shared-refresh"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = seeded_store("old-access", Some("old-refresh")).await;
        let refresher = refresher_for(&server.url(), store);

        let (a, b, c) = tokio::join!(refresher.refresh(), refresher.refresh(), refresher.refresh());
        assert_eq!(a.unwrap().access_token, "shared-access");
        assert_eq!(b.unwrap().access_token, "shared-access");
        assert_eq!(c.unwrap().access_token, "shared-access");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_after_settled_flight_starts_a_new_exchange() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/realms/panel/protocol/openid-connect/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"next-access","refresh_token":"next-refresh"}"#)
            .expect(2)
            .create_async()
            .await;

        let store = seeded_store("old-access", Some("old-refresh")).await;
        let refresher = refresher_for(&server.url(), store);

        refresher.refresh().await.unwrap();
        refresher.refresh().await.unwrap();

        mock.assert_async().await;
    }
}
