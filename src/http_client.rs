use bytes::Bytes;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{TokenRefresher, TokenStore};
use crate::error::ApiError;

/// HTTP client for the panel backend with automatic session handling.
///
/// Every request goes through the same pipeline: attach the Authorization
/// header from the store (no token means the request is cancelled, not sent),
/// and on a 401 refresh the session once and replay the request with the new
/// header. A failed refresh or a second 401 clears the session and asks the
/// host to redirect to login.
pub struct PanelHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Token cache and session state
    store: Arc<TokenStore>,

    /// Single-flight refresh coordinator
    refresher: Arc<TokenRefresher>,
}

impl PanelHttpClient {
    pub fn new(client: Client, store: Arc<TokenStore>, refresher: Arc<TokenRefresher>) -> Self {
        Self {
            client,
            store,
            refresher,
        }
    }

    /// Execute a request through the session pipeline.
    pub async fn execute(&self, mut request: Request) -> Result<Response, ApiError> {
        let request_id = short_request_id();
        let method = request.method().clone();
        let url = request.url().clone();

        let header = match self.store.authorization_header_or_redirect().await {
            Some(value) => value,
            None => {
                tracing::warn!(
                    request_id = %request_id,
                    method = %method,
                    url = %url,
                    "No access token available, cancelling request"
                );
                return Err(ApiError::RequestCancelled);
            }
        };
        set_authorization(&mut request, &header)?;

        let mut retried = false;

        loop {
            // Clone the request for this attempt
            let attempt = request.try_clone().ok_or_else(|| {
                ApiError::Internal(anyhow::anyhow!("Request body is not cloneable"))
            })?;

            tracing::debug!(
                request_id = %request_id,
                method = %method,
                url = %url,
                retried = retried,
                "Sending request"
            );

            let response = self.client.execute(attempt).await?;
            let status = response.status();

            tracing::debug!(
                request_id = %request_id,
                status = %status,
                "Received response"
            );

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED && !retried {
                tracing::info!(
                    request_id = %request_id,
                    "Received 401, refreshing session and retrying"
                );

                match self.refresher.refresh().await {
                    Ok(tokens) => {
                        set_authorization(&mut request, &tokens.authorization_header())?;
                        retried = true;
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(
                            request_id = %request_id,
                            error = %err,
                            "Session refresh failed, clearing tokens"
                        );
                        self.store.clear().await;
                        self.store.request_login_redirect();
                        return Err(ApiError::Auth(err));
                    }
                }
            }

            if status == StatusCode::UNAUTHORIZED {
                // The refreshed session was rejected too; give up on it
                tracing::warn!(
                    request_id = %request_id,
                    "Still unauthorized after refresh, clearing session"
                );
                self.store.clear().await;
                self.store.request_login_redirect();
            }

            let message = response.text().await.unwrap_or_default();
            tracing::error!(
                request_id = %request_id,
                status = status.as_u16(),
                url = %url,
                message = %message,
                "Request failed"
            );
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message,
            });
        }
    }

    /// Execute a request and decode the response body as JSON.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: Request) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        Ok(response.json().await?)
    }

    /// Execute a request and return the raw response body.
    pub async fn execute_bytes(&self, request: Request) -> Result<Bytes, ApiError> {
        let response = self.execute(request).await?;
        Ok(response.bytes().await?)
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn set_authorization(request: &mut Request, header: &str) -> Result<(), ApiError> {
    let value = HeaderValue::from_str(header)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Invalid Authorization header: {e}")))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

fn short_request_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}
