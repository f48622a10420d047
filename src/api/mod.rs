// Typed wrappers over the admin panel backend endpoints

mod customers;
mod limits;
mod login;
mod reports;
mod transactions;

pub use customers::{CustomerResponse, RegisterCustomerPayload};
pub use limits::{CreateLimitPayload, LimitIdentificationType, TransactionLimit, TransactionType};
pub use reports::{report_file_name, ReportFormat, ReportQuery};
pub use transactions::{SortDirection, TransactionFilter, TransactionItem, TransactionPage, TransactionQuery};

use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::auth::{
    LogRedirect, LoginRedirect, SessionEvent, SqliteStorage, TokenRefresher, TokenSet,
    TokenStorage, TokenStore,
};
use crate::config::Config;
use crate::http_client::PanelHttpClient;

/// Entry point for talking to the panel backend.
///
/// Owns the session store, the refresher and the HTTP pipeline; the endpoint
/// wrappers in this module hang off it.
pub struct PanelApi {
    http: PanelHttpClient,
    store: Arc<TokenStore>,
    config: Config,
}

impl PanelApi {
    /// Wire up the full client stack from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let storage = Arc::new(SqliteStorage::open(&config.db_file)?);
        Self::with_storage(config, storage, Arc::new(LogRedirect))
    }

    /// Assemble with a custom storage backend and redirect sink.
    pub fn with_storage(
        config: Config,
        storage: Arc<dyn TokenStorage>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.http_max_connections)
            .connect_timeout(Duration::from_secs(config.http_connect_timeout))
            .timeout(Duration::from_secs(config.http_request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        let store = Arc::new(TokenStore::new(storage, redirect));
        let refresher = Arc::new(TokenRefresher::new(
            client.clone(),
            store.clone(),
            config.token_url(),
            config.refresh_client_id.clone(),
            config.refresh_client_secret.clone(),
        ));
        let http = PanelHttpClient::new(client, store.clone(), refresher);

        Ok(Self {
            http,
            store,
            config,
        })
    }

    /// Snapshot of the stored session, if one exists.
    pub async fn session(&self) -> Option<TokenSet> {
        self.store.token_set().await
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.store.subscribe()
    }
}

/// Append a query parameter when the filter value is set and non-empty.
pub(crate) fn push_opt(params: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(value) = value {
        if !value.is_empty() {
            params.push((key, value.clone()));
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::MemoryStorage;
    use std::path::PathBuf;

    pub fn test_config(server_url: &str) -> Config {
        Config {
            auth_base_url: format!("{server_url}/oidc"),
            api_base_url: format!("{server_url}/api/v1"),
            client_id: "admin-panel".to_string(),
            client_secret: Some("secret".to_string()),
            refresh_client_id: "admin-panel".to_string(),
            refresh_client_secret: Some("secret".to_string()),
            scope: "openid".to_string(),
            db_file: PathBuf::from("unused.sqlite3"),
            http_max_connections: 4,
            http_connect_timeout: 5,
            http_request_timeout: 10,
            log_level: "info".to_string(),
        }
    }

    /// API over in-memory storage with no session stored.
    pub fn anonymous_api(server_url: &str) -> PanelApi {
        PanelApi::with_storage(
            test_config(server_url),
            Arc::new(MemoryStorage::new()),
            Arc::new(LogRedirect),
        )
        .unwrap()
    }

    /// API over in-memory storage with a stored session.
    pub async fn authed_api(server_url: &str) -> PanelApi {
        let api = anonymous_api(server_url);
        api.store
            .save(TokenSet::from_parts(
                "test-access".to_string(),
                Some("test-refresh".to_string()),
                None,
            ))
            .await;
        api
    }

    #[test]
    fn test_push_opt_skips_unset_and_empty_values() {
        let mut params: Vec<(&'static str, String)> = Vec::new();
        push_opt(&mut params, "status", &Some("SUCCESS".to_string()));
        push_opt(&mut params, "customerId", &None);
        push_opt(&mut params, "deviceId", &Some(String::new()));

        assert_eq!(params, vec![("status", "SUCCESS".to_string())]);
    }
}
