// Transaction limit management

use serde::{Deserialize, Serialize};

use crate::api::PanelApi;
use crate::error::Result;

/// Identification tier a limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitIdentificationType {
    FullIdentification,
    OnlineIdentification,
}

impl std::str::FromStr for LimitIdentificationType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" | "full_identification" => Ok(LimitIdentificationType::FullIdentification),
            "online" | "online_identification" => Ok(LimitIdentificationType::OnlineIdentification),
            other => anyhow::bail!(
                "Unknown identification type: {other} (expected full or online)"
            ),
        }
    }
}

/// Transaction type a limit is attached to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionType {
    pub id: i64,
    pub name: String,
}

/// A configured transaction limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionLimit {
    pub id: i64,
    pub name: String,
    pub amount_per_day: f64,
    pub amount_per_month: f64,
    #[serde(rename = "type")]
    pub limit_type: LimitIdentificationType,
    pub transaction_type: TransactionType,
}

/// Body for creating or updating a limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLimitPayload {
    pub transaction_type_id: i64,
    pub name: String,
    pub amount_per_day: f64,
    pub amount_per_month: f64,
    #[serde(rename = "type")]
    pub limit_type: LimitIdentificationType,
}

impl PanelApi {
    /// Fetch every configured limit.
    pub async fn limits(&self) -> Result<Vec<TransactionLimit>> {
        let url = format!("{}/service/transactions/limits/all", self.config.api_base_url);
        let request = self.http.client().get(&url).build()?;
        self.http.execute_json(request).await
    }

    /// Fetch one limit by id.
    pub async fn limit(&self, id: i64) -> Result<TransactionLimit> {
        let url = format!("{}/service/transactions/limits/{id}", self.config.api_base_url);
        let request = self.http.client().get(&url).build()?;
        self.http.execute_json(request).await
    }

    /// Create a limit.
    pub async fn create_limit(&self, payload: &CreateLimitPayload) -> Result<()> {
        let url = format!("{}/service/transactions/limits", self.config.api_base_url);
        let request = self.http.client().post(&url).json(payload).build()?;
        self.http.execute(request).await?;
        Ok(())
    }

    /// Replace a limit.
    pub async fn update_limit(&self, id: i64, payload: &CreateLimitPayload) -> Result<()> {
        let url = format!("{}/service/transactions/limits/{id}", self.config.api_base_url);
        let request = self.http.client().put(&url).json(payload).build()?;
        self.http.execute(request).await?;
        Ok(())
    }

    /// Delete a limit.
    pub async fn delete_limit(&self, id: i64) -> Result<()> {
        let url = format!("{}/service/transactions/limits/{id}", self.config.api_base_url);
        let request = self.http.client().delete(&url).build()?;
        self.http.execute(request).await?;
        Ok(())
    }

    /// Transaction types limits can be attached to.
    pub async fn transaction_types(&self) -> Result<Vec<TransactionType>> {
        let url = format!("{}/service/transactions/types", self.config.api_base_url);
        let request = self.http.client().get(&url).build()?;
        self.http.execute_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::authed_api;
    use mockito::Matcher;

    const LIMIT_BODY: &str = r#"{
        "id": 3,
        "name": "P2P daily cap",
        "amountPerDay": 150000.0,
        "amountPerMonth": 1500000.0,
        "type": "FULL_IDENTIFICATION",
        "transactionType": {"id": 1, "name": "P2P"}
    }"#;

    #[tokio::test]
    async fn test_limits_list_decodes_wire_shape() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/service/transactions/limits/all")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!("[{LIMIT_BODY}]"))
            .create_async()
            .await;

        let api = authed_api(&server.url()).await;
        let limits = api.limits().await.unwrap();

        assert_eq!(limits.len(), 1);
        assert_eq!(limits[0].name, "P2P daily cap");
        assert_eq!(
            limits[0].limit_type,
            LimitIdentificationType::FullIdentification
        );
        assert_eq!(limits[0].transaction_type.id, 1);
    }

    #[tokio::test]
    async fn test_create_limit_posts_expected_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/service/transactions/limits")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "transactionTypeId": 1,
                "name": "P2P daily cap",
                "amountPerDay": 150000.0,
                "amountPerMonth": 1500000.0,
                "type": "ONLINE_IDENTIFICATION"
            })))
            .with_status(201)
            .create_async()
            .await;

        let api = authed_api(&server.url()).await;
        let payload = CreateLimitPayload {
            transaction_type_id: 1,
            name: "P2P daily cap".to_string(),
            amount_per_day: 150000.0,
            amount_per_month: 1500000.0,
            limit_type: LimitIdentificationType::OnlineIdentification,
        };

        api.create_limit(&payload).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_and_delete_target_the_limit_id() {
        let mut server = mockito::Server::new_async().await;
        let update = server
            .mock("PUT", "/api/v1/service/transactions/limits/3")
            .with_status(200)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/v1/service/transactions/limits/3")
            .with_status(204)
            .create_async()
            .await;

        let api = authed_api(&server.url()).await;
        let payload = CreateLimitPayload {
            transaction_type_id: 1,
            name: "P2P daily cap".to_string(),
            amount_per_day: 200000.0,
            amount_per_month: 2000000.0,
            limit_type: LimitIdentificationType::FullIdentification,
        };

        api.update_limit(3, &payload).await.unwrap();
        api.delete_limit(3).await.unwrap();

        update.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_transaction_types_list() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/service/transactions/types")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":1,"name":"P2P"},{"id":2,"name":"Top-up"}]"#)
            .create_async()
            .await;

        let api = authed_api(&server.url()).await;
        let types = api.transaction_types().await.unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(types[1].name, "Top-up");
    }

    #[test]
    fn test_identification_type_parsing() {
        assert_eq!(
            "full".parse::<LimitIdentificationType>().unwrap(),
            LimitIdentificationType::FullIdentification
        );
        assert_eq!(
            "ONLINE_IDENTIFICATION"
                .parse::<LimitIdentificationType>()
                .unwrap(),
            LimitIdentificationType::OnlineIdentification
        );
        assert!("partial".parse::<LimitIdentificationType>().is_err());
    }
}
