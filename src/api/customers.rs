// Customer lookup and registration

use serde::{Deserialize, Serialize};

use crate::api::PanelApi;
use crate::error::Result;

/// Customer record as the backend reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub customer_id: i64,
    pub email: String,
    pub phone_number: String,
    pub inn: String,
    pub surname: String,
    pub name: String,
    pub patronymic: String,
    pub document_type: i64,
    pub document_series: String,
    pub document_no: String,
}

/// Body for registering a customer's contact details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCustomerPayload {
    pub customer_id: String,
    pub email: String,
    pub phone_number: String,
}

impl PanelApi {
    /// Look up a customer by id.
    pub async fn customer(&self, id: &str) -> Result<CustomerResponse> {
        let url = format!("{}/customer/{}", self.config.api_base_url, id.trim());
        let request = self.http.client().get(&url).build()?;
        self.http.execute_json(request).await
    }

    /// Register a customer with their contact details.
    pub async fn register_customer(&self, payload: &RegisterCustomerPayload) -> Result<()> {
        let url = format!("{}/customer/register", self.config.api_base_url);
        let request = self.http.client().post(&url).json(payload).build()?;
        self.http.execute(request).await?;
        Ok(())
    }
}
