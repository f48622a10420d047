// Transaction listing with server-side paging, sorting and filters

use serde::{Deserialize, Serialize};

use crate::api::{push_opt, PanelApi};
use crate::error::Result;

/// One row of the transactions ledger as the backend reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItem {
    pub id: i64,
    #[serde(rename = "externalID")]
    pub external_id: String,
    #[serde(rename = "absID")]
    pub abs_id: Option<String>,
    pub transaction_date: String,
    pub status: String,
    pub transaction_type: Option<String>,
    pub sum_n: Option<f64>,
    pub sum_v: Option<f64>,
    pub fee: Option<f64>,
    pub debit_account: Option<String>,
    pub credit_account: Option<String>,
    #[serde(rename = "customerID")]
    pub customer_id: Option<i64>,
    pub service_name: Option<String>,
    pub comment: Option<String>,
    #[serde(rename = "deviceID")]
    pub device_id: Option<String>,
    pub debit_account_currency: Option<i64>,
    pub credit_account_currency: Option<i64>,
    #[serde(rename = "receiverCustomerID")]
    pub receiver_customer_id: Option<i64>,
    pub receiver_customer_name: Option<String>,
    pub receiver_customer_detail: Option<String>,
    #[serde(rename = "transactionID")]
    pub transaction_id: i64,
}

/// Spring-style page envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub content: Vec<TransactionItem>,
    pub total_pages: u32,
    pub total_elements: u64,
    pub last: bool,
    pub number_of_elements: u32,
    pub size: u32,
    pub number: u32,
    pub first: bool,
    pub empty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => anyhow::bail!("Unknown sort direction: {other} (expected asc or desc)"),
        }
    }
}

/// Optional filters for the transactions list and reports.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub status: Option<String>,
    pub service_name: Option<String>,
    pub credit_account: Option<String>,
    pub debit_account: Option<String>,
    pub transaction_type: Option<String>,
    pub customer_id: Option<String>,
    pub device_id: Option<String>,
    pub abs_id: Option<String>,
}

/// Paging, sorting and filters for one transactions request.
#[derive(Debug, Clone)]
pub struct TransactionQuery {
    pub page: u32,
    pub size: u32,
    pub sort_by: String,
    pub direction: SortDirection,
    pub filter: TransactionFilter,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: 10,
            sort_by: "id".to_string(),
            direction: SortDirection::Desc,
            filter: TransactionFilter::default(),
        }
    }
}

impl PanelApi {
    /// Fetch one page of transactions.
    pub async fn transactions(&self, query: &TransactionQuery) -> Result<TransactionPage> {
        let url = format!("{}/service/transactions", self.config.api_base_url);

        let mut params: Vec<(&'static str, String)> = vec![
            ("page", query.page.to_string()),
            ("size", query.size.to_string()),
            ("sortBy", query.sort_by.clone()),
            ("direction", query.direction.as_str().to_string()),
        ];

        let filter = &query.filter;
        push_opt(&mut params, "status", &filter.status);
        // The list endpoint reads the service name filter from statusName
        push_opt(&mut params, "statusName", &filter.service_name);
        push_opt(&mut params, "creditAccount", &filter.credit_account);
        push_opt(&mut params, "debitAccount", &filter.debit_account);
        push_opt(&mut params, "transactionType", &filter.transaction_type);
        push_opt(&mut params, "customerId", &filter.customer_id);
        push_opt(&mut params, "deviceId", &filter.device_id);
        push_opt(&mut params, "absId", &filter.abs_id);

        let request = self.http.client().get(&url).query(&params).build()?;
        self.http.execute_json(request).await
    }
}
