// Transactions report downloads (Excel and PDF)

use bytes::Bytes;

use crate::api::transactions::TransactionFilter;
use crate::api::{push_opt, PanelApi};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Excel,
    Pdf,
}

impl ReportFormat {
    /// Path segment selecting the export endpoint.
    pub fn as_path_segment(&self) -> &'static str {
        match self {
            ReportFormat::Excel => "excel",
            ReportFormat::Pdf => "pdf",
        }
    }

    /// File extension for the downloaded report.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Excel => "xlsx",
            ReportFormat::Pdf => "pdf",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "excel" | "xlsx" => Ok(ReportFormat::Excel),
            "pdf" => Ok(ReportFormat::Pdf),
            other => anyhow::bail!("Unknown report format: {other} (expected excel or pdf)"),
        }
    }
}

/// Filters for a report export; dates are normalized to seconds precision.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    pub filter: TransactionFilter,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl PanelApi {
    /// Download a transactions report in the requested format.
    pub async fn transactions_report(
        &self,
        format: ReportFormat,
        query: &ReportQuery,
    ) -> Result<Bytes> {
        let url = format!(
            "{}/service/transactions/{}",
            self.config.api_base_url,
            format.as_path_segment()
        );

        let filter = &query.filter;
        let mut params: Vec<(&'static str, String)> = Vec::new();
        push_opt(&mut params, "status", &filter.status);
        push_opt(&mut params, "serviceName", &filter.service_name);
        push_opt(&mut params, "creditAccount", &filter.credit_account);
        push_opt(&mut params, "debitAccount", &filter.debit_account);
        push_opt(&mut params, "transactionType", &filter.transaction_type);
        push_opt(&mut params, "customerId", &filter.customer_id);
        push_opt(&mut params, "deviceId", &filter.device_id);
        push_opt(&mut params, "absId", &filter.abs_id);
        push_opt(
            &mut params,
            "startDate",
            &query.start_date.as_deref().and_then(normalize_date_time),
        );
        push_opt(
            &mut params,
            "endDate",
            &query.end_date.as_deref().and_then(normalize_date_time),
        );

        let request = self.http.client().get(&url).query(&params).build()?;
        self.http.execute_bytes(request).await
    }
}

/// File name for a downloaded report, e.g. TRANSACTIONS_2025-01-15.xlsx
pub fn report_file_name(format: ReportFormat) -> String {
    format!(
        "TRANSACTIONS_{}.{}",
        chrono::Local::now().format("%Y-%m-%d"),
        format.extension()
    )
}

/// Bring a datetime-local value to the seconds precision the export expects.
///
/// Minute-precision values get ":00" appended; anything longer is cut after
/// the seconds.
fn normalize_date_time(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }

    if value.len() == 16 {
        return Some(format!("{value}:00"));
    }

    if value.len() >= 19 {
        return Some(value.get(..19).unwrap_or(value).to_string());
    }

    Some(value.to_string())
}
