use super::PageSource;
use crate::model::{ImportRecord, PageRequest, PageResult};
use async_trait::async_trait;
use fetcher_core::config::ApiConfig;
use fetcher_core::{Error, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument};

// Response body of GET /api/v1/accounts/:account_id/sis_imports
#[derive(Debug, Deserialize)]
struct SisImportsPage {
    sis_imports: Vec<SisImport>,
}

#[derive(Debug, Deserialize)]
struct SisImport {
    id: u64,
    created_at: String,
    workflow_state: String,
    #[serde(default, deserialize_with = "lenient_messages")]
    processing_errors: Vec<String>,
    #[serde(default)]
    data: Option<SisImportData>,
}

#[derive(Debug, Deserialize)]
struct SisImportData {
    #[serde(default)]
    supplied_batches: Option<Vec<String>>,
}

/// Canvas reports processing errors as `[file, message]` pairs on some
/// instances and plain strings on others; anything that is not a string is
/// kept as its compact JSON text.
fn lenient_messages<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Option<Vec<Value>> = Option::deserialize(deserializer)?;

    Ok(values
        .unwrap_or_default()
        .into_iter()
        .map(|value| match value {
            Value::String(message) => message,
            other => other.to_string(),
        })
        .collect())
}

impl From<SisImport> for ImportRecord {
    fn from(raw: SisImport) -> Self {
        let batch_identifiers = raw
            .data
            .and_then(|data| data.supplied_batches)
            .unwrap_or_default();

        ImportRecord {
            id: raw.id,
            created_at: raw.created_at,
            workflow_state: raw.workflow_state,
            batch_identifiers,
            processing_errors: raw.processing_errors,
        }
    }
}

pub struct CanvasSource {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    per_page: u32,
}

impl CanvasSource {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let base_url = api
            .base_url
            .as_deref()
            .ok_or_else(|| Error::Config("api.base_url is not set".to_string()))?;
        let access_token = api
            .access_token
            .clone()
            .ok_or_else(|| Error::Config("api.access_token is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .build()?;

        let endpoint = format!(
            "{}/api/v1/accounts/{}/sis_imports",
            base_url.trim_end_matches('/'),
            api.account_id
        );

        Ok(Self {
            client,
            endpoint,
            access_token,
            per_page: api.per_page,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PageSource for CanvasSource {
    #[instrument(skip(self), fields(page = request.page_number))]
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResult> {
        let page = request.page_number;
        if page == 0 {
            return Err(Error::Validation("page numbers start at 1".to_string()));
        }

        debug!(endpoint = %self.endpoint, per_page = self.per_page, "Requesting page");

        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(&self.access_token)
            .query(&[("per_page", self.per_page), ("page", page)])
            .send()
            .await
            .map_err(|e| Error::Request {
                page,
                details: format!("transport failure: {}", e),
            })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::Request {
                page,
                details: format!("{} returned status {}", self.endpoint, status),
            });
        }

        let payload: SisImportsPage = response.json().await.map_err(|e| Error::Request {
            page,
            details: format!("undecodable sis_imports payload: {}", e),
        })?;

        let records: Vec<ImportRecord> = payload
            .sis_imports
            .into_iter()
            .map(ImportRecord::from)
            .collect();

        info!(
            page,
            per_page = self.per_page,
            records = records.len(),
            "Successfully retrieved SIS import page"
        );

        Ok(PageResult {
            page_number: page,
            records,
        })
    }

    fn source_id(&self) -> &str {
        "canvas"
    }
}
