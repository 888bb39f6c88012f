//! HTTP client for the spreadsheet visualization-query endpoint
//!
//! Issues one `GET .../gviz/tq?tqx=out:json&sheet=<table>` per table and hands
//! the body to the strict envelope parser.

use crate::client::{envelope::parse_envelope, RawPayload, SourceClient, TableName};
use crate::config::SourceConfig;
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use tracing::debug;
use url::Url;

/// HTTP client for the spreadsheet data source
pub struct SheetsHttpClient {
    /// HTTP client instance
    client: Client,

    /// Base URL of the spreadsheet service
    base_url: Url,
}

impl SheetsHttpClient {
    /// Create a new HTTP client with the configured bounded timeout
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.fetch_timeout)
            .user_agent(format!("server-room-monitor/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Build the query URL for one table
    pub fn table_url(&self, dataset_id: &str, table: TableName) -> Result<Url> {
        let path = format!(
            "spreadsheets/d/{}/gviz/tq",
            urlencoding::encode(dataset_id.trim())
        );

        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }

        let mut url = base
            .join(&path)
            .map_err(|e| MonitorError::config(format!("Invalid URL path {path}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("tqx", "out:json")
            .append_pair("sheet", table.sheet_name());
        Ok(url)
    }
}

#[async_trait]
impl SourceClient for SheetsHttpClient {
    async fn fetch_table(&self, dataset_id: &str, table: TableName) -> Result<RawPayload> {
        let url = self.table_url(dataset_id, table)?;
        debug!("Fetching {table} from {url}");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MonitorError::timeout(format!("Fetching {table}: {e}"))
            } else {
                MonitorError::transport(format!("Fetching {table}: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::transport(format!(
                "Fetching {table}: HTTP {status}"
            )));
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                MonitorError::timeout(format!("Reading {table} body: {e}"))
            } else {
                MonitorError::transport(format!("Reading {table} body: {e}"))
            }
        })?;

        parse_envelope(&text)
    }
}
