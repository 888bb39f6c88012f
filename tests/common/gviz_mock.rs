//! WireMock-based spreadsheet endpoint
//!
//! Serves `/spreadsheets/d/{id}/gviz/tq` per sheet so the real HTTP client can
//! be exercised without network access.

use server_room_monitor::client::{RawPayload, SheetsHttpClient};
use server_room_monitor::config::SourceConfig;
use std::time::Duration;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

pub const DATASET_ID: &str = "test-dataset";

/// Mock spreadsheet service
pub struct MockSheetServer {
    pub server: MockServer,
}

impl MockSheetServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn url(&self) -> String {
        self.server.uri()
    }

    fn table_path() -> String {
        format!("/spreadsheets/d/{DATASET_ID}/gviz/tq")
    }

    /// Serve `payload` wrapped in a valid envelope for one sheet
    pub async fn mount_table(&self, sheet: &str, payload: &RawPayload) {
        self.mount_response(sheet, ResponseTemplate::new(200).set_body_string(super::envelope(payload)))
            .await;
    }

    /// Serve an arbitrary response for one sheet
    pub async fn mount_response(&self, sheet: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(Self::table_path()))
            .and(query_param("tqx", "out:json"))
            .and(query_param("sheet", sheet))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// HTTP client pointed at this server
    pub fn client(&self, fetch_timeout: Duration) -> SheetsHttpClient {
        let config = SourceConfig {
            base_url: self.url().parse().unwrap(),
            fetch_timeout,
            utc_offset_minutes: 0,
        };
        SheetsHttpClient::new(&config).unwrap()
    }
}
