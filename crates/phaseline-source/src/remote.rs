//! Client for the remote database query API.
//!
//! Queries are paginated: the client keeps following `next_cursor` until
//! the response reports `has_more: false`. A cursor that comes back a second
//! time ends the query.

use std::collections::HashSet;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use phaseline_parser::remote::{parse_query_response, Page, QueryResponse};

use crate::LoadError;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

/// API version header value
pub const API_VERSION: &str = "2022-06-28";

/// Largest page the API accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Remote database settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub token: String,
    pub database_id: String,
    pub base_url: String,
    pub page_size: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            database_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl RemoteConfig {
    pub fn new(token: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            database_id: database_id.into(),
            ..Self::default()
        }
    }

    /// Both the token and the database are set
    pub fn is_complete(&self) -> bool {
        !self.token.is_empty() && !self.database_id.is_empty()
    }

    pub fn query_url(&self) -> String {
        format!(
            "{}/databases/{}/query",
            self.base_url.trim_end_matches('/'),
            self.database_id
        )
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
}

/// Paginating query client
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: Client,
    config: RemoteConfig,
}

impl RemoteClient {
    pub fn new(client: Client, config: RemoteConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Fetch one page of results starting at `cursor`
    pub async fn query_page(&self, cursor: Option<&str>) -> Result<QueryResponse, LoadError> {
        let url = self.config.query_url();
        let body = QueryRequest {
            page_size: self.config.page_size.clamp(1, MAX_PAGE_SIZE),
            start_cursor: cursor,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .header("Notion-Version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LoadError::HttpStatus {
                url,
                status: response.status().as_u16(),
            });
        }

        let value: Value = response.json().await?;
        Ok(parse_query_response(&value)?)
    }

    /// Fetch every page of the database
    pub async fn fetch_all_pages(&self) -> Result<Vec<Page>, LoadError> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let response = self.query_page(cursor.as_deref()).await?;
            debug!(count = response.results.len(), "received result page");
            pages.extend(response.results);

            match response.next_cursor {
                Some(next) if response.has_more => {
                    if !seen.insert(next.clone()) {
                        warn!(cursor = %next, "cursor repeated, stopping pagination");
                        break;
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        info!(pages = pages.len(), database = %self.config.database_id, "remote query complete");
        Ok(pages)
    }
}
