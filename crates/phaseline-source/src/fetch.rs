//! Fetching JSON documents from local files or HTTP(S) URLs.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use phaseline_parser::ParseError;

use crate::LoadError;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a document lives
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    Path(PathBuf),
    Url(String),
}

impl Location {
    /// `http://` and `https://` are URLs, anything else is a path
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        let lower = value.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Location::Url(value.to_string())
        } else {
            Location::Path(PathBuf::from(value))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Path(path) => write!(f, "{}", path.display()),
            Location::Url(url) => write!(f, "{}", url),
        }
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Reads JSON documents, sharing one HTTP client
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, LoadError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch and decode a JSON document
    pub async fn fetch_json(&self, location: &Location) -> Result<Value, LoadError> {
        debug!(%location, "fetching document");
        match location {
            Location::Path(path) => {
                let content = tokio::fs::read_to_string(path).await?;
                Ok(serde_json::from_str(&content).map_err(ParseError::from)?)
            }
            Location::Url(url) => {
                let response = self.client.get(url).send().await?;
                if !response.status().is_success() {
                    return Err(LoadError::HttpStatus {
                        url: url.clone(),
                        status: response.status().as_u16(),
                    });
                }
                Ok(response.json().await?)
            }
        }
    }
}
