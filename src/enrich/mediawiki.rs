//! Comparison fetcher backed by the MediaWiki `action=compare` API.

use super::ComparisonFetcher;
use crate::error::{FeedError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::trace;

/// Compare endpoint of English Wikipedia.
pub const DEFAULT_COMPARE_API: &str = "https://en.wikipedia.org/w/api.php";

const COMPARE_PROPS: &str = "diff|diffsize|rel|ids|title|user|comment|parsedcomment|size";

#[derive(Debug, Deserialize)]
struct CompareResponse {
    compare: Option<CompareBody>,
}

#[derive(Debug, Deserialize)]
struct CompareBody {
    #[serde(rename = "*")]
    diff: Option<String>,
}

/// Extract the diff markup from a compare API response body.
pub(crate) fn parse_comparison(body: &[u8], old: u64, new: u64) -> Result<String> {
    let response: CompareResponse = serde_json::from_slice(body)?;
    response
        .compare
        .and_then(|c| c.diff)
        .ok_or(FeedError::MissingComparison { old, new })
}

/// Fetches revision comparisons over HTTP.
#[derive(Clone, Debug)]
pub struct MediaWikiFetcher {
    client: Client,
    api_url: String,
}

impl MediaWikiFetcher {
    /// Create a fetcher for `api_url` with its own HTTP client.
    pub fn new(api_url: impl Into<String>, user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Create a fetcher sharing an existing client.
    pub fn with_client(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl ComparisonFetcher for MediaWikiFetcher {
    async fn fetch_comparison(&self, old_revision: u64, new_revision: u64) -> Result<String> {
        let fromrev = old_revision.to_string();
        let torev = new_revision.to_string();

        trace!(old_revision, new_revision, "fetching comparison");
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "compare"),
                ("fromrev", fromrev.as_str()),
                ("torev", torev.as_str()),
                ("format", "json"),
                ("origin", "*"),
                ("prop", COMPARE_PROPS),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                url: self.api_url.clone(),
            });
        }

        let body = response.bytes().await?;
        parse_comparison(&body, old_revision, new_revision)
    }
}
