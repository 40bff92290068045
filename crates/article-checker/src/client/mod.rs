//! Author metrics from the Semantic Scholar graph API.
//!
//! One search per author name, first hit wins. The status mapping in
//! [`handle_response`] is shared with the gist store. Requests are never
//! retried; pacing between lookups belongs to the evaluator.

use reqwest::Client;

use crate::config::{ScholarConfig, api, fields};
use crate::error::{ClientError, ClientResult};
use crate::evaluator::MetricsLookup;
use crate::models::{AuthorMetrics, AuthorSearchResult};

/// Author search client.
#[derive(Clone)]
pub struct SemanticScholarClient {
    /// HTTP client.
    client: Client,

    /// API key (optional).
    api_key: Option<String>,

    /// Graph API base URL.
    graph_api_url: String,

    /// Request timeout, reported on timeouts.
    request_timeout: std::time::Duration,
}

impl SemanticScholarClient {
    /// Build the HTTP client, attaching the API key when one is configured.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(config: &ScholarConfig) -> ClientResult<Self> {
        let mut default_headers = reqwest::header::HeaderMap::new();
        if let Some(key) = config.api_key.as_deref() {
            let key = reqwest::header::HeaderValue::from_str(key)
                .map_err(|_| ClientError::bad_request("API key is not a valid header value"))?;
            default_headers.insert("x-api-key", key);
        }

        let client = Client::builder()
            .default_headers(default_headers)
            .user_agent(api::USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            graph_api_url: config.graph_api_url.clone(),
            request_timeout: config.request_timeout,
        })
    }

    /// Whether lookups run with the higher keyed rate limit.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Up to `limit` authors matching `query`, with metric fields only.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or an
    /// unparsable body.
    pub async fn search_authors(&self, query: &str, limit: u32) -> ClientResult<AuthorSearchResult> {
        let search_url = format!("{}/author/search", self.graph_api_url);
        let params = [
            ("query", query.to_string()),
            ("fields", fields::AUTHOR_METRICS.join(",")),
            ("limit", limit.to_string()),
        ];

        let response = self
            .client
            .get(&search_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, self.request_timeout))?;

        let response = handle_response(response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::from_transport(e, self.request_timeout))?;
        serde_json::from_str(&text).map_err(ClientError::from)
    }
}

#[async_trait::async_trait]
impl MetricsLookup for SemanticScholarClient {
    async fn lookup_author(&self, name: &str) -> ClientResult<Option<AuthorMetrics>> {
        let result = self.search_authors(name, 1).await?;
        Ok(result.data.into_iter().next().map(crate::models::ScholarAuthor::into_metrics))
    }
}

impl std::fmt::Debug for SemanticScholarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticScholarClient")
            .field("graph_api_url", &self.graph_api_url)
            .field("has_api_key", &self.has_api_key())
            .finish_non_exhaustive()
    }
}

/// Pass success through; turn any other status into a [`ClientError`].
pub(crate) async fn handle_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    if code == 429 {
        let wait_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(api::DEFAULT_RETRY_AFTER_SECS);
        return Err(ClientError::rate_limited(wait_secs));
    }

    let body = response.text().await.unwrap_or_default();
    Err(match code {
        400 => ClientError::bad_request(body),
        404 => ClientError::not_found(body),
        500..=599 => ClientError::server(code, body),
        _ => ClientError::UnexpectedStatus { status: code, message: body },
    })
}
