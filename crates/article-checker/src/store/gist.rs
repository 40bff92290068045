//! GitHub Gist backend.
//!
//! One gist holds both caches as CSV files. Writes replace a file's content
//! with a PATCH and are last-writer-wins: two runs saving concurrently lose
//! whichever update lands first.
//!
//! A failed load leaves the cache empty for the run, and the save that ends
//! the run then replaces every stored row with only that run's rows.

use std::collections::HashMap;
use std::marker::PhantomData;

use reqwest::Client;
use serde::Deserialize;

use super::{KeyedRecordStore, RecordMap, TabularRecord, tabular};
use crate::client::handle_response;
use crate::config::{GistConfig, api};
use crate::error::{ClientError, StoreResult};

const ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Default, Deserialize)]
struct GistDocument {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Default, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

/// A single CSV file inside a gist.
pub struct GistStore<R> {
    client: Client,
    api_url: String,
    gist_id: String,
    token: String,
    filename: String,
    _record: PhantomData<fn() -> R>,
}

impl<R> GistStore<R> {
    /// Store for `filename` in the configured gist.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &GistConfig, filename: impl Into<String>) -> StoreResult<Self> {
        let client = Client::builder()
            .user_agent(api::USER_AGENT)
            .timeout(api::GIST_TIMEOUT)
            .connect_timeout(api::CONNECT_TIMEOUT)
            .gzip(true)
            .build()
            .map_err(ClientError::from)?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            gist_id: config.gist_id.clone(),
            token: config.token.clone(),
            filename: filename.into(),
            _record: PhantomData,
        })
    }

    /// File name inside the gist.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    fn gist_url(&self) -> String {
        format!("{}/gists/{}", self.api_url, self.gist_id)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("token {}", self.token))
            .header(reqwest::header::ACCEPT, ACCEPT)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, api::GIST_TIMEOUT))?;
        handle_response(response).await
    }

    async fn fetch_content(&self) -> StoreResult<Option<String>> {
        let response = self.send(self.request(reqwest::Method::GET, &self.gist_url())).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::from_transport(e, api::GIST_TIMEOUT))?;
        let mut document: GistDocument = serde_json::from_str(&text)?;

        let Some(file) = document.files.remove(&self.filename) else {
            return Ok(None);
        };

        match (file.truncated, file.raw_url) {
            (true, Some(raw_url)) => {
                tracing::debug!(file = %self.filename, "Gist file truncated, fetching raw content");
                let raw = self.send(self.request(reqwest::Method::GET, &raw_url)).await?;
                let content = raw
                    .text()
                    .await
                    .map_err(|e| ClientError::from_transport(e, api::GIST_TIMEOUT))?;
                Ok(Some(content))
            }
            _ => Ok(file.content),
        }
    }
}

#[async_trait::async_trait]
impl<R: TabularRecord> KeyedRecordStore<R> for GistStore<R> {
    fn describe(&self) -> String {
        format!("gist:{}/{}", self.gist_id, self.filename)
    }

    async fn load(&self) -> StoreResult<RecordMap<R>> {
        match self.fetch_content().await? {
            Some(content) if !content.trim().is_empty() => tabular::decode_records(&content),
            _ => Ok(RecordMap::new()),
        }
    }

    async fn save(&self, records: &RecordMap<R>) -> StoreResult<()> {
        let content = tabular::encode(records);
        let body = serde_json::json!({
            "files": { self.filename.as_str(): { "content": content } }
        });

        self.send(self.request(reqwest::Method::PATCH, &self.gist_url()).json(&body)).await?;

        tracing::debug!(file = %self.filename, rows = records.len(), "Saved gist cache");
        Ok(())
    }
}
