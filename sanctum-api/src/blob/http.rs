//! Remote object-store blob backend
//!
//! Speaks plain HTTP to an object store: `PUT {endpoint}/{key}` uploads,
//! `DELETE {endpoint}/{key}` removes, both authorized with a bearer write
//! token. Objects are publicly readable at the same URL.

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use super::{key_from_url, BlobError, BlobResult, BlobStore, StoredBlob};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: Client,
    endpoint: String,
    write_token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(endpoint: &str, write_token: Option<String>) -> BlobResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            write_token,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, key)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.write_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn rejected(response: reqwest::Response) -> BlobError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    BlobError::Rejected { status, message }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> BlobResult<StoredBlob> {
        if key.is_empty() || key.starts_with('/') || key.split('/').any(|part| part == "..") {
            return Err(BlobError::InvalidKey(key.to_string()));
        }

        let url = self.object_url(key);
        let size = bytes.len() as u64;

        let response = self
            .authorize(self.client.put(&url))
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        debug!(key, size, "Stored blob in remote object store");

        Ok(StoredBlob {
            url,
            key: key.to_string(),
            size,
        })
    }

    async fn delete(&self, url: &str) -> BlobResult<()> {
        let key = key_from_url(&self.endpoint, url)?;

        let response = self
            .authorize(self.client.delete(self.object_url(key)))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(BlobError::NotFound(key.to_string())),
            _ => Err(rejected(response).await),
        }
    }

    fn key_for_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        key_from_url(&self.endpoint, url).ok()
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
