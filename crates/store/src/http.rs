//! Bucket store backed by an object-storage HTTP API.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use tracing::{debug, info};

use crate::{ContentStore, StorageError};

/// Object storage reachable as `{base_url}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct HttpBucketStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    token: Option<String>,
}

impl HttpBucketStore {
    /// Create a store for `bucket` under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        base_url: &str,
        bucket: &str,
        token: Option<String>,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .user_agent("simpleflow/1.0")
            .build()
            .map_err(|e| StorageError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            token,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, key)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }
}

#[async_trait]
impl ContentStore for HttpBucketStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let size = bytes.len();
        debug!(bucket = %self.bucket, key = %key, size, "Storing object");

        let response = self
            .authorize(self.client.put(self.object_url(key)))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Remote {
                key: key.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        info!(bucket = %self.bucket, key = %key, size, "Object stored");
        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .authorize(self.client.get(self.object_url(key)))
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(StorageError::NotFound {
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Remote {
                key: key.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Transport(e.without_url().to_string()))?;
        Ok(bytes.to_vec())
    }
}
