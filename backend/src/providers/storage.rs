use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object storage unreachable: {0}")]
    Unavailable(String),
    #[error("Object storage rejected the upload ({status})")]
    Rejected { status: u16 },
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload a binary object under a namespaced key and return its public URL
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;
}

/// HTTP implementation of object storage
pub struct HttpStorage {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl HttpStorage {
    pub fn new(client: reqwest::Client, base_url: String, bucket: String, api_key: String) -> Self {
        Self { client, base_url, bucket, api_key }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, key)
    }
}

#[async_trait]
impl ObjectStorage for HttpStorage {
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let url = self.object_url(key);
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StorageError::Rejected { status: response.status().as_u16() });
        }

        Ok(url)
    }
}
