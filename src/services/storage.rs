// src/services/storage.rs

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;

/// Object storage for uploaded files. The store returns an opaque
/// retrievable URL; raw bytes are never persisted in the database.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, filename: &str, bytes: Vec<u8>) -> Result<String, AppError>;
}

/// Uploads to an HTTP storage endpoint (Cloudinary-style unsigned upload
/// API) and returns the hosted URL from its response.
pub struct HttpFileStore {
    client: reqwest::Client,
    upload_url: String,
    api_key: String,
}

impl HttpFileStore {
    pub fn new(upload_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url,
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

#[async_trait]
impl FileStore for HttpFileStore {
    async fn put(&self, filename: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("File storage unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "File storage rejected upload: {}",
                response.status()
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed storage response: {}", e)))?;

        Ok(uploaded.url)
    }
}

/// Fallback used when storage is not configured. Uploads fail rather than
/// recording submissions without a retrievable file.
pub struct DisabledFileStore;

#[async_trait]
impl FileStore for DisabledFileStore {
    async fn put(&self, _filename: &str, _bytes: Vec<u8>) -> Result<String, AppError> {
        Err(AppError::Upstream(
            "File storage is not configured".to_string(),
        ))
    }
}
