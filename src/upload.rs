//! Forwarding of profile pictures to the external file storage service.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Storage service returned status {0}")]
    Status(u16),
}

/// A file received with a registration request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

/// Client for the storage service's multipart upload endpoint.
#[derive(Clone)]
pub struct PictureUploader {
    client: reqwest::Client,
    endpoint: Url,
}

impl PictureUploader {
    pub fn new(endpoint: Url) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder().timeout(UPLOAD_TIMEOUT).build()?;
        Ok(Self { client, endpoint })
    }

    /// Send the file as the `file` field and return the URL the service assigned to it.
    pub async fn upload(&self, file: UploadedFile) -> Result<String, UploadError> {
        let mut part = Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::Status(response.status().as_u16()));
        }

        let body: UploadResponse = response.json().await?;
        Ok(body.url)
    }
}
