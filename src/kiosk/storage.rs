use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    /// Max-age in seconds.
    pub cache_control: String,
    pub upsert: bool,
    pub content_type: String,
}

impl UploadOptions {
    pub fn new(content_type: &str) -> Self {
        Self {
            cache_control: "3600".to_string(),
            upsert: false,
            content_type: content_type.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedObject {
    pub path: String,
}

/// Bucket-scoped object storage the kiosk uploads selfies into.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        options: &UploadOptions,
    ) -> Result<UploadedObject, StorageError>;

    fn public_url(&self, path: &str) -> Option<String>;
}

/// `selfies/<unix-millis>-<uuid>.<ext>`, with the extension taken from the content subtype.
pub fn object_path(content_type: &str) -> String {
    let ext = content_type
        .split_once('/')
        .map(|(_, sub)| sub)
        .filter(|sub| !sub.is_empty())
        .unwrap_or("jpg");

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    format!("selfies/{millis}-{}.{ext}", Uuid::new_v4())
}

/// Supabase Storage over its REST API.
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            key: config.key.clone(),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        options: &UploadOptions,
    ) -> Result<UploadedObject, StorageError> {
        let url = format!("{}/storage/v1/object/{}/{path}", self.base_url, self.bucket);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.key)
            .header("apikey", &self.key)
            .header("cache-control", format!("max-age={}", options.cache_control))
            .header("x-upsert", options.upsert.to_string())
            .header("content-type", &options.content_type)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(1024)
                .collect::<String>();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Uploaded {path} to bucket {}", self.bucket);

        Ok(UploadedObject {
            path: path.to_string(),
        })
    }

    fn public_url(&self, path: &str) -> Option<String> {
        if path.is_empty() {
            return None;
        }
        Some(format!(
            "{}/storage/v1/object/public/{}/{path}",
            self.base_url, self.bucket
        ))
    }
}
