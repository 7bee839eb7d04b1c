use crate::types::{MinerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Durable object storage for article images
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str, upsert: bool) -> Result<()>;

    fn public_url(&self, key: &str) -> String;
}

/// Supabase Storage over its REST API
pub struct SupabaseBlobStore {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseBlobStore {
    pub fn new(base_url: &str, service_key: String, bucket: String) -> Result<Self> {
        // Validate early so a typo fails at startup, not mid-run
        url::Url::parse(base_url)?;
        if service_key.trim().is_empty() {
            return Err(MinerError::Config("storage service key is required".to_string()));
        }

        Ok(Self {
            client: Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, key)
    }
}

impl fmt::Debug for SupabaseBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseBlobStore")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl BlobStore for SupabaseBlobStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str, upsert: bool) -> Result<()> {
        let size = bytes.len();
        let response = self
            .client
            .post(self.object_url(key))
            .bearer_auth(&self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MinerError::Storage(format!("upload of {} returned HTTP {}: {}", key, status, body)));
        }

        debug!(key, size, "Uploaded object to bucket {}", self.bucket);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-process blob store for tests and local dry runs
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    fail_uploads: bool,
    attempts: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upload is rejected with a storage error.
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    /// Uploads tried so far, rejected ones included.
    pub fn upload_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str, upsert: bool) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads {
            return Err(MinerError::Storage(format!("upload of {} rejected", key)));
        }

        let mut objects = self.objects.write().await;
        if !upsert && objects.contains_key(key) {
            return Err(MinerError::Storage(format!("object {} already exists", key)));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://article-images/{}", key)
    }
}
