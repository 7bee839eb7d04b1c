use crate::llm_adapter::ImageGenerator;
use crate::storage::BlobStore;
use crate::Fetcher;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const IMAGE_CONTENT_TYPE: &str = "image/png";

/// Turns an image prompt into a durable image URL.
///
/// Never fails the run: a generation error yields `None`, and a failed
/// download or upload falls back to the short-lived URL the generator
/// returned.
pub struct Illustrator {
    images: Arc<dyn ImageGenerator>,
    blobs: Arc<dyn BlobStore>,
    fetcher: Fetcher,
}

impl Illustrator {
    pub fn new(images: Arc<dyn ImageGenerator>, blobs: Arc<dyn BlobStore>, fetcher: Fetcher) -> Self {
        Self { images, blobs, fetcher }
    }

    pub fn object_key(slug: &str) -> String {
        format!("{}.png", slug)
    }

    pub async fn illustrate(&self, prompt: &str, slug: &str) -> Option<String> {
        if prompt.trim().is_empty() {
            warn!("No image prompt for {}, publishing without an image", slug);
            return None;
        }

        info!("Generating image for: {}", slug);
        let transient_url = match self.images.generate_image(prompt).await {
            Ok(url) => url,
            Err(e) => {
                error!("Image generation failed for {}: {}", slug, e);
                return None;
            }
        };

        let key = Self::object_key(slug);
        info!("Persisting image to storage: {}", key);

        let bytes = match self.fetcher.fetch_bytes(&transient_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not download generated image for {}: {}; keeping transient URL", slug, e);
                return Some(transient_url);
            }
        };

        match self.blobs.upload(&key, bytes, IMAGE_CONTENT_TYPE, true).await {
            Ok(()) => {
                let public_url = self.blobs.public_url(&key);
                info!("Permanent image saved: {}", public_url);
                Some(public_url)
            }
            Err(e) => {
                error!("Storage upload failed for {}: {}; keeping transient URL", key, e);
                Some(transient_url)
            }
        }
    }
}
