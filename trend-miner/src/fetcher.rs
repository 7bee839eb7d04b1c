use crate::types::{FetchConfig, FetchResult, MinerError, Result};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Bodies shorter than this are usually a consent page or an error stub.
const SHORT_BODY_BYTES: usize = 1000;

pub struct Fetcher {
    client: Client,
    /// No feed headers; image CDNs do not expect an RSS `Accept` or a news referer.
    media_client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(browser_headers(&config)?)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        let media_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            media_client,
            config,
        })
    }

    fn max_body_bytes(&self) -> usize {
        self.config.max_feed_size_mb.saturating_mul(1024 * 1024)
    }

    /// Single GET, no retries. Non-2xx responses come back as unsuccessful results.
    pub async fn fetch_feed(&self, url: &str) -> Result<FetchResult> {
        let start_time = Instant::now();
        let fetch_time = Utc::now();
        Url::parse(url)?;

        debug!("Fetching feed: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let response_time = start_time.elapsed().as_millis() as u64;

        if !status.is_success() {
            warn!("Feed {} answered HTTP {}", url, status);
            return Ok(FetchResult::failed(
                url,
                fetch_time,
                response_time,
                Some(status.as_u16()),
                format!("HTTP {}: {}", status, status.canonical_reason().unwrap_or("Unknown")),
            ));
        }

        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_body_bytes() {
                return Ok(FetchResult::failed(
                    url,
                    fetch_time,
                    response_time,
                    Some(status.as_u16()),
                    format!("Feed too large: {} bytes", content_length),
                ));
            }
        }

        let content = response.text().await?;
        info!("Fetched RSS. Status: {}, Length: {}", status.as_u16(), content.len());
        if content.len() < SHORT_BODY_BYTES {
            warn!("RSS response unusually short, full body: {}", content);
        }

        Ok(FetchResult {
            url: url.to_string(),
            success: true,
            error: None,
            fetch_time,
            response_time_ms: start_time.elapsed().as_millis() as u64,
            http_status: Some(status.as_u16()),
            content: Some(content),
        })
    }

    /// Downloads a binary resource such as a generated image.
    /// Subject to the same size cap as feeds.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Downloading binary content from: {}", url);

        let response = self.media_client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(MinerError::General(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let max_bytes = self.max_body_bytes();
        if let Some(content_length) = response.content_length() {
            if content_length as usize > max_bytes {
                return Err(MinerError::General(format!(
                    "Download too large: {} bytes (limit {})",
                    content_length, max_bytes
                )));
            }
        }

        let bytes = response.bytes().await?;
        // Chunked responses carry no length header
        if bytes.len() > max_bytes {
            return Err(MinerError::General(format!(
                "Download too large: {} bytes (limit {})",
                bytes.len(),
                max_bytes
            )));
        }
        Ok(bytes.to_vec())
    }
}

fn browser_headers(config: &FetchConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, header_value(&config.accept)?);
    headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);
    if let Some(referer) = &config.referer {
        headers.insert(REFERER, header_value(referer)?);
    }
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| MinerError::Config(format!("invalid header value {:?}: {}", value, e)))
}
