use crate::traits::TrendSource;
use crate::types::{FetchConfig, Result, TrendItem};
use crate::{Fetcher, TrendParser};
use async_trait::async_trait;
use tracing::{error, info, warn};

/// Trend source backed by a live RSS feed.
pub struct RssTrendSource {
    fetcher: Fetcher,
}

impl RssTrendSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
        })
    }
}

#[async_trait]
impl TrendSource for RssTrendSource {
    fn source_name(&self) -> String {
        "RSS Feed".to_string()
    }

    async fn pull(&self, feed_url: &str) -> Vec<TrendItem> {
        let fetch_result = match self.fetcher.fetch_feed(feed_url).await {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to fetch trend feed {}: {}", feed_url, e);
                return Vec::new();
            }
        };

        if !fetch_result.success {
            warn!(
                "Trend feed {} unavailable: {}",
                feed_url,
                fetch_result.error.as_deref().unwrap_or("unknown error")
            );
            return Vec::new();
        }

        let content = match fetch_result.content {
            Some(content) => content,
            None => {
                warn!("No content returned for trend feed {}", feed_url);
                return Vec::new();
            }
        };

        if !TrendParser::looks_like_feed(&content) {
            warn!("Response from {} does not look like RSS, parsing anyway", feed_url);
        }

        let items = TrendParser::parse_items(&content);
        info!("Pulled {} trends from {}", items.len(), feed_url);
        items
    }
}

/// Serves a fixed XML document regardless of URL. Used for dry runs and tests.
pub struct StaticTrendSource {
    xml: String,
}

impl StaticTrendSource {
    pub fn new(xml: impl Into<String>) -> Self {
        Self { xml: xml.into() }
    }
}

#[async_trait]
impl TrendSource for StaticTrendSource {
    fn source_name(&self) -> String {
        "Static Feed".to_string()
    }

    async fn pull(&self, _feed_url: &str) -> Vec<TrendItem> {
        TrendParser::parse_items(&self.xml)
    }
}
