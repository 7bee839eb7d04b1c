use crate::types::TrendItem;
use async_trait::async_trait;

/// A place trend candidates are pulled from (RSS feeds, fixtures in tests).
#[async_trait]
pub trait TrendSource: Send + Sync {
    /// Human-readable name for logs
    fn source_name(&self) -> String;

    /// Fetch and parse the feed at `feed_url`.
    /// Never fails: transport or parse problems yield an empty list.
    async fn pull(&self, feed_url: &str) -> Vec<TrendItem>;
}
