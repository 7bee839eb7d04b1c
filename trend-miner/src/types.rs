use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// Shared domain types live in the interfaces crate
pub use interfaces::defs::{
    Article, ArticleSummary, Category, GeneratedArticle, PipelineStage, RunMode, RunOutcome,
    RunSummary, TrendItem, TriggerRequest,
};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub referer: Option<String>,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            // Some trend feeds reject non-browser agents
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept: "application/rss+xml, application/xml;q=0.9, text/xml;q=0.8, */*;q=0.7".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            referer: Some("https://news.google.com/".to_string()),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub denylist: Vec<String>,
    pub allowlist: Vec<String>,
    /// Drop items that match no allowlist keyword instead of only ranking them lower.
    pub require_allowlist: bool,
    pub scheduled_limit: usize,
    pub force_limit: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let denylist = [
            "Football", "Soccer", "Movie", "Song", "Lyrics", "Celebrity", "Gossip", "Game", "Sport",
        ];
        Self {
            denylist: denylist.iter().map(|s| s.to_string()).collect(),
            allowlist: Vec::new(),
            require_allowlist: false,
            scheduled_limit: 5,
            force_limit: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub image_size: String,
    pub min_word_count: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com/v1".to_string(),
            text_model: "gpt-4o".to_string(),
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            min_word_count: 2000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// General trends feed used by force runs.
    pub trends_url: String,
    pub topic_base_url: String,
    pub topic_query: String,
    /// Rotation order for scheduled runs.
    pub categories: Vec<Category>,
}

impl FeedConfig {
    pub fn topic_url(&self, category: Category) -> String {
        format!("{}{}{}", self.topic_base_url, category.as_str(), self.topic_query)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            trends_url: "https://trends.google.com/trending/rss?geo=US".to_string(),
            topic_base_url: "https://news.google.com/rss/headlines/section/topic/".to_string(),
            topic_query: "?hl=en-US&gl=US&ceid=US:en".to_string(),
            categories: Category::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    pub success: bool,
    pub error: Option<String>,
    pub fetch_time: DateTime<Utc>,
    pub response_time_ms: u64,
    pub http_status: Option<u16>,
    pub content: Option<String>,
}

impl FetchResult {
    pub(crate) fn failed(url: &str, fetch_time: DateTime<Utc>, response_time_ms: u64, http_status: Option<u16>, error: String) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            error: Some(error),
            fetch_time,
            response_time_ms,
            http_status,
            content: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MinerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Illustration failed: {0}")]
    Illustration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, MinerError>;
