use crate::types::{Category, FeedConfig, MinerError, Result, RunMode};
use chrono::{DateTime, Timelike, Utc};

/// Category for a given UTC hour: `hour % categories.len()`.
pub fn category_for_hour(hour: u32, categories: &[Category]) -> Option<Category> {
    if categories.is_empty() {
        return None;
    }
    Some(categories[hour as usize % categories.len()])
}

pub fn category_at(now: DateTime<Utc>, categories: &[Category]) -> Option<Category> {
    category_for_hour(now.hour(), categories)
}

/// Which feed a run reads and which category it writes for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSelection {
    pub url: String,
    /// Category hint handed to the generator.
    pub category: Category,
    pub label: String,
}

impl FeedSelection {
    pub fn for_run(mode: RunMode, now: DateTime<Utc>, config: &FeedConfig) -> Result<Self> {
        let category = category_at(now, &config.categories)
            .ok_or_else(|| MinerError::Config("category rotation list is empty".to_string()))?;

        Ok(match mode {
            RunMode::Force => Self {
                url: config.trends_url.clone(),
                category,
                label: "FORCE (Trends)".to_string(),
            },
            RunMode::Scheduled => Self {
                url: config.topic_url(category),
                category,
                label: format!("AUTO ({})", category),
            },
        })
    }
}
