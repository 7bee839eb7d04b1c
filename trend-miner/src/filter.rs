use crate::types::{FilterConfig, RunMode, TrendItem};
use tracing::debug;

/// Topic gate between the feed and the paid generation call.
pub struct TrendFilter {
    denylist: Vec<String>,
    allowlist: Vec<String>,
    require_allowlist: bool,
    scheduled_limit: usize,
    force_limit: usize,
}

impl TrendFilter {
    pub fn new(config: &FilterConfig) -> Self {
        let lower = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };

        Self {
            denylist: lower(&config.denylist),
            allowlist: lower(&config.allowlist),
            require_allowlist: config.require_allowlist,
            scheduled_limit: config.scheduled_limit,
            force_limit: config.force_limit,
        }
    }

    pub fn filter(&self, items: Vec<TrendItem>, mode: RunMode) -> Vec<TrendItem> {
        let found = items.len();

        let candidates: Vec<TrendItem> = match mode {
            RunMode::Force => items.into_iter().take(self.force_limit).collect(),
            RunMode::Scheduled => {
                let allowed: Vec<TrendItem> = items.into_iter().filter(|item| !self.is_banned(item)).collect();
                self.rank_by_allowlist(allowed)
                    .into_iter()
                    .take(self.scheduled_limit)
                    .collect()
            }
        };

        debug!(found, kept = candidates.len(), ?mode, "Filtered trend candidates");
        candidates
    }

    /// Case-insensitive substring match over title + description.
    pub fn is_banned(&self, item: &TrendItem) -> bool {
        let text = item.haystack();
        self.denylist.iter().any(|word| text.contains(word.as_str()))
    }

    pub fn is_high_value(&self, item: &TrendItem) -> bool {
        let text = item.haystack();
        self.allowlist.iter().any(|word| text.contains(word.as_str()))
    }

    fn rank_by_allowlist(&self, items: Vec<TrendItem>) -> Vec<TrendItem> {
        if self.allowlist.is_empty() {
            return items;
        }

        let (matching, rest): (Vec<TrendItem>, Vec<TrendItem>) =
            items.into_iter().partition(|item| self.is_high_value(item));

        if self.require_allowlist {
            matching
        } else {
            matching.into_iter().chain(rest).collect()
        }
    }
}

impl Default for TrendFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}
