use crate::types::TrendItem;
use crate::utils::unescape_entities;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Titles of this many characters or fewer are noise ("Live", "Today", ...).
pub const MIN_TITLE_CHARS: usize = 5;

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<item>(.*?)</item>").expect("item pattern is valid"));
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title>(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?</title>").expect("title pattern is valid")
});
static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<description>(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?</description>")
        .expect("description pattern is valid")
});

/// Lenient RSS item extractor. Each `<item>` is matched on its own so one
/// broken entry does not take the whole feed down.
pub struct TrendParser;

impl TrendParser {
    pub fn parse_items(xml: &str) -> Vec<TrendItem> {
        let blocks: Vec<&str> = ITEM_RE
            .captures_iter(xml)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        debug!("Regex found {} raw items", blocks.len());

        let items: Vec<TrendItem> = blocks
            .into_iter()
            .map(|block| TrendItem {
                title: Self::field(&TITLE_RE, block),
                description: Self::field(&DESCRIPTION_RE, block),
            })
            .filter(|item| item.title.chars().count() > MIN_TITLE_CHARS)
            .collect();

        info!("Parsed {} clean trends", items.len());
        if let Some(first) = items.first() {
            info!("Top trend sample: {}", first.title);
        }
        items
    }

    fn field(pattern: &Regex, block: &str) -> String {
        pattern
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| unescape_entities(m.as_str()).trim().to_string())
            .unwrap_or_default()
    }

    /// Cheap check used for diagnostics only; parsing never depends on it.
    pub fn looks_like_feed(content: &str) -> bool {
        let content_lower = content.to_lowercase();
        content_lower.contains("<rss") || content_lower.contains("<channel") || content_lower.contains("<feed")
    }
}
