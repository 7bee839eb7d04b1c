use crate::llm_adapter::TextGenerator;
use crate::types::{Category, GeneratedArticle, MinerError, Result, TrendItem};
use crate::utils::{count_words, slugify, truncate_for_log};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What came back from the generation capability.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Article(GeneratedArticle),
    /// The model declined the input as low value. Not an error.
    Skipped(String),
}

/// Loose view of the reply. Everything is optional so validation can tell
/// a skip apart from a broken payload.
#[derive(Debug, Default, Deserialize)]
struct RawArticle {
    #[serde(default)]
    skip: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
    slug: Option<String>,
    title: Option<String>,
    content: Option<String>,
    meta_description: Option<String>,
    category: Option<String>,
    #[serde(default, deserialize_with = "keyword_list")]
    keywords: Vec<String>,
    image_prompt: Option<String>,
}

pub struct ArticleGenerator {
    text: Arc<dyn TextGenerator>,
    min_word_count: usize,
}

impl ArticleGenerator {
    pub fn new(text: Arc<dyn TextGenerator>, min_word_count: usize) -> Self {
        Self { text, min_word_count }
    }

    pub fn build_prompt(&self, candidates: &[TrendItem], category: Category) -> String {
        let trends = candidates
            .iter()
            .enumerate()
            .map(|(i, t)| format!("[{}] Title: {} | Desc: {}", i + 1, t.title, t.description))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are the chief editor of a personal finance and wealth publication.

Input trends ({category}):
{trends}

Task:
1. Pick the single strongest trend, or merge 2-3 closely related trends into one story.
2. Frame it around money: revenue, investment, savings or career upside.
3. If none of the trends can carry such an article, answer {{"skip": true, "reason": "<why>"}}.

Output rules:
- Reply with one JSON object and nothing else.
- Fields: slug (lowercase, hyphenated, URL-safe), title (plain text, no markdown),
  content (HTML only: h1, h2, h3, p, ul, li, table, strong; no markdown),
  meta_description, category ("{category}"), keywords (10 strings),
  image_prompt (cinematic, high-contrast scene for an illustration).
- content must be at least {min_words} words."#,
            category = category,
            trends = trends,
            min_words = self.min_word_count,
        )
    }

    pub async fn generate(&self, candidates: &[TrendItem], category: Category) -> Result<Generation> {
        let prompt = self.build_prompt(candidates, category);
        let raw = self.text.complete_json(&prompt).await?;
        debug!("Raw AI Response: {}", truncate_for_log(&raw, 500));

        let generation = self.parse_response(&raw, category)?;
        match &generation {
            Generation::Article(article) => {
                info!("AI selected trend(s) and generated: \"{}\"", article.title);
                let words = count_words(&article.content);
                if words < self.min_word_count {
                    // Short copy still publishes; the floor is a prompt target
                    warn!(words, min = self.min_word_count, "Generated article is below the word target");
                }
            }
            Generation::Skipped(reason) => info!("AI skipped this batch: {}", reason),
        }
        Ok(generation)
    }

    /// Validate the reply text into a [`Generation`].
    pub fn parse_response(&self, raw: &str, category_hint: Category) -> Result<Generation> {
        let parsed: RawArticle = serde_json::from_str(raw).map_err(|e| {
            if e.is_data() {
                MinerError::Generation(format!("response has an unexpected shape: {}", e))
            } else {
                MinerError::Generation(format!("response is not valid JSON: {}", e))
            }
        })?;

        if parsed.skip == Some(true) {
            let reason = parsed.reason.unwrap_or_else(|| "low value input".to_string());
            return Ok(Generation::Skipped(reason));
        }

        let title = match non_blank(parsed.title) {
            Some(title) => title,
            None => return Ok(Generation::Skipped("response has no title".to_string())),
        };

        let content = non_blank(parsed.content)
            .ok_or_else(|| MinerError::Generation(format!("article \"{}\" has no content", title)))?;

        let slug = slugify(parsed.slug.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(&title));
        if slug.is_empty() {
            return Err(MinerError::Generation(format!("could not derive a slug for \"{}\"", title)));
        }

        let category = match parsed.category.as_deref().map(str::parse::<Category>) {
            Some(Ok(category)) => category,
            Some(Err(e)) => {
                warn!("{}, falling back to {}", e, category_hint);
                category_hint
            }
            None => category_hint,
        };

        let keywords = parsed
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Generation::Article(GeneratedArticle {
            slug,
            title,
            content,
            meta_description: parsed.meta_description.unwrap_or_default().trim().to_string(),
            category,
            keywords,
            image_prompt: non_blank(parsed.image_prompt),
        }))
    }
}

/// Keywords are optional. Accepts `null`, an array, or one comma-separated
/// string; anything else is treated as no keywords.
fn keyword_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let keywords = match raw {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(joined)) => joined.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    Ok(keywords)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
