use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One headline + description pair pulled out of a trends feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendItem {
    pub title: String,
    pub description: String,
}

impl TrendItem {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Title and description joined, lowercased, for keyword matching.
    pub fn haystack(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Business,
    Technology,
    Health,
    Science,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Business,
        Category::Technology,
        Category::Health,
        Category::Science,
    ];

    /// Feed topic id, also the value stored in the `category` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Business => "BUSINESS",
            Category::Technology => "TECHNOLOGY",
            Category::Health => "HEALTH",
            Category::Science => "SCIENCE",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(wanted.to_owned()))
    }
}

/// Validated payload coming back from the text generation capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub meta_description: String,
    pub category: Category,
    pub keywords: Vec<String>,
    /// Only consumed by the illustration step, never persisted.
    pub image_prompt: Option<String>,
}

/// Row of the `articles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub meta_description: String,
    pub category: Category,
    pub keywords: Vec<String>,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl Article {
    pub fn from_generated(generated: GeneratedArticle, image_url: Option<String>, published_at: DateTime<Utc>) -> Self {
        Self {
            slug: generated.slug,
            title: generated.title,
            content: generated.content,
            meta_description: generated.meta_description,
            category: generated.category,
            keywords: generated.keywords,
            image_url,
            published_at,
        }
    }
}

/// Listing projection used by index pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub slug: String,
    pub title: String,
    pub category: Category,
    pub meta_description: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl From<&Article> for ArticleSummary {
    fn from(article: &Article) -> Self {
        Self {
            slug: article.slug.clone(),
            title: article.title.clone(),
            category: article.category,
            meta_description: article.meta_description.clone(),
            image_url: article.image_url.clone(),
            published_at: article.published_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Timer-driven run: topic rotation and denylist filtering apply.
    Scheduled,
    /// Operator override: general trends feed, no topic filtering, one candidate.
    Force,
}

impl RunMode {
    pub fn from_force(force: bool) -> Self {
        if force { RunMode::Force } else { RunMode::Scheduled }
    }

    pub fn is_force(&self) -> bool {
        matches!(self, RunMode::Force)
    }
}

/// Body accepted by the trigger endpoint. Absent `force` means scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    #[serde(default)]
    pub force: Option<bool>,
}

impl TriggerRequest {
    pub fn mode(&self) -> RunMode {
        RunMode::from_force(self.force == Some(true))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Fetching,
    Filtering,
    Generating,
    Skipped,
    Illustrating,
    Storing,
    Done,
    Error,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Fetching => "fetching",
            PipelineStage::Filtering => "filtering",
            PipelineStage::Generating => "generating",
            PipelineStage::Skipped => "skipped",
            PipelineStage::Illustrating => "illustrating",
            PipelineStage::Storing => "storing",
            PipelineStage::Done => "done",
            PipelineStage::Error => "error",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Published {
        found_trends: usize,
        filtered_trends: usize,
        processed: Vec<String>,
    },
    NoCandidates {
        found_trends: usize,
    },
    Skipped {
        reason: String,
    },
    Failed {
        stage: PipelineStage,
        reason: String,
    },
}

impl RunOutcome {
    pub fn terminal_stage(&self) -> PipelineStage {
        match self {
            RunOutcome::Published { .. } => PipelineStage::Done,
            RunOutcome::NoCandidates { .. } => PipelineStage::Filtering,
            RunOutcome::Skipped { .. } => PipelineStage::Skipped,
            RunOutcome::Failed { .. } => PipelineStage::Error,
        }
    }
}

/// Success body of the trigger endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub success: bool,
    pub found_trends: usize,
    pub filtered_trends: usize,
    pub processed: Vec<String>,
}
