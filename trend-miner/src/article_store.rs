use crate::types::{Article, ArticleSummary, Category, MinerError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Persistence for published articles, keyed by slug.
///
/// Upserts are last-write-wins: concurrent runs that land on the same slug
/// are not serialized, the later write simply replaces the earlier one.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn upsert(&self, article: &Article) -> Result<()>;

    /// Newest first, optionally limited to one category.
    async fn list_recent(&self, category: Option<Category>, limit: usize) -> Result<Vec<ArticleSummary>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    id BIGSERIAL PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    meta_description TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    keywords TEXT[] NOT NULL DEFAULT '{}',
    image_url TEXT,
    published_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#;

const RECENCY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS articles_published_at_idx ON articles (published_at DESC)";

pub struct PgArticleStore {
    db: PgPool,
}

impl PgArticleStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    pub fn with_pool(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.db).await?;
        sqlx::query(RECENCY_INDEX).execute(&self.db).await?;
        info!("Article schema is ready");
        Ok(())
    }

    fn category_from_row(row: &PgRow) -> Result<Category> {
        let raw: String = row.try_get("category")?;
        raw.parse::<Category>()
            .map_err(|e| MinerError::Parse(format!("stored article has {}", e)))
    }

    fn article_from_row(row: &PgRow) -> Result<Article> {
        Ok(Article {
            slug: row.try_get("slug")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            meta_description: row.try_get("meta_description")?,
            category: Self::category_from_row(row)?,
            keywords: row.try_get("keywords")?,
            image_url: row.try_get("image_url")?,
            published_at: row.try_get("published_at")?,
        })
    }

    fn summary_from_row(row: &PgRow) -> Result<ArticleSummary> {
        Ok(ArticleSummary {
            slug: row.try_get("slug")?,
            title: row.try_get("title")?,
            category: Self::category_from_row(row)?,
            meta_description: row.try_get("meta_description")?,
            image_url: row.try_get("image_url")?,
            published_at: row.try_get("published_at")?,
        })
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn upsert(&self, article: &Article) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO articles (slug, title, content, meta_description, category, keywords, image_url, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (slug) DO UPDATE
            SET title = EXCLUDED.title,
                content = EXCLUDED.content,
                meta_description = EXCLUDED.meta_description,
                category = EXCLUDED.category,
                keywords = EXCLUDED.keywords,
                image_url = EXCLUDED.image_url,
                published_at = EXCLUDED.published_at
            "#,
        )
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.meta_description)
        .bind(article.category.as_str())
        .bind(&article.keywords)
        .bind(&article.image_url)
        .bind(article.published_at)
        .execute(&self.db)
        .await?;

        debug!("Upserted article {}", article.slug);
        Ok(())
    }

    async fn list_recent(&self, category: Option<Category>, limit: usize) -> Result<Vec<ArticleSummary>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT slug, title, category, meta_description, image_url, published_at
            FROM articles
            WHERE ($1::TEXT IS NULL OR category = $1)
            ORDER BY published_at DESC
            LIMIT $2
            "#,
        )
        .bind(category.map(|c| c.as_str()))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(Self::summary_from_row).collect()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let row = sqlx::query(
            r#"
            SELECT slug, title, content, meta_description, category, keywords, image_url, published_at
            FROM articles
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(Self::article_from_row).transpose()
    }
}

/// In-process article store with the same upsert semantics.
#[derive(Default)]
pub struct MemoryArticleStore {
    articles: RwLock<HashMap<String, Article>>,
    fail_writes: bool,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upsert is rejected, reads still work.
    pub fn failing() -> Self {
        Self {
            articles: RwLock::new(HashMap::new()),
            fail_writes: true,
        }
    }

    pub async fn len(&self) -> usize {
        self.articles.read().await.len()
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn upsert(&self, article: &Article) -> Result<()> {
        if self.fail_writes {
            return Err(MinerError::Storage(format!("upsert of {} rejected", article.slug)));
        }
        self.articles
            .write()
            .await
            .insert(article.slug.clone(), article.clone());
        Ok(())
    }

    async fn list_recent(&self, category: Option<Category>, limit: usize) -> Result<Vec<ArticleSummary>> {
        let articles = self.articles.read().await;
        let mut matching: Vec<&Article> = articles
            .values()
            .filter(|a| category.map_or(true, |c| a.category == c))
            .collect();
        matching.sort_by(|a, b| b.published_at.cmp(&a.published_at).then_with(|| a.slug.cmp(&b.slug)));

        Ok(matching.into_iter().take(limit).map(ArticleSummary::from).collect())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        Ok(self.articles.read().await.get(slug).cloned())
    }
}
