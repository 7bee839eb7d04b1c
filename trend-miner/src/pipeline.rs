use crate::article_store::ArticleStore;
use crate::filter::TrendFilter;
use crate::generator::{ArticleGenerator, Generation};
use crate::illustrator::Illustrator;
use crate::llm_adapter::{ImageGenerator, TextGenerator};
use crate::sources::FeedSelection;
use crate::storage::BlobStore;
use crate::traits::TrendSource;
use crate::types::{
    Article, FeedConfig, FetchConfig, FilterConfig, GenerationConfig, MinerError, PipelineStage, Result,
    RunMode, RunOutcome,
};
use crate::Fetcher;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// One fetch → filter → generate → illustrate → store pass per call.
///
/// Steps run strictly in sequence. Nothing is shared between runs except
/// the article store, so overlapping runs are safe and race only on slugs.
pub struct TrendMiner {
    source: Arc<dyn TrendSource>,
    filter: TrendFilter,
    generator: ArticleGenerator,
    illustrator: Illustrator,
    articles: Arc<dyn ArticleStore>,
    feeds: FeedConfig,
}

impl TrendMiner {
    pub fn builder() -> TrendMinerBuilder {
        TrendMinerBuilder::default()
    }

    pub async fn run(&self, mode: RunMode) -> Result<RunOutcome> {
        self.run_at(mode, Utc::now()).await
    }

    /// Run as if the clock read `now`. Drives topic rotation and the
    /// `published_at` stamp of whatever gets stored.
    pub async fn run_at(&self, mode: RunMode, now: DateTime<Utc>) -> Result<RunOutcome> {
        let span = info_span!("run", run_id = %Uuid::new_v4(), ?mode);
        async move {
            let outcome = self.execute(mode, now).await;
            match &outcome {
                Ok(outcome) => info!(stage = %outcome.terminal_stage(), "Run finished: {:?}", outcome),
                Err(e) => error!(stage = %PipelineStage::Error, "Run aborted: {}", e),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, mode: RunMode, now: DateTime<Utc>) -> Result<RunOutcome> {
        info!(stage = %PipelineStage::Fetching, "Trend mining started");
        let selection = FeedSelection::for_run(mode, now, &self.feeds)?;
        info!("Mode: {}, fetching from: {}", selection.label, selection.url);

        let items = self.source.pull(&selection.url).await;
        let found_trends = items.len();
        info!("Found {} trends via {}", found_trends, self.source.source_name());

        info!(stage = %PipelineStage::Filtering, "Filtering {} trends", found_trends);
        let candidates = self.filter.filter(items, mode);
        let filtered_trends = candidates.len();
        if candidates.is_empty() {
            warn!("No valid trends after filtering");
            return Ok(RunOutcome::NoCandidates { found_trends });
        }

        info!(stage = %PipelineStage::Generating, "Sending {} candidates to the generator", filtered_trends);
        let generated = match self.generator.generate(&candidates, selection.category).await {
            Ok(Generation::Article(article)) => article,
            Ok(Generation::Skipped(reason)) => {
                info!(stage = %PipelineStage::Skipped, "No article generated: {}", reason);
                return Ok(RunOutcome::Skipped { reason });
            }
            Err(e) => {
                error!("Generation failed: {}", e);
                return Ok(RunOutcome::Failed {
                    stage: PipelineStage::Generating,
                    reason: e.to_string(),
                });
            }
        };

        info!(stage = %PipelineStage::Illustrating, slug = %generated.slug, "Illustrating article");
        let prompt = generated.image_prompt.clone().unwrap_or_default();
        let image_url = self.illustrator.illustrate(&prompt, &generated.slug).await;

        info!(stage = %PipelineStage::Storing, slug = %generated.slug, "Storing article");
        let article = Article::from_generated(generated, image_url, now);
        let mut processed = Vec::new();
        match self.articles.upsert(&article).await {
            Ok(()) => {
                info!("Saved article: {}", article.slug);
                processed.push(article.slug);
            }
            // Generation work is already spent; report the run, minus this slug
            Err(e) => error!("DB Insert Error for {}: {}", article.slug, e),
        }

        Ok(RunOutcome::Published {
            found_trends,
            filtered_trends,
            processed,
        })
    }
}

#[derive(Default)]
pub struct TrendMinerBuilder {
    source: Option<Arc<dyn TrendSource>>,
    text: Option<Arc<dyn TextGenerator>>,
    images: Option<Arc<dyn ImageGenerator>>,
    blobs: Option<Arc<dyn BlobStore>>,
    articles: Option<Arc<dyn ArticleStore>>,
    feeds: FeedConfig,
    filter: FilterConfig,
    generation: GenerationConfig,
    fetch: FetchConfig,
}

impl TrendMinerBuilder {
    pub fn source(mut self, source: Arc<dyn TrendSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn text_generator(mut self, text: Arc<dyn TextGenerator>) -> Self {
        self.text = Some(text);
        self
    }

    pub fn image_generator(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn article_store(mut self, articles: Arc<dyn ArticleStore>) -> Self {
        self.articles = Some(articles);
        self
    }

    pub fn feed_config(mut self, feeds: FeedConfig) -> Self {
        self.feeds = feeds;
        self
    }

    pub fn filter_config(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Used for downloading generated images before upload.
    pub fn fetch_config(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn build(self) -> Result<TrendMiner> {
        let missing = |what: &str| MinerError::Config(format!("TrendMiner needs a {}", what));

        if self.feeds.categories.is_empty() {
            return Err(MinerError::Config("category rotation list is empty".to_string()));
        }

        let text = self.text.ok_or_else(|| missing("text generator"))?;
        let images = self.images.ok_or_else(|| missing("image generator"))?;
        let blobs = self.blobs.ok_or_else(|| missing("blob store"))?;

        Ok(TrendMiner {
            source: self.source.ok_or_else(|| missing("trend source"))?,
            filter: TrendFilter::new(&self.filter),
            generator: ArticleGenerator::new(text, self.generation.min_word_count),
            illustrator: Illustrator::new(images, blobs, Fetcher::new(self.fetch)?),
            articles: self.articles.ok_or_else(|| missing("article store"))?,
            feeds: self.feeds,
        })
    }
}
