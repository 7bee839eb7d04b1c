mod common;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex, Once};
use trend_miner::{
    ArticleStore, Category, FeedConfig, MemoryArticleStore, MemoryBlobStore, MockLlmAdapter, PipelineStage,
    RunMode, RunOutcome, StaticTrendSource, TrendItem, TrendMiner, TrendParser, TrendSource,
};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Daily Search Trends</title>
  <item>
    <title><![CDATA[Premier League football transfer news]]></title>
    <description>Clubs spend big</description>
  </item>
  <item>
    <title><![CDATA[Mortgage rates fall to 6%]]></title>
    <description><![CDATA[Buyers &amp; lenders react]]></description>
  </item>
  <item>
    <title>Tiny</title>
  </item>
  <item>
    <title>Gold price hits record high</title>
    <description>Investors seek safety</description>
  </item>
</channel></rss>"#;

const ARTICLE_JSON: &str = r#"{
  "slug": "mortgage-rates-fall-what-to-do-now",
  "title": "Mortgage Rates Fall: What To Do Now",
  "content": "<h1>Mortgage Rates Fall</h1><p>Refinancing math explained.</p>",
  "meta_description": "How falling rates change your refinance math",
  "category": "BUSINESS",
  "keywords": ["mortgage", "refinance"],
  "image_prompt": "A house key on a stack of coins, cinematic lighting"
}"#;

fn at_hour(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, 15, 0).unwrap()
}

struct Harness {
    miner: TrendMiner,
    llm: MockLlmAdapter,
    blobs: Arc<MemoryBlobStore>,
    articles: Arc<MemoryArticleStore>,
}

fn harness(source: Arc<dyn TrendSource>, llm: MockLlmAdapter, blobs: MemoryBlobStore, articles: MemoryArticleStore) -> Harness {
    init_tracing();
    let blobs = Arc::new(blobs);
    let articles = Arc::new(articles);
    let miner = TrendMiner::builder()
        .source(source)
        .text_generator(Arc::new(llm.clone()))
        .image_generator(Arc::new(llm.clone()))
        .blob_store(blobs.clone())
        .article_store(articles.clone())
        .build()
        .unwrap();
    Harness {
        miner,
        llm,
        blobs,
        articles,
    }
}

fn default_llm() -> MockLlmAdapter {
    MockLlmAdapter::new("pipeline".to_string())
        .with_completion(ARTICLE_JSON)
        .with_image_url("http://127.0.0.1:9/transient.png")
}

/// Records which feed URL each run asked for.
struct RecordingSource {
    urls: Mutex<Vec<String>>,
    xml: String,
}

#[async_trait]
impl TrendSource for RecordingSource {
    fn source_name(&self) -> String {
        "Recording".to_string()
    }

    async fn pull(&self, feed_url: &str) -> Vec<TrendItem> {
        self.urls.lock().unwrap().push(feed_url.to_string());
        TrendParser::parse_items(&self.xml)
    }
}

#[tokio::test]
async fn test_scheduled_run_publishes_article() {
    let h = harness(
        Arc::new(StaticTrendSource::new(FEED)),
        default_llm(),
        MemoryBlobStore::new(),
        MemoryArticleStore::new(),
    );

    let now = at_hour(9);
    let outcome = h.miner.run_at(RunMode::Scheduled, now).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Published {
            found_trends: 3,
            filtered_trends: 2,
            processed: vec!["mortgage-rates-fall-what-to-do-now".to_string()],
        }
    );

    let prompt = h.llm.last_prompt().unwrap();
    assert!(prompt.contains("Mortgage rates fall to 6%"));
    assert!(prompt.contains("Buyers & lenders react"));
    assert!(!prompt.contains("football"));

    let stored = h
        .articles
        .get_by_slug("mortgage-rates-fall-what-to-do-now")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.category, Category::Business);
    assert_eq!(stored.published_at, now);
    assert_eq!(h.llm.text_calls(), 1);
    assert_eq!(h.llm.image_calls(), 1);
}

#[tokio::test]
async fn test_denylisted_trends_never_reach_the_generator() {
    let feed = "<item><title>Celebrity gossip roundup</title></item>\
                <item><title>Console game sales</title><description>holiday</description></item>\
                <item><title>Stadium news</title><description>SOCCER fans cheer</description></item>";
    let h = harness(
        Arc::new(StaticTrendSource::new(feed)),
        default_llm(),
        MemoryBlobStore::new(),
        MemoryArticleStore::new(),
    );

    let outcome = h.miner.run_at(RunMode::Scheduled, at_hour(3)).await.unwrap();

    assert_eq!(outcome, RunOutcome::NoCandidates { found_trends: 3 });
    assert_eq!(h.llm.text_calls(), 0);
    assert_eq!(h.articles.len().await, 0);
}

#[tokio::test]
async fn test_force_mode_bypasses_denylist_and_takes_one() {
    let source = Arc::new(RecordingSource {
        urls: Mutex::new(Vec::new()),
        xml: FEED.to_string(),
    });
    let h = harness(source.clone(), default_llm(), MemoryBlobStore::new(), MemoryArticleStore::new());

    let outcome = h.miner.run_at(RunMode::Force, at_hour(14)).await.unwrap();

    match outcome {
        RunOutcome::Published { found_trends, filtered_trends, .. } => {
            assert_eq!(found_trends, 3);
            assert_eq!(filtered_trends, 1);
        }
        other => panic!("expected a published run, got {:?}", other),
    }

    let prompt = h.llm.last_prompt().unwrap();
    assert!(prompt.contains("Premier League football transfer news"));
    assert!(!prompt.contains("Gold price"));
    assert_eq!(source.urls.lock().unwrap().as_slice(), [FeedConfig::default().trends_url]);
}

#[tokio::test]
async fn test_empty_feed_returns_no_candidates_without_paid_calls() {
    let h = harness(
        Arc::new(StaticTrendSource::new("<rss><channel><title>Nothing</title></channel></rss>")),
        default_llm(),
        MemoryBlobStore::new(),
        MemoryArticleStore::new(),
    );

    for mode in [RunMode::Scheduled, RunMode::Force] {
        let outcome = h.miner.run_at(mode, at_hour(0)).await.unwrap();
        assert_eq!(outcome, RunOutcome::NoCandidates { found_trends: 0 });
    }
    assert_eq!(h.llm.text_calls(), 0);
    assert_eq!(h.llm.image_calls(), 0);
}

#[tokio::test]
async fn test_missing_title_skips_illustration_and_store() {
    let llm = MockLlmAdapter::new("skip".to_string())
        .with_completion(r#"{"content": "<p>nothing worth writing</p>"}"#)
        .with_image_url("http://127.0.0.1:9/x.png");
    let h = harness(
        Arc::new(StaticTrendSource::new(FEED)),
        llm,
        MemoryBlobStore::new(),
        MemoryArticleStore::new(),
    );

    let outcome = h.miner.run_at(RunMode::Scheduled, at_hour(5)).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Skipped { .. }));
    assert_eq!(outcome.terminal_stage(), PipelineStage::Skipped);
    assert_eq!(h.llm.image_calls(), 0);
    assert_eq!(h.articles.len().await, 0);
}

#[tokio::test]
async fn test_image_is_persisted_to_blob_store() {
    let transient = common::image_server().await;
    let llm = MockLlmAdapter::new("durable".to_string())
        .with_completion(ARTICLE_JSON)
        .with_image_url(transient);
    let h = harness(
        Arc::new(StaticTrendSource::new(FEED)),
        llm,
        MemoryBlobStore::new(),
        MemoryArticleStore::new(),
    );

    let outcome = h.miner.run_at(RunMode::Scheduled, at_hour(7)).await.unwrap();
    assert_eq!(outcome.terminal_stage(), PipelineStage::Done);

    let stored = h
        .articles
        .get_by_slug("mortgage-rates-fall-what-to-do-now")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.image_url.as_deref(),
        Some("memory://article-images/mortgage-rates-fall-what-to-do-now.png")
    );
    let object = h.blobs.get("mortgage-rates-fall-what-to-do-now.png").await.unwrap();
    assert_eq!(object.bytes, common::PNG_BYTES.to_vec());
    assert_eq!(object.content_type, "image/png");
}

#[tokio::test]
async fn test_upload_failure_keeps_transient_image_url() {
    let transient = common::image_server().await;
    let llm = MockLlmAdapter::new("degraded".to_string())
        .with_completion(ARTICLE_JSON)
        .with_image_url(transient.clone());
    let h = harness(
        Arc::new(StaticTrendSource::new(FEED)),
        llm,
        MemoryBlobStore::failing(),
        MemoryArticleStore::new(),
    );

    let outcome = h.miner.run_at(RunMode::Scheduled, at_hour(7)).await.unwrap();

    let RunOutcome::Published { processed, .. } = outcome else {
        panic!("expected a published run");
    };
    assert_eq!(processed, vec!["mortgage-rates-fall-what-to-do-now"]);
    assert_eq!(h.blobs.upload_attempts(), 1);
    assert_eq!(h.blobs.len().await, 0);

    let stored = h.articles.get_by_slug(&processed[0]).await.unwrap().unwrap();
    assert_eq!(stored.image_url, Some(transient));
}

#[tokio::test]
async fn test_unreachable_transient_image_skips_upload() {
    let h = harness(
        Arc::new(StaticTrendSource::new(FEED)),
        default_llm(),
        MemoryBlobStore::new(),
        MemoryArticleStore::new(),
    );

    h.miner.run_at(RunMode::Scheduled, at_hour(7)).await.unwrap();

    let stored = h
        .articles
        .get_by_slug("mortgage-rates-fall-what-to-do-now")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.image_url.as_deref(), Some("http://127.0.0.1:9/transient.png"));
    assert_eq!(h.blobs.upload_attempts(), 0);
}

#[tokio::test]
async fn test_image_generation_failure_publishes_without_image() {
    let llm = MockLlmAdapter::new("no-images".to_string()).with_completion(ARTICLE_JSON);
    let h = harness(
        Arc::new(StaticTrendSource::new(FEED)),
        llm,
        MemoryBlobStore::new(),
        MemoryArticleStore::new(),
    );

    let outcome = h.miner.run_at(RunMode::Scheduled, at_hour(7)).await.unwrap();

    assert_eq!(outcome.terminal_stage(), PipelineStage::Done);
    let stored = h
        .articles
        .get_by_slug("mortgage-rates-fall-what-to-do-now")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.image_url.is_none());
}

#[tokio::test]
async fn test_generation_failure_is_reported_not_thrown() {
    let llm = MockLlmAdapter::new("garbled".to_string()).with_completion("Here's your article!");
    let h = harness(
        Arc::new(StaticTrendSource::new(FEED)),
        llm,
        MemoryBlobStore::new(),
        MemoryArticleStore::new(),
    );

    let outcome = h.miner.run_at(RunMode::Scheduled, at_hour(8)).await.unwrap();

    match outcome {
        RunOutcome::Failed { stage, reason } => {
            assert_eq!(stage, PipelineStage::Generating);
            assert!(reason.contains("not valid JSON"));
        }
        other => panic!("expected a failed run, got {:?}", other),
    }
    assert_eq!(h.llm.image_calls(), 0);
    assert_eq!(h.articles.len().await, 0);
}

#[tokio::test]
async fn test_store_failure_is_partial_success() {
    let h = harness(
        Arc::new(StaticTrendSource::new(FEED)),
        default_llm(),
        MemoryBlobStore::new(),
        MemoryArticleStore::failing(),
    );

    let outcome = h.miner.run_at(RunMode::Scheduled, at_hour(10)).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Published {
            found_trends: 3,
            filtered_trends: 2,
            processed: Vec::new(),
        }
    );
}

#[tokio::test]
async fn test_rerun_on_same_slug_refreshes_timestamp() {
    let h = harness(
        Arc::new(StaticTrendSource::new(FEED)),
        default_llm(),
        MemoryBlobStore::new(),
        MemoryArticleStore::new(),
    );

    h.miner.run_at(RunMode::Scheduled, at_hour(1)).await.unwrap();
    h.miner.run_at(RunMode::Scheduled, at_hour(2)).await.unwrap();

    assert_eq!(h.articles.len().await, 1);
    let listed = h.articles.list_recent(None, 15).await.unwrap();
    assert_eq!(listed[0].published_at, at_hour(2));
}

#[tokio::test]
async fn test_scheduled_rotation_repeats_every_category_count_hours() {
    let source = Arc::new(RecordingSource {
        urls: Mutex::new(Vec::new()),
        xml: FEED.to_string(),
    });
    let h = harness(source.clone(), default_llm(), MemoryBlobStore::new(), MemoryArticleStore::new());
    let n = Category::ALL.len() as u32;

    for hour in [2, 2 + n, 2 + 2 * n] {
        h.miner.run_at(RunMode::Scheduled, at_hour(hour)).await.unwrap();
    }
    h.miner.run_at(RunMode::Scheduled, at_hour(3)).await.unwrap();

    let urls = source.urls.lock().unwrap().clone();
    assert_eq!(urls[0], urls[1]);
    assert_eq!(urls[1], urls[2]);
    assert_ne!(urls[0], urls[3]);
    assert!(urls[0].contains("/topic/HEALTH?"));
    assert!(urls[3].contains("/topic/SCIENCE?"));
}
