pub mod article_store;
pub mod cli;
pub mod fetcher;
pub mod filter;
pub mod generator;
pub mod illustrator;
pub mod llm_adapter;
pub mod parser;
pub mod pipeline;
pub mod server;
pub mod sources;
pub mod storage;
pub mod traits;
pub mod types;
pub mod utils;

pub use article_store::{ArticleStore, MemoryArticleStore, PgArticleStore};
pub use fetcher::Fetcher;
pub use filter::TrendFilter;
pub use generator::{ArticleGenerator, Generation};
pub use illustrator::Illustrator;
pub use llm_adapter::{ImageGenerator, MockLlmAdapter, OpenAiAdapter, TextGenerator};
pub use parser::TrendParser;
pub use pipeline::{TrendMiner, TrendMinerBuilder};
pub use server::{outcome_response, AppState};
pub use sources::{FeedSelection, RssTrendSource, StaticTrendSource};
pub use storage::{BlobStore, MemoryBlobStore, SupabaseBlobStore};
pub use traits::TrendSource;
pub use types::*;
