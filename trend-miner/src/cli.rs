use crate::article_store::ArticleStore;
use crate::llm_adapter::OpenAiAdapter;
use crate::pipeline::TrendMiner;
use crate::sources::RssTrendSource;
use crate::storage::SupabaseBlobStore;
use crate::types::{FetchConfig, GenerationConfig, MinerError, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "trend-miner", version, about = "Turns trending headlines into published articles")]
pub struct Cli {
    /// Postgres connection string for the article table
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    #[arg(long, env = "TEXT_MODEL", default_value = "gpt-4o")]
    pub text_model: String,

    #[arg(long, env = "IMAGE_MODEL", default_value = "dall-e-3")]
    pub image_model: String,

    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub supabase_service_role_key: Option<String>,

    #[arg(long, env = "STORAGE_BUCKET", default_value = "article-images")]
    pub storage_bucket: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP trigger and read endpoints
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
    },
    /// Run the pipeline once and print the response body
    Run {
        /// General trends feed, no topic filtering, one candidate
        #[arg(long)]
        force: bool,
    },
    /// Create the article table if it does not exist
    Migrate,
}

impl Cli {
    pub fn database_url(&self) -> Result<&str> {
        required(&self.database_url, "DATABASE_URL")
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            api_base_url: self.openai_base_url.clone(),
            text_model: self.text_model.clone(),
            image_model: self.image_model.clone(),
            ..GenerationConfig::default()
        }
    }

    /// Wire the production adapters around an already connected store.
    pub fn build_miner(&self, articles: Arc<dyn ArticleStore>) -> Result<TrendMiner> {
        let api_key = required(&self.openai_api_key, "OPENAI_API_KEY")?.to_string();
        let openai = Arc::new(OpenAiAdapter::new(api_key, self.generation_config())?);

        let blobs = SupabaseBlobStore::new(
            required(&self.supabase_url, "SUPABASE_URL")?,
            required(&self.supabase_service_role_key, "SUPABASE_SERVICE_ROLE_KEY")?.to_string(),
            self.storage_bucket.clone(),
        )?;

        TrendMiner::builder()
            .source(Arc::new(RssTrendSource::new(FetchConfig::default())?))
            .text_generator(openai.clone())
            .image_generator(openai)
            .blob_store(Arc::new(blobs))
            .article_store(articles)
            .generation_config(self.generation_config())
            .build()
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MinerError::Config(format!("{} is not set", name)))
}
