use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trend_miner::cli::{Cli, Command};
use trend_miner::server::{self, AppState};
use trend_miner::{outcome_response, ArticleStore, PgArticleStore, RunMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let database_url = cli.database_url()?.to_string();
    let store = PgArticleStore::connect(&database_url)
        .await
        .context("Failed to connect to the article database")?;

    match &cli.command {
        Command::Migrate => {
            store.setup_schema().await.context("Failed to create the article schema")?;
            info!("Migration complete");
        }
        Command::Run { force } => {
            let articles: Arc<dyn ArticleStore> = Arc::new(store);
            let miner = cli.build_miner(articles).context("Failed to assemble the pipeline")?;

            let outcome = miner
                .run(RunMode::from_force(*force))
                .await
                .context("Trend miner run failed")?;
            let (status, body) = outcome_response(outcome);
            info!("Run finished with status {}", status);
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Serve { bind } => {
            let articles: Arc<dyn ArticleStore> = Arc::new(store);
            let miner = cli
                .build_miner(articles.clone())
                .context("Failed to assemble the pipeline")?;

            let state = AppState {
                miner: Arc::new(miner),
                articles,
            };
            server::serve(*bind, state).await.context("HTTP server stopped")?;
        }
    }

    Ok(())
}
