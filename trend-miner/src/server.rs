use crate::article_store::ArticleStore;
use crate::pipeline::TrendMiner;
use crate::types::{Category, Result, RunOutcome, RunSummary, TriggerRequest};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub const DEFAULT_LIST_LIMIT: usize = 15;
const MAX_LIST_LIMIT: usize = 100;

pub struct AppState {
    pub miner: Arc<TrendMiner>,
    pub articles: Arc<dyn ArticleStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(trigger))
        .route("/trend-miner", post(trigger))
        .route("/health", get(health))
        .route("/api/articles", get(list_articles))
        .route("/api/articles/:slug", get(get_article))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Trend miner listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Status code and JSON body for a finished run.
pub fn outcome_response(outcome: RunOutcome) -> (StatusCode, Value) {
    match outcome {
        RunOutcome::Published {
            found_trends,
            filtered_trends,
            processed,
        } => {
            let summary = RunSummary {
                success: true,
                found_trends,
                filtered_trends,
                processed,
            };
            (StatusCode::OK, json!(summary))
        }
        RunOutcome::NoCandidates { .. } => (
            StatusCode::NOT_FOUND,
            json!({ "success": false, "error": "No valid trends found" }),
        ),
        RunOutcome::Skipped { .. } => (
            StatusCode::OK,
            json!({ "success": false, "message": "No article generated" }),
        ),
        RunOutcome::Failed { stage, reason } => (
            StatusCode::OK,
            json!({ "success": false, "error": reason, "stage": stage }),
        ),
    }
}

fn server_error(message: String) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))).into_response()
}

async fn trigger(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    // Schedulers often POST with no body at all
    let request: TriggerRequest = serde_json::from_slice(&body).unwrap_or_default();
    let mode = request.mode();

    let miner = state.miner.clone();
    match tokio::spawn(async move { miner.run(mode).await }).await {
        Ok(Ok(outcome)) => {
            let (status, body) = outcome_response(outcome);
            (status, Json(body)).into_response()
        }
        Ok(Err(e)) => {
            error!("Trend miner run failed: {}", e);
            server_error(e.to_string())
        }
        Err(e) => {
            error!("Trend miner task did not complete: {}", e);
            server_error(format!("run task failed: {}", e))
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    category: Option<String>,
    limit: Option<usize>,
}

async fn list_articles(State(state): State<Arc<AppState>>, Query(params): Query<ListParams>) -> Response {
    let category = match params.category.as_deref().filter(|c| !c.trim().is_empty()) {
        None => None,
        Some(raw) => match raw.parse::<Category>() {
            Ok(category) => Some(category),
            Err(e) => return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response(),
        },
    };
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);

    match state.articles.list_recent(category, limit).await {
        Ok(articles) => Json(articles).into_response(),
        Err(e) => {
            error!("Failed to list articles: {}", e);
            server_error(e.to_string())
        }
    }
}

async fn get_article(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> Response {
    match state.articles.get_by_slug(&slug).await {
        Ok(Some(article)) => Json(article).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(json!({ "error": "Article not found" }))).into_response(),
        Err(e) => {
            error!("Failed to load article {}: {}", slug, e);
            server_error(e.to_string())
        }
    }
}
