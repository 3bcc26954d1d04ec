//! Single-page web front-end and its JSON API

pub mod api;

use crate::config::Sample;
use crate::service::Captioner;
use axum::{
    Router,
    response::Html,
    routing::{get, post},
};
use log::info;
use std::sync::Arc;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Shared application state
pub struct AppState {
    pub captioner: Captioner,
    pub samples: Vec<Sample>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "OK" }))
        .route("/api/samples", get(api::list_samples))
        .route("/api/check", post(api::check_video))
        .route("/api/transcribe", post(api::transcribe))
        .route("/api/annotate", post(api::annotate))
        .route("/api/download", post(api::download))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Serve until the process is stopped.
pub async fn run(bind: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
