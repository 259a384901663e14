//! Fixture web server

use std::net::SocketAddr;

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::static_files::StaticFiles;

/// Build the fixture router
pub fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/static/*path", get(static_handler))
        .route("/api/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
}

/// Start the fixture server
pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Image registration fixture listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router()).await?;
    Ok(())
}

async fn index_handler() -> Response {
    StaticFiles::serve("index.html")
}

async fn static_handler(Path(path): Path<String>) -> Response {
    StaticFiles::serve(&path)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "imgreg-fixture"
    }))
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
