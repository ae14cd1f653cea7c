mod fetcher;
mod routes;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::fetcher::Fetcher;
use crate::routes::AppState;

// Only the feed's own image CDN is approved for embedding.
const IMAGE_CSP: &str = "default-src 'self'; img-src 'self' https://media.wired.com";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wired_ai_news=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Create app state
    let state = Arc::new(AppState {
        fetcher: Fetcher::new(),
        feed_url: routes::FEED_URL.to_string(),
    });

    // Build router
    let app = Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(IMAGE_CSP),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Server starting on http://localhost:3000");

    axum::serve(listener, app).await?;

    Ok(())
}
