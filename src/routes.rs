use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, Datelike, Utc};
use tracing::warn;

use crate::fetcher::{FeedItem, Fetcher};

pub const FEED_URL: &str = "https://www.wired.com/feed/tag/ai/latest/rss";

const TITLE_LIMIT: usize = 80;
const SNIPPET_LIMIT: usize = 120;

pub struct AppState {
    pub fetcher: Fetcher,
    pub feed_url: String,
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub cards: Vec<Card>,
    pub year: i32,
}

pub struct Card {
    pub title: String,
    pub link: String,
    pub date: String,
    pub snippet: String,
    pub image_url: Option<String>,
}

impl From<FeedItem> for Card {
    fn from(item: FeedItem) -> Self {
        Card {
            title: truncate(&item.title, TITLE_LIMIT),
            link: item.link,
            date: format_pub_date(&item.pub_date),
            snippet: truncate(&item.content_snippet, SNIPPET_LIMIT),
            image_url: item.image_url,
        }
    }
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Route handlers
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let items = match state.fetcher.fetch_and_normalize(&state.feed_url).await {
        Ok(items) => items,
        Err(err) => {
            warn!("Could not load feed, rendering empty page: {}", err);
            Vec::new()
        }
    };

    let cards: Vec<Card> = items.into_iter().map(Card::from).collect();

    HtmlTemplate(IndexTemplate {
        cards,
        year: Utc::now().year(),
    })
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

/// Cap a string at `limit` characters, ending in an ellipsis when cut.
pub fn truncate(s: &str, limit: usize) -> String {
    if s.chars().count() > limit {
        let prefix: String = s.chars().take(limit.saturating_sub(1)).collect();
        format!("{}…", prefix)
    } else {
        s.to_string()
    }
}

/// Render a feed date like "December 9, 2024". Strings that parse as
/// neither RFC 2822 nor RFC 3339 pass through unchanged.
pub fn format_pub_date(raw: &str) -> String {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
