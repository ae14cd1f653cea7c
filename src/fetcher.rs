use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::info;

/// A feed entry as parsed from the wire, before normalization.
///
/// Fields mirror what RSS and Atom documents actually carry; anything the
/// document omits stays `None` (or empty) so normalization can apply defaults.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<String>,
    pub description: Option<String>,
    pub content_html: Option<String>,
    pub enclosure_url: Option<String>,
    pub media_content_url: Option<String>,
    pub media_thumbnail_urls: Vec<String>,
}

/// A normalized entry ready for rendering. Every field except the image
/// is guaranteed non-empty.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub content_snippet: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Feed returned HTTP status {0}")]
    Status(StatusCode),
    #[error("Failed to parse feed: {0}")]
    Parse(#[from] rss::Error),
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("WiredAiNews/0.1 (RSS Reader)")
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Fetch a feed URL and return its entries normalized for display.
    pub async fn fetch_and_normalize(&self, url: &str) -> Result<Vec<FeedItem>, FetchError> {
        info!("Fetching feed: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        let entries = parse_entries(&bytes)?;
        let items: Vec<FeedItem> = entries.into_iter().map(normalize_entry).collect();

        info!("Normalized {} items from feed", items.len());
        Ok(items)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a feed document, trying RSS first, then Atom.
fn parse_entries(bytes: &[u8]) -> Result<Vec<RawEntry>, FetchError> {
    match rss::Channel::read_from(bytes) {
        Ok(channel) => Ok(channel.items().iter().map(raw_from_rss).collect()),
        Err(rss_err) => match atom_syndication::Feed::read_from(bytes) {
            Ok(feed) => Ok(feed.entries().iter().map(raw_from_atom).collect()),
            Err(_) => Err(FetchError::Parse(rss_err)),
        },
    }
}

fn raw_from_rss(item: &rss::Item) -> RawEntry {
    let media = item.extensions().get("media");

    let media_content_url = media
        .and_then(|m| m.get("content"))
        .and_then(|list| list.first())
        .and_then(|ext| ext.attrs().get("url"))
        .cloned();

    // Thumbnails without a url attribute keep their slot so position is preserved.
    let media_thumbnail_urls = media
        .and_then(|m| m.get("thumbnail"))
        .map(|list| {
            list.iter()
                .map(|ext| ext.attrs().get("url").cloned().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();

    RawEntry {
        title: item.title().map(str::to_string),
        link: item.link().map(str::to_string),
        pub_date: item.pub_date().map(str::to_string),
        description: item.description().map(str::to_string),
        content_html: item.content().map(str::to_string),
        enclosure_url: item.enclosure().map(|e| e.url().to_string()),
        media_content_url,
        media_thumbnail_urls,
    }
}

fn raw_from_atom(entry: &atom_syndication::Entry) -> RawEntry {
    let links = entry.links();
    let link = links
        .iter()
        .find(|l| l.rel() == "alternate")
        .or_else(|| links.first())
        .map(|l| l.href().to_string());

    let enclosure_url = links
        .iter()
        .find(|l| l.rel() == "enclosure")
        .map(|l| l.href().to_string());

    let pub_date = entry
        .published()
        .unwrap_or_else(|| entry.updated())
        .to_rfc3339();

    RawEntry {
        title: Some(entry.title().to_string()),
        link,
        pub_date: Some(pub_date),
        description: entry.summary().map(|s| s.to_string()),
        content_html: entry.content().and_then(|c| c.value()).map(str::to_string),
        enclosure_url,
        media_content_url: None,
        media_thumbnail_urls: Vec::new(),
    }
}

/// Apply display defaults so the page never renders a hole.
pub fn normalize_entry(raw: RawEntry) -> FeedItem {
    let image_url = extract_image_url(&raw);

    let title = non_empty(raw.title.as_deref())
        .unwrap_or("No Title")
        .to_string();
    let link = non_empty(raw.link.as_deref()).unwrap_or("#").to_string();
    let pub_date = non_empty(raw.pub_date.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().to_rfc3339());
    let content_snippet = snippet_from(raw.description.as_deref());

    FeedItem {
        title,
        link,
        pub_date,
        content_snippet,
        image_url,
    }
}

/// Pick an image for an entry: enclosure, then media:content, then the first
/// media:thumbnail, then the first <img> in the embedded content HTML.
/// Empty URLs are treated as missing at every step.
pub fn extract_image_url(entry: &RawEntry) -> Option<String> {
    if let Some(url) = non_empty(entry.enclosure_url.as_deref()) {
        return Some(url.to_string());
    }

    if let Some(url) = non_empty(entry.media_content_url.as_deref()) {
        return Some(url.to_string());
    }

    // Only the first thumbnail is consulted, even when it carries no URL.
    if let Some(url) = non_empty(entry.media_thumbnail_urls.first().map(String::as_str)) {
        return Some(url.to_string());
    }

    let html = non_empty(entry.content_html.as_deref())?;

    img_src_pattern()
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

static IMG_SRC_RE: OnceLock<Regex> = OnceLock::new();

fn img_src_pattern() -> &'static Regex {
    IMG_SRC_RE.get_or_init(|| {
        Regex::new(r#"(?i)<img[^>]+src=["']([^"'>]+)["']"#).expect("img src pattern is valid")
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn snippet_from(description: Option<&str>) -> String {
    let stripped = description.map(strip_html).unwrap_or_default();
    match stripped.trim().lines().next() {
        Some(line) => line.to_string(),
        None => "No snippet available.".to_string(),
    }
}

/// Drop HTML tags and decode the common entities, keeping line structure
/// intact so snippets can take the first line.
fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}
