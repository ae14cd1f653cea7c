//! Wired AI News - A single-page RSS news site
//!
//! This crate serves one page over the Wired AI feed. Each page load fetches
//! the feed, normalizes its entries, and renders them as a card grid.

pub mod fetcher;
pub mod routes;
