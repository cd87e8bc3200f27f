pub mod products;
pub mod reviews;
pub mod testimonials;

use std::collections::HashSet;
use std::hash::Hash;

use anyhow::{Context, Result};
use reqwest::Client;

/// GET a page and return its body. Any non-success status is fatal.
pub(crate) async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?;
    let resp = resp
        .error_for_status()
        .with_context(|| format!("GET {} returned an error status", url))?;
    resp.text()
        .await
        .with_context(|| format!("Failed to read body of {}", url))
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub(crate) fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove duplicates by full-row equality, keeping first-seen order.
/// The scraped rows have no uniqueness key, so this is the only de-dup
/// available.
pub(crate) fn dedup_rows<T: Eq + Hash + Clone>(rows: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    rows.into_iter().filter(|r| seen.insert(r.clone())).collect()
}
