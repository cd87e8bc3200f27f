use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use reqwest::header::REFERER;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::info;

use super::{collapse_ws, dedup_rows};
use crate::store::TestimonialRow;

const API_PATH: &str = "/api/testimonials";
const SECRET_TOKEN: &str = "secret123";

static CARD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".testimonial, .testimonial-card, blockquote").unwrap());

/// Crawl the testimonials API page by page. The endpoint wants a token
/// header and a referer, and answers with HTML fragments.
///
/// The end of pagination arrives as an HTTP error whose JSON body says
/// `detail.error == "invalid page"`. That shape is a heuristic signal from
/// the upstream, not a contract — it ends the crawl normally, while every
/// other non-success status stays fatal.
pub async fn scrape_testimonials(
    client: &Client,
    base_url: &str,
    max_pages: usize,
) -> Result<Vec<TestimonialRow>> {
    let base = base_url.trim_end_matches('/');
    let referer = format!("{}/testimonials", base);
    let mut rows = Vec::new();

    for page in 1..=max_pages {
        let url = format!("{}{}?page={}", base, API_PATH, page);
        let resp = client
            .get(&url)
            .header("X-Secret-Token", SECRET_TOKEN)
            .header(REFERER, &referer)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        if !status.is_success() {
            if is_end_of_pagination(&body) {
                info!("Testimonials page {}: end of pagination", page);
                break;
            }
            bail!("GET {} returned status {}", url, status);
        }

        let cards = parse_cards(&body);
        info!("Testimonials page {}: {} cards", page, cards.len());
        if cards.is_empty() {
            break;
        }
        rows.extend(cards);
    }

    Ok(dedup_rows(rows))
}

fn parse_cards(html: &str) -> Vec<TestimonialRow> {
    let doc = Html::parse_fragment(html);
    doc.select(&CARD_SEL)
        .filter_map(|card| {
            let text = collapse_ws(&card.text().collect::<String>());
            (!text.is_empty()).then_some(TestimonialRow { text })
        })
        .collect()
}

fn is_end_of_pagination(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| Some(v.get("detail")?.get("error")? == "invalid page"))
        .unwrap_or(false)
}
