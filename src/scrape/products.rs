use std::sync::LazyLock;

use anyhow::Result;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::info;
use url::Url;

use super::{collapse_ws, dedup_rows, fetch_page};
use crate::store::ProductRow;

static CARD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".product, .product-card").unwrap());
static NAME_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, .title, .product-title").unwrap());
static PRICE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".price, .product-price").unwrap());
static NEXT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[rel='next'], .pagination a.next").unwrap());

struct ListingPage {
    rows: Vec<ProductRow>,
    next: Option<String>,
}

/// Crawl the product listing, following the "next" link until it disappears
/// or the page ceiling is hit. Zero cards on a page is not an error.
pub async fn scrape_products(
    client: &Client,
    base_url: &str,
    max_pages: usize,
) -> Result<Vec<ProductRow>> {
    let mut rows = Vec::new();
    let mut url = format!("{}/products", base_url.trim_end_matches('/'));

    for page in 1..=max_pages {
        let body = fetch_page(client, &url).await?;
        let listing = parse_listing(&body, &url);
        info!("Products page {}: {} cards", page, listing.rows.len());
        rows.extend(listing.rows);

        match listing.next {
            Some(next) => url = next,
            None => break,
        }
    }

    // Cards where no selector matched anything carry no information.
    let rows: Vec<ProductRow> = rows
        .into_iter()
        .filter(|r| r.name.is_some() || r.price.is_some())
        .collect();
    Ok(dedup_rows(rows))
}

/// Extract product cards and the next-page link from one listing page.
/// A missing field selector records None for that field instead of
/// dropping the row.
fn parse_listing(html: &str, page_url: &str) -> ListingPage {
    let doc = Html::parse_document(html);

    let rows = doc
        .select(&CARD_SEL)
        .map(|card| ProductRow {
            name: select_text(&card, &NAME_SEL),
            price: select_text(&card, &PRICE_SEL),
        })
        .collect();

    let next = doc
        .select(&NEXT_SEL)
        .find_map(|a| a.value().attr("href"))
        .filter(|href| !href.is_empty())
        .and_then(|href| resolve_href(page_url, href));

    ListingPage { rows, next }
}

fn select_text(card: &ElementRef, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|el| collapse_ws(&el.text().collect::<String>()))
}

fn resolve_href(base: &str, href: &str) -> Option<String> {
    let joined = Url::parse(base).ok()?.join(href).ok()?;
    Some(joined.to_string())
}
