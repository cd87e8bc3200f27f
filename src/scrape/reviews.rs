use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::store::ReviewRow;

const REVIEWS_QUERY: &str = r#"
query Reviews($first: Int!, $after: String) {
  reviews(first: $first, after: $after) {
    edges {
      node {
        id
        rid
        text
        rating
        date
      }
    }
    pageInfo {
      hasNextPage
      endCursor
    }
  }
}
"#;

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<ReviewsData>,
}

#[derive(Deserialize)]
struct ReviewsData {
    reviews: ReviewsBlock,
}

#[derive(Deserialize)]
struct ReviewsBlock {
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(rename = "pageInfo", default)]
    page_info: PageInfo,
}

#[derive(Deserialize, Default)]
struct PageInfo {
    #[serde(rename = "hasNextPage", default)]
    has_next_page: bool,
    #[serde(rename = "endCursor", default)]
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
struct Edge {
    node: Node,
}

#[derive(Deserialize, Default)]
struct Node {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    rid: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    rating: Option<i64>,
    #[serde(default)]
    date: Option<String>,
}

/// Walk the review feed with cursor pagination and return rows for the
/// target year, in server order.
///
/// Termination, checked in order: empty edge list, `hasNextPage` false,
/// missing/empty `endCursor`, or the `max_pages` ceiling (so a server that
/// always claims another page cannot loop us forever).
pub async fn scrape_reviews(
    client: &Client,
    base_url: &str,
    first: i64,
    max_pages: usize,
    year: i32,
) -> Result<Vec<ReviewRow>> {
    let endpoint = format!("{}/api/graphql", base_url.trim_end_matches('/'));
    let mut nodes = Vec::new();
    let mut after: Option<String> = None;

    for page in 1..=max_pages {
        let body = serde_json::json!({
            "query": REVIEWS_QUERY,
            "variables": { "first": first, "after": after },
        });
        let resp = client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("GraphQL request failed (page {})", page))?
            .error_for_status()
            .with_context(|| format!("GraphQL endpoint returned an error status (page {})", page))?;

        let payload: GraphQlResponse = resp
            .json()
            .await
            .context("Invalid GraphQL response body")?;
        let block = payload
            .data
            .map(|d| d.reviews)
            .ok_or_else(|| anyhow!("GraphQL response missing data.reviews"))?;

        info!("Reviews page {}: {} edges", page, block.edges.len());

        if block.edges.is_empty() {
            break;
        }
        nodes.extend(block.edges.into_iter().map(|e| e.node));

        if !block.page_info.has_next_page {
            break;
        }
        match block.page_info.end_cursor {
            Some(cursor) if !cursor.is_empty() => after = Some(cursor),
            _ => break,
        }
    }

    Ok(finalize_rows(nodes, year))
}

/// Parse dates, apply the year filter, derive the month column, trim text.
/// Malformed dates become None and fall out with the year filter rather
/// than failing the crawl.
fn finalize_rows(nodes: Vec<Node>, year: i32) -> Vec<ReviewRow> {
    nodes
        .into_iter()
        .filter_map(|n| {
            let date = n.date.as_deref().and_then(parse_date)?;
            if date.year() != year {
                return None;
            }
            Some(ReviewRow {
                id: n.id,
                rid: n.rid,
                month: Some(date.format("%Y-%m").to_string()),
                date: Some(date),
                rating: n.rating,
                text: n.text.unwrap_or_default().trim().to_string(),
            })
        })
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}
