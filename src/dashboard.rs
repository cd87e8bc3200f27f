use std::path::Path;

use anyhow::{bail, Result};
use chrono::Datelike;
use tracing::warn;

use crate::store::{self, ScoredReviewRow};

/// Aggregates for one slice of scored reviews.
#[derive(Debug, PartialEq)]
pub struct SentimentSummary {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    pub avg_positive_confidence: Option<f64>,
    pub avg_negative_confidence: Option<f64>,
}

// ── Sections ──

/// Product table. A missing table is not fatal here: the dashboard shows
/// whatever has been crawled so far.
pub fn render_products(dir: &Path) -> Result<()> {
    let rows = load_or_warn(dir, store::PRODUCTS_FILE, store::read_products)?;
    if rows.is_empty() {
        println!("No products. Run `brandpulse products` to crawl the listing.");
        return Ok(());
    }

    println!("{:>3} | {:<40} | {:>10}", "#", "Product", "Price");
    println!("{}", "-".repeat(60));
    for (i, r) in rows.iter().enumerate() {
        println!(
            "{:>3} | {:<40} | {:>10}",
            i + 1,
            truncate(r.name.as_deref().unwrap_or("-"), 40),
            r.price.as_deref().unwrap_or("-"),
        );
    }
    println!("\n{} products", rows.len());
    Ok(())
}

pub fn render_testimonials(dir: &Path) -> Result<()> {
    let rows = load_or_warn(dir, store::TESTIMONIALS_FILE, store::read_testimonials)?;
    if rows.is_empty() {
        println!("No testimonials. Run `brandpulse testimonials` to crawl them.");
        return Ok(());
    }

    for (i, r) in rows.iter().enumerate() {
        println!("{:>3}. {}", i + 1, truncate(&r.text, 100));
    }
    println!("\n{} testimonials", rows.len());
    Ok(())
}

/// Review sentiment section. Unlike the other sections this one refuses to
/// render without its input table: an empty sentiment dashboard is more
/// misleading than an error.
pub fn render_reviews(dir: &Path, year: i32, month: Option<&str>) -> Result<()> {
    let path = store::table_path(dir, store::SCORED_FILE);
    if !path.exists() {
        bail!(
            "Missing {} — run `brandpulse score` first",
            path.display()
        );
    }

    let rows = store::read_scored(dir)?;
    let rows = filter_year(rows, year);
    let months = months_present(&rows);

    let rows = match month {
        Some(m) => {
            if !months.iter().any(|have| have == m) {
                bail!(
                    "No reviews for month {} in {}. Available months: {}",
                    m,
                    year,
                    if months.is_empty() {
                        "none".to_string()
                    } else {
                        months.join(", ")
                    }
                );
            }
            filter_month(rows, m)
        }
        None => rows,
    };

    if rows.is_empty() {
        println!("No reviews in {}.", year);
        return Ok(());
    }

    let summary = summarize(&rows);
    let scope = month.map(str::to_string).unwrap_or_else(|| year.to_string());
    println!("Review sentiment — {}\n", scope);
    print_summary(&summary);

    println!(
        "\n{:>3} | {:<10} | {:>6} | {:<8} | {:>5} | {:<60}",
        "#", "Date", "Rating", "Label", "Conf", "Review"
    );
    println!("{}", "-".repeat(105));
    for (i, r) in rows.iter().enumerate() {
        println!(
            "{:>3} | {:<10} | {:>6} | {:<8} | {:>5.2} | {:<60}",
            i + 1,
            r.date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            r.rating.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
            r.sentiment.as_deref().unwrap_or("?"),
            r.confidence,
            truncate(&r.text, 60),
        );
    }
    println!("\n{} reviews | months: {}", rows.len(), months.join(", "));
    Ok(())
}

fn print_summary(s: &SentimentSummary) {
    let width = 30usize;
    let max = s.positive.max(s.negative).max(1);
    println!(
        "Positive: {:>4} {}  (avg conf {})",
        s.positive,
        bar(s.positive, max, width),
        fmt_conf(s.avg_positive_confidence),
    );
    println!(
        "Negative: {:>4} {}  (avg conf {})",
        s.negative,
        bar(s.negative, max, width),
        fmt_conf(s.avg_negative_confidence),
    );
}

fn fmt_conf(c: Option<f64>) -> String {
    c.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into())
}

fn load_or_warn<T>(
    dir: &Path,
    file: &'static str,
    read: impl Fn(&Path) -> Result<Vec<T>>,
) -> Result<Vec<T>> {
    let path = store::table_path(dir, file);
    if !path.exists() {
        warn!("{} not found; section will be empty", path.display());
        return Ok(Vec::new());
    }
    read(dir)
}

// ── Aggregation ──

pub fn filter_year(rows: Vec<ScoredReviewRow>, year: i32) -> Vec<ScoredReviewRow> {
    rows.into_iter()
        .filter(|r| r.date.is_some_and(|d| d.year() == year))
        .collect()
}

pub fn filter_month(rows: Vec<ScoredReviewRow>, month: &str) -> Vec<ScoredReviewRow> {
    rows.into_iter()
        .filter(|r| r.month.as_deref() == Some(month))
        .collect()
}

/// Distinct months present in the rows, sorted ascending. "YYYY-MM" strings
/// sort chronologically as plain text.
pub fn months_present(rows: &[ScoredReviewRow]) -> Vec<String> {
    let mut months: Vec<String> = rows.iter().filter_map(|r| r.month.clone()).collect();
    months.sort();
    months.dedup();
    months
}

pub fn summarize(rows: &[ScoredReviewRow]) -> SentimentSummary {
    let mut positive = 0usize;
    let mut negative = 0usize;
    let mut pos_conf = 0.0f64;
    let mut neg_conf = 0.0f64;

    for r in rows {
        match r.sentiment.as_deref() {
            Some("Positive") => {
                positive += 1;
                pos_conf += r.confidence;
            }
            Some("Negative") => {
                negative += 1;
                neg_conf += r.confidence;
            }
            _ => {}
        }
    }

    SentimentSummary {
        total: rows.len(),
        positive,
        negative,
        avg_positive_confidence: (positive > 0).then(|| pos_conf / positive as f64),
        avg_negative_confidence: (negative > 0).then(|| neg_conf / negative as f64),
    }
}

fn bar(count: usize, max: usize, width: usize) -> String {
    let filled = (count * width) / max.max(1);
    "#".repeat(filled)
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(date: (i32, u32, u32), month: &str, sentiment: &str, conf: f64) -> ScoredReviewRow {
        ScoredReviewRow {
            id: None,
            rid: None,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            rating: Some(4),
            text: "fine".into(),
            month: Some(month.into()),
            sentiment_raw: sentiment.to_uppercase(),
            confidence: conf,
            sentiment: Some(sentiment.into()),
        }
    }

    #[test]
    fn year_filter_drops_other_years_and_undated_rows() {
        let mut undated = row((2023, 1, 1), "2023-01", "Positive", 0.9);
        undated.date = None;
        let rows = vec![
            row((2023, 1, 5), "2023-01", "Positive", 0.9),
            row((2022, 12, 30), "2022-12", "Negative", 0.8),
            undated,
        ];
        let kept = filter_year(rows, 2023);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].month.as_deref(), Some("2023-01"));
    }

    #[test]
    fn months_are_sorted_and_distinct() {
        let rows = vec![
            row((2023, 3, 1), "2023-03", "Positive", 0.9),
            row((2023, 1, 1), "2023-01", "Negative", 0.8),
            row((2023, 3, 9), "2023-03", "Positive", 0.7),
        ];
        assert_eq!(months_present(&rows), vec!["2023-01", "2023-03"]);
    }

    #[test]
    fn month_filter_keeps_only_matching_rows() {
        let rows = vec![
            row((2023, 3, 1), "2023-03", "Positive", 0.9),
            row((2023, 1, 1), "2023-01", "Negative", 0.8),
        ];
        let kept = filter_month(rows, "2023-01");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].sentiment.as_deref(), Some("Negative"));
    }

    #[test]
    fn summary_averages_confidence_per_label() {
        let rows = vec![
            row((2023, 3, 1), "2023-03", "Positive", 0.8),
            row((2023, 3, 2), "2023-03", "Positive", 0.6),
            row((2023, 3, 3), "2023-03", "Negative", 0.9),
        ];
        let s = summarize(&rows);
        assert_eq!(s.total, 3);
        assert_eq!(s.positive, 2);
        assert_eq!(s.negative, 1);
        assert!((s.avg_positive_confidence.unwrap() - 0.7).abs() < 1e-9);
        assert!((s.avg_negative_confidence.unwrap() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn summary_of_nothing_has_no_averages() {
        let s = summarize(&[]);
        assert_eq!(s.total, 0);
        assert_eq!(s.avg_positive_confidence, None);
        assert_eq!(s.avg_negative_confidence, None);
    }

    #[test]
    fn unknown_labels_count_toward_total_only() {
        let mut r = row((2023, 3, 1), "2023-03", "Positive", 0.8);
        r.sentiment = None;
        let s = summarize(&[r]);
        assert_eq!(s.total, 1);
        assert_eq!(s.positive, 0);
        assert_eq!(s.negative, 0);
    }

    #[test]
    fn bar_scales_to_the_largest_bucket() {
        assert_eq!(bar(10, 10, 20), "#".repeat(20));
        assert_eq!(bar(5, 10, 20), "#".repeat(10));
        assert_eq!(bar(0, 10, 20), "");
        assert_eq!(bar(0, 0, 20), "");
    }

    #[test]
    fn truncate_appends_ellipsis_past_the_limit() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly ten", 11), "exactly ten");
        assert_eq!(truncate("a longer review text", 8), "a longer...");
    }
}
