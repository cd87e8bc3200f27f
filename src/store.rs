use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const REVIEWS_FILE: &str = "reviews.csv";
pub const SCORED_FILE: &str = "reviews_scored.csv";
pub const PRODUCTS_FILE: &str = "products.csv";
pub const TESTIMONIALS_FILE: &str = "testimonials.csv";

/// One crawled review, already year-filtered. Optional fields were absent in
/// the GraphQL node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRow {
    pub id: Option<String>,
    pub rid: Option<String>,
    pub date: Option<NaiveDate>,
    pub rating: Option<i64>,
    pub text: String,
    pub month: Option<String>,
}

/// ReviewRow plus the sentiment columns attached by the scoring pass.
/// `sentiment` is None when the classifier emitted a label outside the
/// known raw label set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredReviewRow {
    pub id: Option<String>,
    pub rid: Option<String>,
    pub date: Option<NaiveDate>,
    pub rating: Option<i64>,
    pub text: String,
    pub month: Option<String>,
    pub sentiment_raw: String,
    pub confidence: f64,
    pub sentiment: Option<String>,
}

/// A product card. None means no selector matched that field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductRow {
    pub name: Option<String>,
    pub price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestimonialRow {
    pub text: String,
}

pub fn ensure_data_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))
}

pub fn table_path(dir: &Path, file: &str) -> PathBuf {
    dir.join(file)
}

// ── Writing ──

fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_reviews(dir: &Path, rows: &[ReviewRow]) -> Result<()> {
    write_table(&table_path(dir, REVIEWS_FILE), rows)
}

pub fn write_scored(dir: &Path, rows: &[ScoredReviewRow]) -> Result<()> {
    write_table(&table_path(dir, SCORED_FILE), rows)
}

pub fn write_products(dir: &Path, rows: &[ProductRow]) -> Result<()> {
    write_table(&table_path(dir, PRODUCTS_FILE), rows)
}

pub fn write_testimonials(dir: &Path, rows: &[TestimonialRow]) -> Result<()> {
    write_table(&table_path(dir, TESTIMONIALS_FILE), rows)
}

// ── Reading ──

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: T =
            record.with_context(|| format!("Malformed row in {}", path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read the crawled review table; a missing file is a hard error because
/// everything downstream depends on it.
pub fn read_reviews(dir: &Path) -> Result<Vec<ReviewRow>> {
    let path = table_path(dir, REVIEWS_FILE);
    if !path.exists() {
        bail!(
            "Missing {} — run `brandpulse reviews` (or `scrape`) first",
            path.display()
        );
    }
    read_table(&path)
}

pub fn read_scored(dir: &Path) -> Result<Vec<ScoredReviewRow>> {
    read_table(&table_path(dir, SCORED_FILE))
}

pub fn read_products(dir: &Path) -> Result<Vec<ProductRow>> {
    read_table(&table_path(dir, PRODUCTS_FILE))
}

pub fn read_testimonials(dir: &Path) -> Result<Vec<TestimonialRow>> {
    read_table(&table_path(dir, TESTIMONIALS_FILE))
}

// ── Stats ──

pub struct TableStats {
    pub file: &'static str,
    /// None when the file does not exist yet.
    pub rows: Option<usize>,
}

pub fn collect_stats(dir: &Path) -> Result<Vec<TableStats>> {
    let mut stats = Vec::new();
    for file in [REVIEWS_FILE, SCORED_FILE, PRODUCTS_FILE, TESTIMONIALS_FILE] {
        let path = table_path(dir, file);
        let rows = if path.exists() {
            Some(count_rows(&path)?)
        } else {
            None
        };
        stats.push(TableStats { file, rows });
    }
    Ok(stats)
}

fn count_rows(path: &Path) -> Result<usize> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut count = 0;
    for record in reader.records() {
        record.with_context(|| format!("Malformed row in {}", path.display()))?;
        count += 1;
    }
    Ok(count)
}
