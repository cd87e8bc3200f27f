use std::collections::HashSet;
use std::sync::LazyLock;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::store::{ReviewRow, ScoredReviewRow};

pub const RAW_POSITIVE: &str = "POSITIVE";
pub const RAW_NEGATIVE: &str = "NEGATIVE";

pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Classification looks at most this many tokens per text, so pathological
/// inputs cannot blow up a scoring run.
const MAX_TOKENS: usize = 256;

static POSITIVE_WORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| load_lexicon(include_str!("../lexicons/positive.txt")));
static NEGATIVE_WORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| load_lexicon(include_str!("../lexicons/negative.txt")));

const NEGATORS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "none", "neither", "nor", "hardly", "barely",
];

fn load_lexicon(raw: &'static str) -> HashSet<&'static str> {
    raw.lines()
        .map(str::trim)
        .filter(|w| !w.is_empty() && !w.starts_with('#'))
        .collect()
}

/// One classifier output: a raw binary label and a confidence in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: &'static str,
    pub score: f64,
}

/// Score one text against the embedded sentiment lexicons.
///
/// Confidence scales with how one-sided the polarity hits are; a text with
/// no hits (or a tie) comes out POSITIVE at 0.5, the classifier's "shrug".
pub fn classify(text: &str) -> Prediction {
    let (pos, neg) = polarity_hits(text);
    let total = pos + neg;
    if total == 0 || pos == neg {
        return Prediction {
            label: RAW_POSITIVE,
            score: 0.5,
        };
    }

    let (label, dominant) = if pos > neg {
        (RAW_POSITIVE, pos)
    } else {
        (RAW_NEGATIVE, neg)
    };
    let lead = dominant - (total - dominant);
    Prediction {
        label,
        score: 0.5 + 0.5 * (lead as f64 / total as f64),
    }
}

/// Score texts in fixed-size batches, parallel within each batch, output
/// order matching input order.
pub fn classify_batch(texts: &[String], batch_size: usize) -> Vec<Prediction> {
    let mut preds = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
        let chunk_preds: Vec<Prediction> = chunk.par_iter().map(|t| classify(t)).collect();
        preds.extend(chunk_preds);
    }
    preds
}

/// Map a raw classifier label to its display form. Total over the two raw
/// labels; anything else maps to None.
pub fn display_label(raw: &str) -> Option<&'static str> {
    match raw {
        RAW_POSITIVE => Some("Positive"),
        RAW_NEGATIVE => Some("Negative"),
        _ => None,
    }
}

/// Full scoring pass: classify every review text and attach the sentiment
/// columns. Reruns rescore the whole table; there is no resume.
pub fn score_reviews(rows: Vec<ReviewRow>, batch_size: usize) -> Vec<ScoredReviewRow> {
    let texts: Vec<String> = rows.iter().map(|r| r.text.clone()).collect();

    let pb = ProgressBar::new(texts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut preds = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
        let chunk_preds: Vec<Prediction> = chunk.par_iter().map(|t| classify(t)).collect();
        pb.inc(chunk.len() as u64);
        preds.extend(chunk_preds);
    }
    pb.finish_and_clear();

    rows.into_iter()
        .zip(preds)
        .map(|(r, p)| ScoredReviewRow {
            id: r.id,
            rid: r.rid,
            date: r.date,
            rating: r.rating,
            text: r.text,
            month: r.month,
            sentiment: display_label(p.label).map(str::to_string),
            sentiment_raw: p.label.to_string(),
            confidence: p.score,
        })
        .collect()
}

fn polarity_hits(text: &str) -> (u32, u32) {
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
        .take(MAX_TOKENS)
        .map(|t| t.to_lowercase())
        .collect();

    let mut pos = 0u32;
    let mut neg = 0u32;
    for (i, token) in tokens.iter().enumerate() {
        let negated = i > 0 && is_negator(&tokens[i - 1]);
        let word = token.trim_matches('\'');
        if POSITIVE_WORDS.contains(word) {
            if negated {
                neg += 1;
            } else {
                pos += 1;
            }
        } else if NEGATIVE_WORDS.contains(word) {
            if negated {
                pos += 1;
            } else {
                neg += 1;
            }
        }
    }
    (pos, neg)
}

fn is_negator(token: &str) -> bool {
    NEGATORS.contains(&token) || token.ends_with("n't")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn great_and_terrible() {
        let preds = classify_batch(&["Great!".to_string(), "Terrible.".to_string()], 16);
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].label, RAW_POSITIVE);
        assert_eq!(preds[1].label, RAW_NEGATIVE);
        for p in &preds {
            assert!((0.0..=1.0).contains(&p.score));
        }
    }

    #[test]
    fn mixed_text_leans_with_the_majority() {
        let p = classify("The color is lovely and the fit is perfect, shipping was slow though");
        assert_eq!(p.label, RAW_POSITIVE);
        assert!(p.score < 1.0);

        let n = classify("Broken on arrival, flimsy, total waste of money. Nice box I guess.");
        assert_eq!(n.label, RAW_NEGATIVE);
    }

    #[test]
    fn negation_flips_polarity() {
        let p = classify("not good at all");
        assert_eq!(p.label, RAW_NEGATIVE);

        let n = classify("wasn't bad, honestly");
        assert_eq!(n.label, RAW_POSITIVE);
    }

    #[test]
    fn empty_or_neutral_text_is_a_coin_flip() {
        for text in ["", "the package arrived on a tuesday", "good but bad"] {
            let p = classify(text);
            assert_eq!(p.label, RAW_POSITIVE);
            assert_eq!(p.score, 0.5);
        }
    }

    #[test]
    fn truncation_ignores_late_tokens() {
        // A negative word beyond the token cap must not affect the score.
        let padding = "word ".repeat(MAX_TOKENS);
        let text = format!("great {} terrible", padding);
        let p = classify(&text);
        assert_eq!(p.label, RAW_POSITIVE);
    }

    #[test]
    fn display_mapping_is_total_over_raw_labels() {
        assert_eq!(display_label(RAW_POSITIVE), Some("Positive"));
        assert_eq!(display_label(RAW_NEGATIVE), Some("Negative"));
        assert_eq!(display_label("NEUTRAL"), None);
        assert_eq!(display_label(""), None);
    }

    #[test]
    fn batch_preserves_order_across_chunks() {
        let texts: Vec<String> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    "excellent".to_string()
                } else {
                    "awful".to_string()
                }
            })
            .collect();
        let preds = classify_batch(&texts, 3);
        assert_eq!(preds.len(), 10);
        for (i, p) in preds.iter().enumerate() {
            let expected = if i % 2 == 0 { RAW_POSITIVE } else { RAW_NEGATIVE };
            assert_eq!(p.label, expected, "index {}", i);
        }
    }

    #[test]
    fn score_reviews_attaches_columns() {
        let rows = vec![
            ReviewRow {
                id: Some("1".into()),
                rid: None,
                date: NaiveDate::from_ymd_opt(2023, 3, 4),
                rating: Some(5),
                text: "Absolutely wonderful, highly recommend".into(),
                month: Some("2023-03".into()),
            },
            ReviewRow {
                id: Some("2".into()),
                rid: None,
                date: NaiveDate::from_ymd_opt(2023, 3, 5),
                rating: Some(1),
                text: "Terrible quality, fell apart".into(),
                month: Some("2023-03".into()),
            },
        ];

        let scored = score_reviews(rows, DEFAULT_BATCH_SIZE);
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].sentiment.as_deref(), Some("Positive"));
        assert_eq!(scored[0].sentiment_raw, RAW_POSITIVE);
        assert_eq!(scored[1].sentiment.as_deref(), Some("Negative"));
        for s in &scored {
            assert!((0.0..=1.0).contains(&s.confidence));
        }
    }
}
