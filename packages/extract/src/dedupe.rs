//! De-duplication for extracted rows.
//!
//! Bulletins repeat the same rebate across summary tables and detail
//! sections; this pass collapses repeats after extraction so exported
//! tables stay stable. Comparison keys are case-folded and trimmed, but
//! the kept row preserves its original casing.

use std::cmp::Reverse;
use std::collections::HashMap;

use rebate_docs_extract_models::RebateRow;

type DedupeKey = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<u16>,
    Option<String>,
    Option<String>,
    Option<u32>,
    String,
);

fn fold(value: Option<&str>) -> Option<String> {
    value.map(|v| v.trim().to_lowercase())
}

fn dedupe_key(row: &RebateRow) -> DedupeKey {
    (
        fold(row.rebate_type.as_deref()),
        fold(row.program_id.as_deref()),
        fold(row.published_date.as_deref()),
        fold(row.program_start_date.as_deref()),
        fold(row.program_end_date.as_deref()),
        row.model_year,
        fold(row.model.as_deref()),
        fold(row.trim.as_deref()),
        row.amount_dollars,
        row.currency.clone(),
    )
}

/// Drops amount-less rows, keeps the highest-confidence row per composite
/// key (first one encountered wins ties), and re-sorts for human
/// presentation: rebate type, published date, newest model year first,
/// model, largest amount first. This ordering is intentionally different
/// from the internal post-filter ordering.
#[must_use]
pub fn tighten(rows: Vec<RebateRow>) -> Vec<RebateRow> {
    let input_count = rows.len();
    let mut order: Vec<DedupeKey> = Vec::new();
    let mut best: HashMap<DedupeKey, RebateRow> = HashMap::new();

    for row in rows {
        if row.amount_dollars.is_none() {
            continue;
        }
        let key = dedupe_key(&row);
        match best.get(&key) {
            Some(existing) if existing.confidence >= row.confidence => {}
            Some(_) => {
                best.insert(key, row);
            }
            None => {
                order.push(key.clone());
                best.insert(key, row);
            }
        }
    }

    let mut out: Vec<RebateRow> = order.into_iter().filter_map(|key| best.remove(&key)).collect();
    out.sort_by(|a, b| presentation_key(a).cmp(&presentation_key(b)));

    log::debug!("dedupe kept {} of {input_count} rows", out.len());
    out
}

fn presentation_key(row: &RebateRow) -> (String, String, Reverse<u16>, String, Reverse<u32>) {
    (
        row.rebate_type.as_deref().unwrap_or("").to_lowercase(),
        row.published_date.as_deref().unwrap_or("").to_lowercase(),
        Reverse(row.model_year.unwrap_or(0)),
        row.model.as_deref().unwrap_or("").to_lowercase(),
        Reverse(row.amount_dollars.unwrap_or(0)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(model: &str, amount: u32, confidence: f32) -> RebateRow {
        RebateRow {
            rebate_type: Some("Retail Customer Bonus".to_owned()),
            program_id: Some("V25URC08".to_owned()),
            published_date: Some("2025-08-01".to_owned()),
            program_start_date: None,
            program_end_date: None,
            model_year: Some(2025),
            model: Some(model.to_owned()),
            trim: None,
            exclusions: None,
            amount_dollars: Some(amount),
            currency: "USD".to_owned(),
            page: 10,
            confidence,
        }
    }

    #[test]
    fn collapses_case_folded_duplicates() {
        let rows = vec![row("Tiguan", 1500, 0.9), row("TIGUAN", 1500, 0.6)];
        let out = tighten(rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].model.as_deref(), Some("Tiguan"));
    }

    #[test]
    fn keeps_highest_confidence_row() {
        let rows = vec![row("Tiguan", 1500, 0.6), row("tiguan", 1500, 0.9)];
        let out = tighten(rows);
        assert_eq!(out.len(), 1);
        assert!((out[0].confidence - 0.9).abs() < f32::EPSILON);
        assert_eq!(out[0].model.as_deref(), Some("tiguan"));
    }

    #[test]
    fn confidence_ties_keep_first_encountered() {
        let rows = vec![row("Tiguan", 1500, 0.9), row("TIGUAN", 1500, 0.9)];
        let out = tighten(rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].model.as_deref(), Some("Tiguan"));
    }

    #[test]
    fn distinct_amounts_survive() {
        let rows = vec![row("Tiguan", 1500, 0.9), row("Tiguan", 2000, 0.9)];
        let out = tighten(rows);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn drops_rows_without_amounts() {
        let mut no_amount = row("Tiguan", 0, 0.9);
        no_amount.amount_dollars = None;
        assert!(tighten(vec![no_amount]).is_empty());
    }

    #[test]
    fn is_idempotent() {
        let rows = vec![
            row("Tiguan", 1500, 0.9),
            row("Tiguan", 1500, 0.6),
            row("Atlas", 2000, 0.9),
        ];
        let once = tighten(rows);
        let twice = tighten(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn sorts_largest_amount_first_within_model() {
        let rows = vec![row("Tiguan", 500, 0.9), row("Tiguan", 2000, 0.9)];
        let out = tighten(rows);
        assert_eq!(out[0].amount_dollars, Some(2000));
        assert_eq!(out[1].amount_dollars, Some(500));
    }

    #[test]
    fn sorts_newest_year_first() {
        let mut older = row("Tiguan", 1500, 0.9);
        older.model_year = Some(2024);
        let rows = vec![older, row("Tiguan", 1500, 0.9)];
        let out = tighten(rows);
        assert_eq!(out[0].model_year, Some(2025));
        assert_eq!(out[1].model_year, Some(2024));
    }
}
