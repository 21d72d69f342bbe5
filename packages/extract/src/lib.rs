#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Line-oriented contextual extraction of rebate rows from bulletin tokens.
//!
//! Incentive bulletins arrive as PDFs with no machine-readable structure;
//! a tokenizer (outside this crate) turns each one into positioned text
//! tokens, and [`extract`] turns those tokens into structured
//! [`RebateRow`](rebate_docs_extract_models::RebateRow)s. The pass is
//! deterministic, rule-based, and purely synchronous: tokens in, rows out,
//! no I/O. Malformed fragments resolve to absent fields rather than
//! errors, so one bad line never discards the rest of a document.
//!
//! Pipeline: classify tokens → rebuild lines → index the table of contents
//! → walk lines with the context-tracking rule chain → filter, sort, and
//! group the emitted rows.

pub mod dedupe;
pub mod filter;
pub mod lines;
pub mod parsing;
pub mod patterns;
pub mod toc;
pub mod walker;

use rebate_docs_extract_models::{DocumentResult, Provenance, Token};

/// Version tag of the extraction rule set, stamped into provenance.
/// Bump whenever classifier behavior changes.
pub const RULES_VERSION: &str = "2025-08-27";

/// Extracts structured rebate rows from one document's tokens.
///
/// `parser_name` records which tokenizer produced the input and is passed
/// through to provenance untouched.
#[must_use]
pub fn extract(doc_id: &str, mut tokens: Vec<Token>, parser_name: &str) -> DocumentResult {
    log::info!(
        "Starting extraction for document {doc_id} with {} tokens",
        tokens.len()
    );

    let patterns = patterns::PatternSet::new();
    let (money, labels) = lines::classify_tokens(&mut tokens, &patterns);
    log::debug!("classified {money} money tokens and {labels} label tokens");

    let lines = lines::rebuild_lines(&tokens);
    let toc_index = toc::build_index(&lines, &patterns);
    let candidates = walker::LineWalker::new(&patterns, &toc_index, &lines).run();
    let candidate_count = candidates.len();
    let (rows, groups, group_order) = filter::finalize(candidates);

    log::info!(
        "Extracted {} rows from {candidate_count} candidates for document {doc_id} ({} TOC entries)",
        rows.len(),
        toc_index.len()
    );

    DocumentResult {
        doc_id: doc_id.to_owned(),
        rows,
        provenance: Provenance {
            parser: parser_name.to_owned(),
            rules_version: RULES_VERSION.to_owned(),
            groups,
            group_order,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, left: f64, page: u32, line_id: u32) -> Token {
        Token {
            text: text.to_string(),
            bbox: (left, 0.0, left + 40.0, 10.0),
            page,
            line_id,
            block_id: None,
            kind: None,
        }
    }

    /// Tokens for a line, spaced left to right.
    fn line(page: u32, line_id: u32, words: &[&str]) -> Vec<Token> {
        words
            .iter()
            .enumerate()
            .map(|(i, word)| token(word, i as f64 * 50.0, page, line_id))
            .collect()
    }

    #[test]
    fn extracts_worked_toc_and_page_example() {
        let mut tokens = Vec::new();
        tokens.extend(line(
            1,
            1,
            &["Program", "ID", "Program", "Name", "Updated", "Page(s)"],
        ));
        tokens.extend(line(
            1,
            2,
            &["V25URC08", "Retail", "Customer", "Bonus", "8/1/2025", "10"],
        ));
        tokens.extend(line(10, 1, &["Retail", "Customer", "Bonus"]));
        tokens.extend(line(10, 2, &["MY25", "Tiguan"]));
        tokens.extend(line(10, 3, &["SE", "$1,500"]));

        let result = extract("test_doc", tokens, "pdfplumber");

        assert_eq!(result.doc_id, "test_doc");
        assert_eq!(result.rows.len(), 1);
        let row = &result.rows[0];
        assert_eq!(row.rebate_type.as_deref(), Some("Retail Customer Bonus"));
        assert_eq!(row.program_id.as_deref(), Some("V25URC08"));
        assert_eq!(row.published_date.as_deref(), Some("2025-08-01"));
        assert_eq!(row.model_year, Some(2025));
        assert_eq!(row.model.as_deref(), Some("Tiguan"));
        assert_eq!(row.trim.as_deref(), Some("SE"));
        assert_eq!(row.amount_dollars, Some(1500));
        assert_eq!(row.currency, "USD");
        assert_eq!(row.page, 10);
    }

    #[test]
    fn extracts_multiple_trims_under_one_header() {
        let mut tokens = Vec::new();
        tokens.extend(line(1, 1, &["MY25", "Atlas"]));
        tokens.extend(line(1, 2, &["SE", "$2,000"]));
        tokens.extend(line(1, 3, &["SEL", "$2,500"]));

        let result = extract("test_doc", tokens, "pdfplumber");

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].model.as_deref(), Some("Atlas"));
        assert_eq!(result.rows[0].trim.as_deref(), Some("SE"));
        assert_eq!(result.rows[0].amount_dollars, Some(2000));
        assert_eq!(result.rows[1].trim.as_deref(), Some("SEL"));
        assert_eq!(result.rows[1].amount_dollars, Some(2500));
    }

    #[test]
    fn extracts_inline_exclusions() {
        let tokens = line(
            1,
            1,
            &["Tiguan", "$1,500", "(excludes", "base", "trim)"],
        );
        let result = extract("test_doc", tokens, "pdfplumber");

        assert_eq!(result.rows.len(), 1);
        assert_eq!(
            result.rows[0].exclusions.as_deref(),
            Some("(excludes base trim)")
        );
    }

    #[test]
    fn all_vehicles_phrase_yields_the_all_sentinel() {
        let tokens = line(
            1,
            1,
            &["New,", "unused", "Volkswagen", "models", "$500"],
        );
        let result = extract("test_doc", tokens, "pdfplumber");

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].model.as_deref(), Some("all"));
        assert_eq!(result.rows[0].amount_dollars, Some(500));
    }

    #[test]
    fn money_ranges_emit_both_endpoints() {
        let tokens = line(1, 1, &["Tiguan", "$1,000", "-", "$2,000"]);
        let result = extract("test_doc", tokens, "pdfplumber");

        let mut amounts: Vec<u32> = result
            .rows
            .iter()
            .filter_map(|r| r.amount_dollars)
            .collect();
        amounts.sort_unstable();
        assert_eq!(amounts, vec![1000, 2000]);
    }

    #[test]
    fn programs_without_amounts_produce_no_rows() {
        let mut tokens = Vec::new();
        tokens.extend(line(
            1,
            1,
            &["Program", "ID", "Program", "Name", "Updated", "Page(s)"],
        ));
        tokens.extend(line(
            1,
            2,
            &["V25URC08", "Test", "Program", "8/1/2025", "10"],
        ));
        tokens.extend(line(10, 1, &["Test", "Program"]));
        tokens.extend(line(10, 2, &["Some", "text"]));

        let result = extract("test_doc", tokens, "pdfplumber");
        assert!(result.rows.is_empty());
    }

    #[test]
    fn header_label_values_flow_into_rows() {
        let mut tokens = Vec::new();
        tokens.extend(line(1, 1, &["Program", "ID"]));
        tokens.extend(line(1, 2, &["V25URC08"]));
        tokens.extend(line(1, 3, &["Published"]));
        tokens.extend(line(1, 4, &["8/1/2025"]));
        tokens.extend(line(1, 5, &["Program", "Start"]));
        tokens.extend(line(1, 6, &["8/1/2025"]));
        tokens.extend(line(1, 7, &["Program", "End"]));
        tokens.extend(line(1, 8, &["12/31/2025"]));
        tokens.extend(line(1, 9, &["Tiguan", "$1,500"]));

        let result = extract("test_doc", tokens, "pdfplumber");

        assert_eq!(result.rows.len(), 1);
        let row = &result.rows[0];
        assert_eq!(row.program_id.as_deref(), Some("V25URC08"));
        assert_eq!(row.published_date.as_deref(), Some("2025-08-01"));
        assert_eq!(row.program_start_date.as_deref(), Some("2025-08-01"));
        assert_eq!(row.program_end_date.as_deref(), Some("2025-12-31"));
    }

    #[test]
    fn combined_header_row_values_flow_into_rows() {
        let mut tokens = Vec::new();
        tokens.extend(line(
            1,
            1,
            &["Program", "ID", "Published", "Program", "Start", "Program", "End"],
        ));
        tokens.extend(line(
            1,
            2,
            &["V25URC08", "8/1/2025", "8/1/2025", "12/31/2025"],
        ));
        tokens.extend(line(1, 3, &["Tiguan", "$1,500"]));

        let result = extract("test_doc", tokens, "pdfplumber");

        assert_eq!(result.rows.len(), 1);
        let row = &result.rows[0];
        assert_eq!(row.program_id.as_deref(), Some("V25URC08"));
        assert_eq!(row.published_date.as_deref(), Some("2025-08-01"));
        assert_eq!(row.program_start_date.as_deref(), Some("2025-08-01"));
        assert_eq!(row.program_end_date.as_deref(), Some("2025-12-31"));
    }

    #[test]
    fn groups_partition_rows_by_program() {
        let mut tokens = Vec::new();
        tokens.extend(line(
            1,
            1,
            &["Program", "ID", "Program", "Name", "Updated", "Page(s)"],
        ));
        tokens.extend(line(
            1,
            2,
            &["V25URC08", "Retail", "Customer", "Bonus", "8/1/2025", "10"],
        ));
        tokens.extend(line(
            1,
            3,
            &["V25UAE08", "Dealer", "Bonus", "8/15/2025", "11"],
        ));
        tokens.extend(line(10, 1, &["Tiguan", "$1,500"]));
        tokens.extend(line(10, 2, &["Atlas", "$2,000"]));
        tokens.extend(line(11, 1, &["ID.4", "$3,000"]));

        let result = extract("test_doc", tokens, "pdfplumber");

        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.provenance.groups["V25URC08"].len(), 2);
        assert_eq!(result.provenance.groups["V25UAE08"].len(), 1);
        assert_eq!(
            result.provenance.group_order,
            vec!["V25URC08".to_owned(), "V25UAE08".to_owned()]
        );
        assert_eq!(result.provenance.rules_version, RULES_VERSION);
        assert_eq!(result.provenance.parser, "pdfplumber");
    }

    #[test]
    fn no_row_ever_has_bonus_as_model() {
        let mut tokens = Vec::new();
        tokens.extend(line(1, 1, &["MY25", "Bonus"]));
        tokens.extend(line(1, 2, &["Bonus", "$1,500"]));
        tokens.extend(line(1, 3, &["MY25", "Bonus", "8/1-8/21"]));
        tokens.extend(line(1, 4, &["$500", "-", "$1,500"]));

        let result = extract("test_doc", tokens, "pdfplumber");

        assert!(!result.rows.is_empty());
        assert!(
            result
                .rows
                .iter()
                .all(|r| !r.model.as_deref().unwrap_or("").eq_ignore_ascii_case("bonus"))
        );
    }
}
