#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data shapes for the rebate bulletin extraction pipeline.
//!
//! A PDF parser (outside this workspace) produces positioned [`Token`]s;
//! the extraction crate walks them and emits [`RebateRow`]s wrapped in a
//! [`DocumentResult`]. Everything here serializes with serde so results
//! survive a round trip through JSON unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Bounding box in page coordinates: `(left, top, right, bottom)`.
pub type BBox = (f64, f64, f64, f64);

/// Sentinel model value meaning "applies to every vehicle".
///
/// Distinct from an absent model: `all` is an affirmative claim made by
/// the document ("New, unused Volkswagen models"), not a parsing gap.
pub const MODEL_ALL: &str = "all";

/// Classification tag assigned to a token during the pre-pass.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TokenKind {
    /// A standalone dollar amount like `$3,500`.
    Money,
    /// A known section label or one of its synonyms.
    Label,
}

/// One positioned word-like unit of bulletin text.
///
/// Tokens sharing the same `(page, line_id)` pair are reconstructed into a
/// single line of text in left-to-right order. The `kind` tag is set once
/// during the classification pre-pass and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// The string as it appeared in the document.
    pub text: String,
    /// Bounding box in page coordinates.
    pub bbox: BBox,
    /// 1-based page number.
    pub page: u32,
    /// Line-grouping key, stable within a page.
    pub line_id: u32,
    /// Optional coarser block-grouping key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<u32>,
    /// Classification tag from the pre-pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TokenKind>,
}

/// One row of the document's front-matter table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocEntry {
    /// Fixed-format program code (e.g., `V25URC08`).
    pub program_id: String,
    /// Display name of the program as printed in the TOC.
    pub program_name: String,
    /// ISO publish date, absent when the TOC cell failed to parse.
    pub published: Option<String>,
    /// Pages the program covers, expanded from range/list notation,
    /// deduplicated, in order of first appearance.
    pub pages: Vec<u32>,
}

/// One extracted rebate fact.
///
/// Dates are ISO `YYYY-MM-DD` text; `model` may be the [`MODEL_ALL`]
/// sentinel. `confidence` is in `[0, 1]` and reflects how directly the row
/// was inferred versus guessed from a fallback rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebateRow {
    /// Program family (e.g., "Retail Customer Bonus").
    pub rebate_type: Option<String>,
    /// Program code (e.g., `V25UAE08`).
    pub program_id: Option<String>,
    /// Bulletin publish date.
    pub published_date: Option<String>,
    /// First day the program is in effect.
    pub program_start_date: Option<String>,
    /// Last day the program is in effect.
    pub program_end_date: Option<String>,
    /// Model year (e.g., 2025).
    pub model_year: Option<u16>,
    /// Vehicle model, or [`MODEL_ALL`].
    pub model: Option<String>,
    /// Trim level within the model (e.g., "SE").
    pub trim: Option<String>,
    /// Free-text exclusion phrase, when the document stated one.
    pub exclusions: Option<String>,
    /// Rebate amount in whole dollars.
    pub amount_dollars: Option<u32>,
    /// Always `USD` for these bulletins.
    pub currency: String,
    /// Page the row was extracted from.
    pub page: u32,
    /// How directly the row was inferred, in `[0, 1]`.
    pub confidence: f32,
}

/// Extraction metadata attached to every [`DocumentResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Name of the tokenizer that produced the input tokens.
    pub parser: String,
    /// Version tag of the extraction rule set.
    pub rules_version: String,
    /// Program id → indices into the row list.
    pub groups: BTreeMap<String, Vec<usize>>,
    /// Group keys in order of first appearance in the sorted row list.
    pub group_order: Vec<String>,
}

/// Final output for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResult {
    /// Caller-supplied document identifier (usually the file name).
    pub doc_id: String,
    /// Extracted rows, filtered and sorted.
    pub rows: Vec<RebateRow>,
    /// Parser/rules metadata and the program grouping index.
    pub provenance: Provenance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_through_json() {
        let token = Token {
            text: "$1,500".to_string(),
            bbox: (30.0, 35.0, 80.0, 45.0),
            page: 10,
            line_id: 3,
            block_id: None,
            kind: Some(TokenKind::Money),
        };
        let json = serde_json::to_string(&token).unwrap();
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }

    #[test]
    fn token_kind_serializes_snake_case() {
        assert_eq!(TokenKind::Money.to_string(), "money");
        assert_eq!(
            serde_json::to_string(&TokenKind::Label).unwrap(),
            "\"label\""
        );
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let token = Token {
            text: "SE".to_string(),
            bbox: (0.0, 35.0, 20.0, 45.0),
            page: 10,
            line_id: 3,
            block_id: None,
            kind: None,
        };
        let json = serde_json::to_string(&token).unwrap();
        assert!(!json.contains("blockId"));
        assert!(!json.contains("kind"));
    }
}
