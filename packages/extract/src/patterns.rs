//! Pattern library: the regexes and lexicons every extraction rule reads.
//!
//! All classifier regexes are fixed strings compiled once into a
//! [`PatternSet`]; the lexicons are static tables with keyword-matching
//! lookups. Changing what the walker recognizes means changing this module,
//! nothing else.

use regex::Regex;

/// Lowercase model-name variants → canonical display form.
///
/// Ordered longest-key-first so that "atlas cross sport" wins over "atlas"
/// when both occur in a line. Membership is substring-based.
const MODEL_NORMALIZER: &[(&str, &str)] = &[
    ("atlas peak edition", "Atlas Peak Edition"),
    ("atlas cross sport", "Atlas Cross Sport"),
    ("jetta gli", "Jetta GLI"),
    ("golf gti", "Golf GTI"),
    ("id. buzz", "ID. Buzz"),
    ("id buzz", "ID. Buzz"),
    ("tiguan", "Tiguan"),
    ("jetta", "Jetta"),
    ("atlas", "Atlas"),
    ("id.4", "ID.4"),
    ("id 4", "ID.4"),
    ("taos", "Taos"),
];

/// Canonical label keys → synonyms seen in headings and tables.
///
/// The generic "bonus" catch-all must stay last; detection walks the table
/// in order and takes the first hit.
const LABEL_LEXICON: &[(&str, &[&str])] = &[
    (
        "retail customer bonus",
        &[
            "retail customer bonus",
            "customer bonus",
            "retail customer bonus – ev",
            "retail customer bonus - ev",
        ],
    ),
    (
        "dealer bonus",
        &[
            "dealer bonus",
            "lease dealer bonus",
            "dealer bonus - ev",
            "lease dealer bonus - ev",
        ],
    ),
    (
        "apr customer bonus",
        &[
            "apr customer bonus",
            "apr customer bonus – ev",
            "apr customer bonus - ev",
        ],
    ),
    (
        "loyalty bonus",
        &[
            "loyalty bonus",
            "loyalty code bonus",
            "tiguan loyalty code bonus",
        ],
    ),
    ("final payout", &["final payout", "final payout bonus", "final pay"]),
    (
        "target achievement bonus",
        &[
            "target achievement bonus",
            "target achievement",
            "tab",
            "payment per unit",
        ],
    ),
    (
        "vfi program",
        &[
            "vfi program",
            "volkswagen fleet incentive",
            "fleet incentive",
            "dealer cash",
        ],
    ),
    ("bonus", &["bonus", "rebate", "customer rebate"]),
];

/// Lowercase TOC/heading spellings → one canonical casing for
/// `rebate_type`. En/em dashes are folded to `-` before lookup.
const REBATE_NAME_MAP: &[(&str, &str)] = &[
    ("dealer bonus - ev", "Dealer Bonus - EV"),
    ("dealer bonus", "Dealer Bonus"),
    ("retail customer bonus - ev", "Retail Customer Bonus - EV"),
    ("retail customer bonus", "Retail Customer Bonus"),
    ("apr customer bonus - ev", "APR Customer Bonus - EV"),
    ("apr customer bonus - labor day", "APR Customer Bonus - Labor Day"),
    (
        "lease customer bonus - labor day",
        "Lease Customer Bonus - Labor Day",
    ),
    ("lease dealer bonus - ev", "Lease Dealer Bonus"),
    ("vfi program", "VFI Program"),
    ("final pay", "Final Pay"),
    ("sales elite program", "Sales Elite Program"),
    ("tiguan loyalty code bonus", "Tiguan Loyalty Code Bonus"),
    (
        "volkswagen private incentive code bonus",
        "Volkswagen Private Incentive Code Bonus",
    ),
];

/// Every regex the line walker and TOC indexer need, compiled once.
#[derive(Debug)]
pub struct PatternSet {
    /// A standalone money token, anchored (`$3,500`).
    pub money_token: Regex,
    /// Every `$` amount on a line (`$\s?\d[\d,]*`), for scanning.
    pub amount: Regex,
    /// `M/D/YYYY` or `M-D-YYYY` with capture groups (month, day, year).
    pub date: Regex,
    /// Fixed-format program code (`V25UAE08`).
    pub program_id: Regex,
    /// Section headings that name a rebate program family.
    pub rebate_heading: Regex,
    /// `$X - $Y` money ranges.
    pub money_range: Regex,
    /// Model/year table header: `MY24 ID.4`, `MY25 ID. Buzz`.
    pub model_header: Regex,
    /// Standalone year header: `MY24`.
    pub year_header: Regex,
    /// Year plus structural noise: `MY25 Bonus`, `MY25 Bonus 8/1-8/21`.
    pub year_noise_header: Regex,
    /// A lone `Bonus` line.
    pub bonus_solo: Regex,
    /// `Bonus` followed by a date range.
    pub bonus_with_dates: Regex,
    /// A bare `8/1 - 8/21` date-range label.
    pub date_range_label: Regex,
    /// Combined header row: `Program ID Published Program Start Program End`.
    pub inline_header: Regex,
    /// "Applies to every vehicle" phrases.
    pub all_vehicles: Regex,
    /// Inline model-year mention (`MY25` or a bare `2025`-style year).
    pub inline_year: Regex,
    /// TOC column-header line.
    pub toc_header: Regex,
    /// One TOC row: code, name, date, page spec.
    pub toc_row: Regex,
}

impl PatternSet {
    /// Compiles the full pattern set. The patterns are fixed strings, so
    /// compilation cannot fail at runtime.
    #[must_use]
    pub fn new() -> Self {
        Self {
            money_token: compile(r"^\$\s*\d{1,3}(?:,\d{3})*(?:\.\d{2})?$"),
            amount: compile(r"\$\s?\d[\d,]*"),
            date: compile(r"\b([01]?\d)[/\-]([0-3]?\d)[/\-](\d{4})\b"),
            program_id: compile(r"\bV\d{2}[A-Z]{3}\d{2}\b"),
            rebate_heading: compile(
                r"(?i)\b(Dealer Bonus(?:\s-\sEV)?|Retail Customer Bonus(?:\s-\sEV)?|APR Customer Bonus(?:\s-\sEV| - Labor Day)?|Lease Dealer Bonus(?:\s-\sEV)?|Lease Customer Bonus(?:\s - Labor Day)?|Loyalty Bonus|Tiguan Loyalty Code Bonus|Volkswagen Private Incentive Code Bonus|Sales Elite Program|VFI Program|Final Pay)\b",
            ),
            money_range: compile(r"\$(\d[\d,]*)\s*[-–]\s*\$(\d[\d,]*)"),
            model_header: compile(
                r"(?i)^\s*MY\s*(\d{2}|\d{4})\s+([A-Za-z][A-Za-z0-9.\s&-]*?)\s*(?:\([^)]*\))?\s*$",
            ),
            year_header: compile(r"(?i)^\s*MY\s*(\d{2}|\d{4})\s*$"),
            year_noise_header: compile(
                r"(?i)^\s*MY\s*(\d{2}|\d{4})\s+Bonus(?:\s+\d{1,2}\s*/\s*\d{1,2}\s*[-–]\s*\d{1,2}\s*/\s*\d{1,2})?\s*$",
            ),
            bonus_solo: compile(r"(?i)^\s*Bonus\s*$"),
            bonus_with_dates: compile(
                r"(?i)^\s*Bonus\s*(?:\d{1,2}\s*/\s*\d{1,2})?\s*[-–]\s*(?:\d{1,2}\s*/\s*\d{1,2})?\s*$",
            ),
            date_range_label: compile(
                r"^\s*\d{1,2}\s*/\s*\d{1,2}\s*[-–]\s*\d{1,2}\s*/\s*\d{1,2}\s*$",
            ),
            inline_header: compile(r"(?i)^\s*Program ID\s+Published\s+Program Start\s+Program End\b"),
            all_vehicles: compile(r"(?i)\bNew,\s*unused\s+(?:VW|Volkswagen)\s+models\b"),
            inline_year: compile(r"(?i)\bMY\s?(\d{2})\b|\b(20(?:2[3-9]|3[0-9]))\b"),
            toc_header: compile(r"(?i)\bProgram ID\s+Program Name\s+Updated\s+Page\(s\)"),
            toc_row: compile(
                r"\b(V\d{2}[A-Z]{3}\d{2})\b\s+(.*?)\s+(\d{1,2}[/\-]\d{1,2}[/\-]\d{4})\s+([\d,\-]+)\s*$",
            ),
        }
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| unreachable!())
}

/// Finds the first known model name contained in `lower` (a lowercased
/// line), longest key first. Returns the matched key and its canonical
/// display form. Never matches "Bonus" — it isn't in the table.
#[must_use]
pub fn match_model(lower: &str) -> Option<(&'static str, &'static str)> {
    for &(key, canonical) in MODEL_NORMALIZER {
        if lower.contains(key) {
            return Some((key, canonical));
        }
    }
    None
}

/// Finds every non-overlapping model mention in `lower`, longest keys
/// first, returned as byte spans sorted by start position.
#[must_use]
pub fn model_spans(lower: &str) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for (key, _) in MODEL_NORMALIZER {
        let mut from = 0;
        while let Some(found) = lower[from..].find(key) {
            let start = from + found;
            let end = start + key.len();
            if !spans.iter().any(|&(s, e)| start < e && s < end) {
                spans.push((start, end));
            }
            from = end;
        }
    }
    spans.sort_unstable();
    spans
}

/// Normalizes a raw model string to its canonical display form, falling
/// back to the raw text when no table entry matches.
#[must_use]
pub fn normalize_model(raw: &str) -> String {
    let lower = raw.to_lowercase();
    match_model(&lower).map_or_else(|| raw.to_owned(), |(_, canonical)| canonical.to_owned())
}

/// Harmonizes TOC display names and in-page heading spellings to one
/// canonical casing. Unknown names pass through unchanged.
#[must_use]
pub fn normalize_rebate_name(name: &str) -> String {
    let folded = name.to_lowercase().replace(['–', '—'], "-");
    for &(key, canonical) in REBATE_NAME_MAP {
        if key == folded {
            return canonical.to_owned();
        }
    }
    name.to_owned()
}

/// Returns the canonical label key when the text contains a known label or
/// one of its synonyms.
#[must_use]
pub fn label_key(text: &str) -> Option<&'static str> {
    let lower = text.trim().to_lowercase();
    for &(key, synonyms) in LABEL_LEXICON {
        if lower.contains(key) || synonyms.iter().any(|&s| lower.contains(s)) {
            return Some(key);
        }
    }
    None
}
