//! Scalar parse helpers shared across the extraction rules.
//!
//! Every helper fails soft: malformed input yields `None`, never an error,
//! so one bad cell can't take down a multi-hundred-page document.

use chrono::NaiveDate;
use regex::Regex;

/// Parses a dollar amount like `$1,500` (or bare `1500`) into whole dollars.
///
/// Returns `None` for anything that isn't purely digits once `$`, commas,
/// and whitespace are stripped (so `$1.5k` does not parse).
#[must_use]
pub fn normalize_amount(text: &str) -> Option<u32> {
    let stripped: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    stripped.parse().ok()
}

/// Converts month/day/year strings to ISO `YYYY-MM-DD`, validating against
/// the real calendar (13/32/2024 yields `None`).
#[must_use]
pub fn iso_from_mdy(month: &str, day: &str, year: &str) -> Option<String> {
    let m: u32 = month.parse().ok()?;
    let d: u32 = day.parse().ok()?;
    let y: i32 = year.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(y, m, d)?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Finds the first `M/D/YYYY` or `M-D-YYYY` date in `text` and converts it
/// to ISO form.
#[must_use]
pub fn iso_date(text: &str) -> Option<String> {
    let re = Regex::new(r"\b([01]?\d)[/\-]([0-3]?\d)[/\-](\d{4})\b")
        .unwrap_or_else(|_| unreachable!());
    let caps = re.captures(text)?;
    iso_from_mdy(&caps[1], &caps[2], &caps[3])
}

/// Splits a multi-model phrase on conjunction/slash/comma separators:
/// `"Atlas & Atlas Cross Sport"` → `["Atlas", "Atlas Cross Sport"]`.
#[must_use]
pub fn split_models(raw: &str) -> Vec<String> {
    let re = Regex::new(r"\s+&\s+|\s*/\s*|,\s*").unwrap_or_else(|_| unreachable!());
    let parts: Vec<String> = re
        .split(raw)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect();
    if parts.is_empty() {
        vec![raw.trim().to_owned()]
    } else {
        parts
    }
}

/// Pulls a `(excludes ...)` parenthetical or a trailing `excludes ...`
/// phrase out of a line.
#[must_use]
pub fn parse_exclusions(text: &str) -> Option<String> {
    let paren = Regex::new(r"(?i)\((?:excludes|exclude)[^)]*\)").unwrap_or_else(|_| unreachable!());
    if let Some(m) = paren.find(text) {
        return Some(m.as_str().to_owned());
    }
    let trailing = Regex::new(r"(?i)\b(excludes\s+.+)$").unwrap_or_else(|_| unreachable!());
    trailing
        .captures(text)
        .map(|caps| caps[1].trim().to_owned())
}
