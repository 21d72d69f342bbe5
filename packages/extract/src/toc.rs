//! Table-of-contents indexer.
//!
//! Scans reconstructed lines once per document for the front-matter table
//! (`Program ID  Program Name  Updated  Page(s)`) and builds the index the
//! page-start preload consults. Once the column header is seen, scanning
//! continues to the end of the document; banner lines and other noise
//! between TOC rows are skipped, not terminal.

use std::collections::BTreeMap;

use rebate_docs_extract_models::TocEntry;

use crate::lines::LineKey;
use crate::parsing::iso_date;
use crate::patterns::PatternSet;

/// Builds the TOC index from lines in document order.
#[must_use]
pub fn build_index(lines: &BTreeMap<LineKey, String>, patterns: &PatternSet) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    let mut in_toc = false;

    for text in lines.values() {
        let text = text.trim();
        if patterns.toc_header.is_match(text) {
            in_toc = true;
            continue;
        }
        if !in_toc {
            continue;
        }
        if let Some(caps) = patterns.toc_row.captures(text) {
            entries.push(TocEntry {
                program_id: caps[1].to_owned(),
                program_name: caps[2].trim().to_owned(),
                published: iso_date(&caps[3]),
                pages: expand_pages(&caps[4]),
            });
        }
    }

    log::debug!("TOC index built with {} entries", entries.len());
    entries
}

/// Picks the TOC entry covering `page`, preferring one whose program name
/// textually overlaps the rebate-type hint when one is active.
#[must_use]
pub fn choose_for_page<'a>(
    toc: &'a [TocEntry],
    page: u32,
    hint: Option<&str>,
) -> Option<&'a TocEntry> {
    let candidates: Vec<&TocEntry> = toc.iter().filter(|e| e.pages.contains(&page)).collect();
    if candidates.is_empty() {
        return None;
    }

    if let Some(hint) = hint {
        let hint_lower = hint.to_lowercase();
        if let Some(tagged) = candidates.iter().copied().find(|e| {
            let name_lower = e.program_name.to_lowercase();
            hint_lower.contains(&name_lower) || name_lower.contains(&hint_lower)
        }) {
            return Some(tagged);
        }
    }
    candidates.first().copied()
}

/// Expands a page spec like `10-11` or `3,5-7` into individual pages,
/// deduplicated, in order of first appearance. Malformed chunks are
/// skipped without failing the row.
fn expand_pages(spec: &str) -> Vec<u32> {
    let mut pages = Vec::new();
    for chunk in spec.split(',') {
        let chunk = chunk.trim();
        if let Some((a, b)) = chunk.split_once('-') {
            if let (Ok(a), Ok(b)) = (a.trim().parse::<u32>(), b.trim().parse::<u32>()) {
                pages.extend(a..=b);
            }
        } else if let Ok(page) = chunk.parse::<u32>() {
            pages.push(page);
        }
    }
    let mut seen = Vec::with_capacity(pages.len());
    for page in pages {
        if !seen.contains(&page) {
            seen.push(page);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_from(rows: &[&str]) -> BTreeMap<LineKey, String> {
        rows.iter()
            .enumerate()
            .map(|(i, text)| ((1, u32::try_from(i).unwrap() + 1), (*text).to_string()))
            .collect()
    }

    #[test]
    fn parses_toc_entries() {
        let lines = lines_from(&[
            "Program ID Program Name Updated Page(s)",
            "V25URC08 Retail Customer Bonus 8/1/2025 10-11",
            "V25UAE08 Dealer Bonus - EV 8/15/2025 12-15",
        ]);
        let toc = build_index(&lines, &PatternSet::new());

        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].program_id, "V25URC08");
        assert_eq!(toc[0].program_name, "Retail Customer Bonus");
        assert_eq!(toc[0].published.as_deref(), Some("2025-08-01"));
        assert_eq!(toc[0].pages, vec![10, 11]);
        assert_eq!(toc[1].pages, vec![12, 13, 14, 15]);
    }

    #[test]
    fn parses_single_page_entry() {
        let lines = lines_from(&[
            "Program ID Program Name Updated Page(s)",
            "V25URC08 Retail Customer Bonus 8/1/2025 10",
        ]);
        let toc = build_index(&lines, &PatternSet::new());
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].pages, vec![10]);
    }

    #[test]
    fn no_header_means_no_entries() {
        let lines = lines_from(&["Some random text", "V25URC08 Bonus 8/1/2025 10"]);
        assert!(build_index(&lines, &PatternSet::new()).is_empty());
    }

    #[test]
    fn banner_between_rows_does_not_end_block() {
        let lines = lines_from(&[
            "Program ID Program Name Updated Page(s)",
            "V25URC08 Retail Customer Bonus 8/1/2025 10-11",
            "Volkswagen New Vehicle Program Bulletins",
            "V25UAE08 Dealer Bonus - EV 8/15/2025 12",
        ]);
        let toc = build_index(&lines, &PatternSet::new());
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[1].program_id, "V25UAE08");
    }

    #[test]
    fn comma_lists_expand_each_chunk() {
        assert_eq!(expand_pages("3,5-7"), vec![3, 5, 6, 7]);
        assert_eq!(expand_pages("10, 12"), vec![10, 12]);
    }

    #[test]
    fn malformed_chunks_are_skipped() {
        assert_eq!(expand_pages("4,x,6-"), vec![4]);
        assert_eq!(expand_pages("9-7"), Vec::<u32>::new());
    }

    #[test]
    fn duplicate_pages_are_removed() {
        assert_eq!(expand_pages("5,5-6"), vec![5, 6]);
    }

    #[test]
    fn chooses_entry_covering_page() {
        let toc = vec![
            TocEntry {
                program_id: "V25URC08".to_string(),
                program_name: "Retail Customer Bonus".to_string(),
                published: None,
                pages: vec![10, 11],
            },
            TocEntry {
                program_id: "V25UAE08".to_string(),
                program_name: "Dealer Bonus".to_string(),
                published: None,
                pages: vec![12, 13],
            },
        ];
        assert_eq!(
            choose_for_page(&toc, 11, None).unwrap().program_id,
            "V25URC08"
        );
        assert!(choose_for_page(&toc, 15, None).is_none());
    }

    #[test]
    fn hint_prefers_matching_program_name() {
        let toc = vec![
            TocEntry {
                program_id: "V25URC08".to_string(),
                program_name: "Retail Customer Bonus".to_string(),
                published: None,
                pages: vec![10, 11],
            },
            TocEntry {
                program_id: "V25UAE08".to_string(),
                program_name: "Dealer Bonus".to_string(),
                published: None,
                pages: vec![10, 11],
            },
        ];
        assert_eq!(
            choose_for_page(&toc, 10, Some("dealer bonus"))
                .unwrap()
                .program_id,
            "V25UAE08"
        );
        assert_eq!(
            choose_for_page(&toc, 10, None).unwrap().program_id,
            "V25URC08"
        );
    }
}
