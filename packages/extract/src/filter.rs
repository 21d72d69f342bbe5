//! Post-extraction filter, sort, and program grouping.
//!
//! Candidate rows from the walker are thinned (no amount → gone, program
//! never funded → gone), given a final "Bonus is never a model" sweep,
//! sorted on a composite key with the page as primary, and partitioned by
//! program id in first-appearance order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use rebate_docs_extract_models::{MODEL_ALL, RebateRow};

/// Reserved group key for rows carrying no program id.
pub const NO_PROGRAM_GROUP: &str = "_no_program_";

/// Runs the full post-extraction pass. Returns the kept rows plus the
/// program grouping index and the group display order.
#[must_use]
pub fn finalize(
    rows: Vec<RebateRow>,
) -> (Vec<RebateRow>, BTreeMap<String, Vec<usize>>, Vec<String>) {
    let candidate_count = rows.len();

    // Programs that ever had a dollar amount attached.
    let funded: BTreeSet<String> = rows
        .iter()
        .filter(|row| row.amount_dollars.is_some())
        .filter_map(|row| row.program_id.clone())
        .collect();

    let mut kept: Vec<RebateRow> = rows
        .into_iter()
        .filter(|row| {
            row.amount_dollars.is_some()
                && row
                    .program_id
                    .as_ref()
                    .is_none_or(|pid| funded.contains(pid))
        })
        .collect();

    for row in &mut kept {
        if row
            .model
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("bonus"))
        {
            row.model = Some(MODEL_ALL.to_owned());
        }
    }

    kept.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    log::debug!(
        "post-filter kept {} of {candidate_count} rows across {} funded programs",
        kept.len(),
        funded.len()
    );

    let (groups, group_order) = group_by_program(&kept);
    (kept, groups, group_order)
}

/// Partitions rows by program id. Group order is first appearance in the
/// given slice; rows with no program id land in [`NO_PROGRAM_GROUP`].
#[must_use]
pub fn group_by_program(rows: &[RebateRow]) -> (BTreeMap<String, Vec<usize>>, Vec<String>) {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut group_order: Vec<String> = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        let key = row
            .program_id
            .clone()
            .unwrap_or_else(|| NO_PROGRAM_GROUP.to_owned());
        if !groups.contains_key(&key) {
            group_order.push(key.clone());
        }
        groups.entry(key).or_default().push(idx);
    }
    (groups, group_order)
}

/// Composite ordering: page, program id, model year (newest first, absent
/// last), model, trim, amount.
fn sort_key(row: &RebateRow) -> (u32, &str, Reverse<u16>, &str, &str, u32) {
    (
        row.page,
        row.program_id.as_deref().unwrap_or(""),
        Reverse(row.model_year.unwrap_or(0)),
        row.model.as_deref().unwrap_or(""),
        row.trim.as_deref().unwrap_or(""),
        row.amount_dollars.unwrap_or(0),
    )
}
