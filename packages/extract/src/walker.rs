//! Context-tracking line walker — the extraction core.
//!
//! Walks reconstructed lines in document order, maintaining the "currently
//! active" program/date/model state, and decides per line which rule
//! applies: start a new context, consume a value for a pending label, or
//! emit rows. The classifiers run in a fixed precedence order (later rules
//! are deliberately more permissive catch-alls) and the first match
//! consumes the line. Context is captured by value at emission time, so a
//! later context update never rewrites an already-emitted row.
//!
//! Rule order:
//! 1. page-start TOC preload (not a consumer; runs before the chain)
//! 2. structural noise (`Bonus`, `Bonus 8/1-8/21`, bare date ranges)
//! 3. rebate section headings
//! 4. combined `Program ID Published Program Start Program End` header row
//! 5. individual header labels with the value on the next line
//! 6. model/year table headers (`MY25 Tiguan`)
//! 7. standalone year headers (`MY24`)
//! 8. year + noise headers (`MY25 Bonus 8/1-8/21`)
//! 9. money ranges (`$500 - $1,500`)
//! 10. any remaining line with a `$` amount

use std::collections::BTreeMap;

use rebate_docs_extract_models::{MODEL_ALL, RebateRow, TocEntry};

use crate::lines::LineKey;
use crate::parsing::{iso_from_mdy, normalize_amount, parse_exclusions, split_models};
use crate::patterns::{self, PatternSet};
use crate::toc;

const CURRENCY: &str = "USD";

/// The mutable "currently active" state during a walk. One instance per
/// document, threaded through the walker — never shared.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractionContext {
    /// Active program family name.
    pub rebate_type: Option<String>,
    /// Active program code.
    pub program_id: Option<String>,
    /// Active publish date (ISO).
    pub published_date: Option<String>,
    /// Active program start date (ISO).
    pub program_start_date: Option<String>,
    /// Active program end date (ISO).
    pub program_end_date: Option<String>,
    /// Year from the active model/year table header.
    pub model_year: Option<u16>,
    /// Model from the active model/year table header.
    pub model: Option<String>,
    /// Exclusion phrase carried from the active table header.
    pub header_exclusions: Option<String>,
}

impl ExtractionContext {
    /// Drops the model/year table context and the header-level exclusion
    /// text. Runs at page starts, section headings, and new table headers.
    fn reset_table_context(&mut self) {
        self.model_year = None;
        self.model = None;
        self.header_exclusions = None;
    }
}

/// Fields of a row that vary per emission; everything else is inherited
/// from the context at the moment of emission.
struct Draft {
    page: u32,
    model_year: Option<u16>,
    model: Option<String>,
    trim: Option<String>,
    exclusions: Option<String>,
    amount: u32,
    confidence: f32,
}

/// Walks lines in document order and emits candidate rows.
pub struct LineWalker<'a> {
    patterns: &'a PatternSet,
    toc: &'a [TocEntry],
    lines: &'a BTreeMap<LineKey, String>,
    keys: Vec<LineKey>,
    ctx: ExtractionContext,
    rows: Vec<RebateRow>,
}

impl<'a> LineWalker<'a> {
    #[must_use]
    pub fn new(
        patterns: &'a PatternSet,
        toc: &'a [TocEntry],
        lines: &'a BTreeMap<LineKey, String>,
    ) -> Self {
        Self {
            patterns,
            toc,
            lines,
            keys: lines.keys().copied().collect(),
            ctx: ExtractionContext::default(),
            rows: Vec::new(),
        }
    }

    /// Runs the walk and returns the emitted candidate rows, unfiltered.
    #[must_use]
    pub fn run(mut self) -> Vec<RebateRow> {
        let lines = self.lines;
        for idx in 0..self.keys.len() {
            let key = self.keys[idx];
            let (page, _) = key;
            if idx == 0 || self.keys[idx - 1].0 != page {
                self.preload_page(page);
            }

            let text = lines[&key].trim();
            if text.is_empty() || self.is_noise(text) {
                continue;
            }
            if self.try_section_heading(page, text) {
                continue;
            }
            if self.try_inline_header(idx, text) {
                continue;
            }
            if self.try_header_label(idx, text) {
                continue;
            }
            if self.try_model_header(text) {
                continue;
            }
            if self.try_year_header(text) {
                continue;
            }
            if self.try_year_noise_header(text) {
                continue;
            }
            if self.try_money_range(idx, page, text) {
                continue;
            }
            self.try_amount_line(page, text);
        }
        self.rows
    }

    /// Rule 1: on the first line of a page, preload program context from
    /// the TOC entry covering the page (the active rebate type serves as a
    /// disambiguation hint) and reset the table context.
    fn preload_page(&mut self, page: u32) {
        if let Some(hit) = toc::choose_for_page(self.toc, page, self.ctx.rebate_type.as_deref()) {
            self.ctx.program_id = Some(hit.program_id.clone());
            if hit.published.is_some() {
                self.ctx.published_date = hit.published.clone();
            }
            self.ctx.rebate_type = Some(patterns::normalize_rebate_name(&hit.program_name));
            log::debug!("page {page}: preloaded program {} from TOC", hit.program_id);
        }
        self.ctx.reset_table_context();
    }

    /// Rule 2: structural noise that must not touch context.
    fn is_noise(&self, text: &str) -> bool {
        self.patterns.bonus_solo.is_match(text)
            || self.patterns.bonus_with_dates.is_match(text)
            || self.patterns.date_range_label.is_match(text)
    }

    /// Rule 3: a rebate section heading sets the rebate type, re-resolves
    /// the TOC entry with the new heading as hint, and resets the table
    /// context.
    fn try_section_heading(&mut self, page: u32, text: &str) -> bool {
        let Some(found) = self.patterns.rebate_heading.find(text) else {
            return false;
        };
        self.ctx.rebate_type = Some(patterns::normalize_rebate_name(found.as_str().trim()));
        if let Some(hit) = toc::choose_for_page(self.toc, page, self.ctx.rebate_type.as_deref()) {
            self.ctx.program_id = Some(hit.program_id.clone());
            if hit.published.is_some() {
                self.ctx.published_date = hit.published.clone();
            }
        }
        self.ctx.reset_table_context();
        true
    }

    /// Rule 4: combined header row; the next line carries an optional
    /// program code and up to three dates in published/start/end order.
    fn try_inline_header(&mut self, idx: usize, text: &str) -> bool {
        if !self.patterns.inline_header.is_match(text) {
            return false;
        }
        if let Some(next) = self.next_line_on_page(idx) {
            if let Some(pid) = self.patterns.program_id.find(next) {
                self.ctx.program_id = Some(pid.as_str().to_owned());
            }
            let mut dates = self
                .patterns
                .date
                .captures_iter(next)
                .filter_map(|caps| iso_from_mdy(&caps[1], &caps[2], &caps[3]));
            if let Some(date) = dates.next() {
                self.ctx.published_date = Some(date);
            }
            if let Some(date) = dates.next() {
                self.ctx.program_start_date = Some(date);
            }
            if let Some(date) = dates.next() {
                self.ctx.program_end_date = Some(date);
            }
        }
        true
    }

    /// Rule 5: a lone header label whose value sits on the next line.
    /// Unparseable values leave the prior context value untouched.
    fn try_header_label(&mut self, idx: usize, text: &str) -> bool {
        let label = text.to_lowercase();
        if !matches!(
            label.as_str(),
            "program id" | "published" | "program start" | "program end"
        ) {
            return false;
        }
        let Some(next) = self.next_line_on_page(idx) else {
            return true;
        };
        match label.as_str() {
            "program id" => {
                if let Some(pid) = self.patterns.program_id.find(next) {
                    self.ctx.program_id = Some(pid.as_str().to_owned());
                }
            }
            "published" => {
                if let Some(date) = self.iso_first(next) {
                    self.ctx.published_date = Some(date);
                }
            }
            "program start" => {
                if let Some(date) = self.iso_first(next) {
                    self.ctx.program_start_date = Some(date);
                }
            }
            _ => {
                if let Some(date) = self.iso_first(next) {
                    self.ctx.program_end_date = Some(date);
                }
            }
        }
        true
    }

    /// Rule 6: a model/year table header like `MY25 Tiguan`. Sets the
    /// active model and year, and captures any exclusion phrase on the
    /// header line itself. `Bonus` is never accepted as a model: a bare
    /// `MY25 Bonus` degrades to a year-only header.
    fn try_model_header(&mut self, text: &str) -> bool {
        let Some(caps) = self.patterns.model_header.captures(text) else {
            return false;
        };
        let year = parse_model_year(&caps[1]);
        let raw = caps[2].trim();
        let lower = raw.to_lowercase();
        if lower == "bonus" {
            self.ctx.reset_table_context();
            self.ctx.model_year = year;
            return true;
        }
        if lower.starts_with("bonus ") {
            // "MY25 Bonus <something>" — not a model header; let the
            // remaining rules look at the line.
            return false;
        }
        self.ctx.reset_table_context();
        self.ctx.model_year = year;
        self.ctx.model = Some(patterns::normalize_model(raw));
        self.ctx.header_exclusions = parse_exclusions(text);
        log::debug!(
            "table header: year={:?} model={:?}",
            self.ctx.model_year,
            self.ctx.model
        );
        true
    }

    /// Rule 7: a standalone `MY24` header sets only the year — rows below
    /// supply their own model while inheriting it. Clears any standing
    /// header exclusion.
    fn try_year_header(&mut self, text: &str) -> bool {
        let Some(caps) = self.patterns.year_header.captures(text) else {
            return false;
        };
        self.ctx.model_year = parse_model_year(&caps[1]);
        self.ctx.header_exclusions = None;
        true
    }

    /// Rule 8: `MY25 Bonus` (optionally with a trailing date range) sets
    /// the year and clears the model and exclusion context.
    fn try_year_noise_header(&mut self, text: &str) -> bool {
        let Some(caps) = self.patterns.year_noise_header.captures(text) else {
            return false;
        };
        let year = parse_model_year(&caps[1]);
        self.ctx.reset_table_context();
        self.ctx.model_year = year;
        true
    }

    /// Rule 9: a `$X - $Y` range emits one row per distinct endpoint.
    /// Exclusions resolve inline first, then from a two-line window on the
    /// same page, then from the standing header exclusion.
    fn try_money_range(&mut self, idx: usize, page: u32, text: &str) -> bool {
        let Some(caps) = self.patterns.money_range.captures(text) else {
            return false;
        };
        let all_vehicles = self.patterns.all_vehicles.is_match(text);
        let low = normalize_amount(&caps[1]);
        let high = normalize_amount(&caps[2]);
        let exclusions = parse_exclusions(text)
            .or_else(|| self.window_exclusions(idx, page))
            .or_else(|| self.ctx.header_exclusions.clone());
        let model = if all_vehicles {
            MODEL_ALL.to_owned()
        } else {
            self.ctx.model.clone().unwrap_or_else(|| MODEL_ALL.to_owned())
        };

        let mut amounts = Vec::new();
        if let Some(low) = low {
            amounts.push(low);
        }
        if let Some(high) = high
            && Some(high) != low
        {
            amounts.push(high);
        }
        for amount in amounts {
            self.emit(Draft {
                page,
                model_year: self.ctx.model_year,
                model: Some(model.clone()),
                trim: None,
                exclusions: exclusions.clone(),
                amount,
                confidence: 0.7,
            });
        }
        true
    }

    /// Rule 10: any remaining line with a `$` amount. With an active table
    /// header the text left of the first `$` is the trim label; otherwise
    /// an inline model mention is detected, split into targets, and one
    /// row is emitted per (amount × target).
    fn try_amount_line(&mut self, page: u32, text: &str) -> bool {
        if !text.contains('$') {
            return false;
        }
        let all_vehicles = self.patterns.all_vehicles.is_match(text);

        if self.ctx.model.is_some() && !all_vehicles {
            let (trim, amounts) = self.parse_trim_and_amounts(text);
            if !amounts.is_empty() {
                let exclusions = parse_exclusions(text);
                let trim = trim.map(|t| {
                    if t.to_lowercase().starts_with("all trims") {
                        "All Trims".to_owned()
                    } else {
                        t
                    }
                });
                let model = self.ctx.model.clone();
                for amount in amounts {
                    self.emit(Draft {
                        page,
                        model_year: self.ctx.model_year,
                        model: model.clone(),
                        trim: trim.clone(),
                        exclusions: exclusions.clone(),
                        amount,
                        confidence: 0.9,
                    });
                }
                return true;
            }
        }

        let amounts: Vec<u32> = self
            .patterns
            .amount
            .find_iter(text)
            .filter_map(|m| normalize_amount(m.as_str()))
            .collect();
        if amounts.is_empty() {
            // Had a '$' but nothing parseable; consumed, zero rows.
            return true;
        }

        let (inline_year, inline_model, inline_trim) = self.detect_inline_model(text);
        let exclusions = parse_exclusions(text);

        let (targets, confidence) = if all_vehicles {
            (vec![MODEL_ALL.to_owned()], 0.9)
        } else if let Some(model) = inline_model {
            let targets = split_models(&model)
                .iter()
                .map(|part| patterns::normalize_model(part))
                .collect();
            (targets, 0.9)
        } else if let Some(model) = self.ctx.model.clone() {
            (vec![model], 0.9)
        } else {
            // Guessed from the last-resort fallback.
            (vec![MODEL_ALL.to_owned()], 0.6)
        };

        let model_year = inline_year.or(self.ctx.model_year);
        for &amount in &amounts {
            for target in &targets {
                self.emit(Draft {
                    page,
                    model_year,
                    model: Some(target.clone()),
                    trim: inline_trim.clone(),
                    exclusions: exclusions.clone(),
                    amount,
                    confidence,
                });
            }
        }
        true
    }

    /// The next line in document order, only if it sits on the same page.
    fn next_line_on_page(&self, idx: usize) -> Option<&'a str> {
        let lines = self.lines;
        let page = self.keys[idx].0;
        let key = *self.keys.get(idx + 1)?;
        (key.0 == page).then(|| lines[&key].trim())
    }

    fn iso_first(&self, text: &str) -> Option<String> {
        let caps = self.patterns.date.captures(text)?;
        iso_from_mdy(&caps[1], &caps[2], &caps[3])
    }

    /// Searches up to two lines above/below on the same page for an
    /// exclusion phrase. Nearer lines win; at equal distance the previous
    /// line beats the next one.
    fn window_exclusions(&self, idx: usize, page: u32) -> Option<String> {
        for offset in [-1_isize, 1, -2, 2] {
            let Some(&key) = idx
                .checked_add_signed(offset)
                .and_then(|i| self.keys.get(i))
            else {
                continue;
            };
            if key.0 != page {
                continue;
            }
            if let Some(found) = parse_exclusions(self.lines[&key].trim()) {
                return Some(found);
            }
        }
        None
    }

    /// Table-row split: trim label is the text left of the first `$`
    /// (discarded when it is itself noise), amounts are every `$` value on
    /// the line.
    fn parse_trim_and_amounts(&self, text: &str) -> (Option<String>, Vec<u32>) {
        let left_raw = text.split('$').next().unwrap_or("");
        let left = if self.is_noise(left_raw.trim()) {
            ""
        } else {
            left_raw
        };
        let left = left.trim_matches(|c: char| matches!(c, '•' | '-' | '–' | '—' | ' ' | '\t'));
        let trim = (!left.is_empty()).then(|| left.to_owned());
        let amounts = self
            .patterns
            .amount
            .find_iter(text)
            .filter_map(|m| normalize_amount(m.as_str()))
            .collect();
        (trim, amounts)
    }

    /// Pulls an inline model year, model phrase, and optional trim from a
    /// line (the non-table fallback). The phrase spans adjacent model
    /// mentions joined only by conjunction/slash/comma separators, so
    /// "Atlas & Atlas Cross Sport" comes back whole for target splitting.
    /// Never yields `Bonus` as a model — it is not in the normalizer table.
    fn detect_inline_model(&self, text: &str) -> (Option<u16>, Option<String>, Option<String>) {
        let year = self.patterns.inline_year.captures(text).and_then(|caps| {
            caps.get(1).map_or_else(
                || caps.get(2).and_then(|m| m.as_str().parse::<u16>().ok()),
                |two| two.as_str().parse::<u16>().ok().map(|y| 2000 + y),
            )
        });

        let lower = text.to_lowercase();
        let spans = patterns::model_spans(&lower);
        let Some(&(start, mut end)) = spans.first() else {
            return (year, None, None);
        };
        for &(next_start, next_end) in &spans[1..] {
            let gap = lower.get(end..next_start).unwrap_or("x");
            if gap.chars().all(|c| matches!(c, ' ' | '\t' | '&' | '/' | ',')) {
                end = next_end;
            } else {
                break;
            }
        }
        let model = text.get(start..end).map(str::to_owned);

        let right = text.get(end..).unwrap_or("");
        let right = right.split('$').next().unwrap_or("");
        let right = right.split('(').next().unwrap_or("");
        let right = right.trim_matches(|c: char| matches!(c, ' ' | '-' | '–' | '—' | '\t'));
        let trim = (!right.is_empty() && !right.to_uppercase().starts_with("MY"))
            .then(|| right.to_owned());

        (year, model, trim)
    }

    /// Emits one row, capturing program context by value.
    fn emit(&mut self, draft: Draft) {
        self.rows.push(RebateRow {
            rebate_type: self.ctx.rebate_type.clone(),
            program_id: self.ctx.program_id.clone(),
            published_date: self.ctx.published_date.clone(),
            program_start_date: self.ctx.program_start_date.clone(),
            program_end_date: self.ctx.program_end_date.clone(),
            model_year: draft.model_year,
            model: draft.model,
            trim: draft.trim,
            exclusions: draft.exclusions,
            amount_dollars: Some(draft.amount),
            currency: CURRENCY.to_owned(),
            page: draft.page,
            confidence: draft.confidence,
        });
    }
}

/// Interprets `25` as 2025 and passes 4-digit years through.
fn parse_model_year(digits: &str) -> Option<u16> {
    let value: u16 = digits.parse().ok()?;
    Some(if digits.len() == 4 { value } else { 2000 + value })
}
