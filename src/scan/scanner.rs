//! Line-oriented finite-state record scanner.
//!
//! The scanner walks the document one line at a time. Within a line it consumes
//! successive chunks: after a field matches, scanning resumes right after that
//! match. At any point only three things can match:
//!
//! - the field the current record expects next,
//! - the field after it, when the expected one is optional,
//! - a new identifier, which abandons the current record.
//!
//! The earliest match in the chunk wins. Ties go to the expected field.

use chrono::NaiveDate;
use tracing::{debug, trace};

use crate::domain::{Field, InstrumentKind, Isin, RawRecord};
use crate::error::ScrapeError;
use crate::scan::grammar::{FamilyGrammar, FieldRule};
use crate::scan::text::{normalize_entities, normalize_ws, parse_decimal};

/// Result of scanning one document.
#[derive(Debug)]
pub struct ScanReport {
    pub kind: InstrumentKind,
    /// Completed records, in document order.
    pub records: Vec<RawRecord>,
    /// Records dropped because a field failed semantic validation.
    pub malformed: Vec<ScrapeError>,
    /// Partial records abandoned when a new identifier showed up.
    pub abandoned: usize,
    /// Partial records that never reached their last field.
    pub incomplete: usize,
}

#[derive(Debug, Default)]
struct PartialRecord {
    isin: Option<Isin>,
    description: Option<String>,
    price: Option<f64>,
    coupon: Option<f64>,
    maturity: Option<NaiveDate>,
    net_yield: Option<f64>,
}

impl PartialRecord {
    fn started(isin: Isin) -> Self {
        PartialRecord {
            isin: Some(isin),
            ..PartialRecord::default()
        }
    }

    fn fill(&mut self, field: Field, raw: &str, date_format: &str) -> Result<(), String> {
        match field {
            Field::Identifier => self.isin = Some(Isin::parse(raw)?),
            Field::Description => {
                let text = normalize_ws(&normalize_entities(raw));
                if text.is_empty() {
                    return Err("empty description".to_string());
                }
                self.description = Some(text);
            }
            Field::Price => {
                let price = parse_decimal(raw)?;
                if price <= 0.0 {
                    return Err("price must be positive".to_string());
                }
                self.price = Some(price);
            }
            Field::Coupon => {
                let coupon = parse_decimal(raw)?;
                if coupon < 0.0 {
                    return Err("coupon must not be negative".to_string());
                }
                self.coupon = Some(coupon);
            }
            Field::Maturity => {
                let date = NaiveDate::parse_from_str(raw.trim(), date_format)
                    .map_err(|e| format!("invalid date (expected {date_format}): {e}"))?;
                self.maturity = Some(date);
            }
            Field::NetYield => self.net_yield = Some(parse_decimal(raw)?),
        }
        Ok(())
    }

    /// Mandatory fields present → record. Coupon stays optional.
    fn into_record(self, kind: InstrumentKind) -> Option<RawRecord> {
        if kind == InstrumentKind::DiscountBill && self.net_yield.is_none() {
            return None;
        }
        Some(RawRecord {
            kind,
            isin: self.isin?,
            description: self.description?,
            price: self.price?,
            coupon: self.coupon,
            maturity: self.maturity?,
            net_yield: self.net_yield,
        })
    }
}

#[derive(Debug)]
enum ScanState {
    AwaitingIdentifier,
    /// `next` indexes the grammar rule this record expects next.
    Filling { next: usize, partial: PartialRecord },
}

#[derive(Debug)]
enum Step {
    Fill { rule: usize, value: String, end: usize },
    Restart { value: String, end: usize },
}

struct Hit {
    start: usize,
    end: usize,
    value: String,
}

fn find(rule: &FieldRule, text: &str) -> Option<Hit> {
    let caps = rule.pattern.captures(text)?;
    let whole = caps.get(0)?;
    Some(Hit {
        start: whole.start(),
        end: whole.end(),
        value: caps.get(1)?.as_str().to_string(),
    })
}

fn keep_earliest(best: &mut Option<(usize, Step)>, start: usize, step: Step) {
    if best.as_ref().is_none_or(|(s, _)| start < *s) {
        *best = Some((start, step));
    }
}

/// Incremental scanner for one instrument family.
pub struct RecordScanner {
    grammar: &'static FamilyGrammar,
    state: ScanState,
    report: ScanReport,
}

impl RecordScanner {
    pub fn new(kind: InstrumentKind) -> Self {
        Self {
            grammar: FamilyGrammar::for_kind(kind),
            state: ScanState::AwaitingIdentifier,
            report: ScanReport {
                kind,
                records: Vec::new(),
                malformed: Vec::new(),
                abandoned: 0,
                incomplete: 0,
            },
        }
    }

    pub fn feed_line(&mut self, line: &str) {
        let anchored = self.grammar.anchor_matches(line);
        let mut rest = line;
        while let Some(step) = self.next_step(rest, anchored) {
            let consumed = self.apply(step);
            rest = &rest[consumed..];
        }
    }

    pub fn finish(mut self) -> ScanReport {
        if let ScanState::Filling { partial, .. } = &self.state {
            trace!(isin = ?partial.isin, "partial record left at end of input");
            self.report.incomplete += 1;
        }
        self.report
    }

    fn next_step(&self, rest: &str, anchored: bool) -> Option<Step> {
        let rules = &self.grammar.rules;
        let restart = if anchored { find(self.grammar.identifier(), rest) } else { None };

        let next = match &self.state {
            ScanState::AwaitingIdentifier => {
                return restart.map(|hit| Step::Restart {
                    value: hit.value,
                    end: hit.end,
                });
            }
            ScanState::Filling { next, .. } => *next,
        };

        let mut best = None;
        if let Some(hit) = find(&rules[next], rest) {
            keep_earliest(&mut best, hit.start, Step::Fill { rule: next, value: hit.value, end: hit.end });
        }
        if rules[next].optional && next + 1 < rules.len() {
            if let Some(hit) = find(&rules[next + 1], rest) {
                keep_earliest(&mut best, hit.start, Step::Fill { rule: next + 1, value: hit.value, end: hit.end });
            }
        }
        if let Some(hit) = restart {
            keep_earliest(&mut best, hit.start, Step::Restart { value: hit.value, end: hit.end });
        }
        best.map(|(_, step)| step)
    }

    /// Apply one step and return how many bytes of the chunk it consumed.
    fn apply(&mut self, step: Step) -> usize {
        match step {
            Step::Restart { value, end } => {
                let isin = match Isin::parse(&value) {
                    Ok(isin) => isin,
                    Err(reason) => {
                        self.drop_record(Field::Identifier, value, reason);
                        return end;
                    }
                };
                if let ScanState::Filling { partial, .. } = &self.state {
                    if partial.isin.as_ref() == Some(&isin) {
                        return end;
                    }
                    debug!(
                        family = self.report.kind.label(),
                        abandoned = ?partial.isin,
                        next = %isin,
                        "new identifier before record completed; restarting"
                    );
                    self.report.abandoned += 1;
                }
                self.state = ScanState::Filling {
                    next: 1,
                    partial: PartialRecord::started(isin),
                };
                end
            }
            Step::Fill { rule, value, end } => {
                let field = self.grammar.rules[rule].field;
                let filled = match &mut self.state {
                    ScanState::Filling { next, partial } => {
                        let result = partial.fill(field, &value, self.grammar.date_format);
                        if result.is_ok() {
                            *next = rule + 1;
                        }
                        result
                    }
                    ScanState::AwaitingIdentifier => return end,
                };
                match filled {
                    Err(reason) => self.drop_record(field, value, reason),
                    Ok(()) if rule + 1 == self.grammar.rules.len() => self.complete(),
                    Ok(()) => {}
                }
                end
            }
        }
    }

    fn complete(&mut self) {
        let state = std::mem::replace(&mut self.state, ScanState::AwaitingIdentifier);
        if let ScanState::Filling { partial, .. } = state {
            match partial.into_record(self.report.kind) {
                Some(record) => {
                    trace!(isin = %record.isin, "record complete");
                    self.report.records.push(record);
                }
                None => self.report.incomplete += 1,
            }
        }
    }

    fn drop_record(&mut self, field: Field, value: String, reason: String) {
        let err = ScrapeError::MalformedField {
            family: self.report.kind,
            field,
            value,
            reason,
        };
        debug!(error = %err, "dropping record");
        self.report.malformed.push(err);
        self.state = ScanState::AwaitingIdentifier;
    }
}

/// Scan a whole document for one family.
pub fn scan_document(kind: InstrumentKind, html: &str) -> ScanReport {
    let mut scanner = RecordScanner::new(kind);
    for line in html.lines() {
        scanner.feed_line(line);
    }
    scanner.finish()
}
