//! Shared scrape pipeline used by the `scrape` and `scan` commands.
//!
//! fetch -> scan -> price, once per family (concurrently), then aggregate.
//! Persistence is left to the caller so a failed run never touches disk.

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, warn};

use crate::data::{Deadline, HtmlSource};
use crate::domain::{BondQuote, InstrumentKind, ScrapeConfig};
use crate::error::ScrapeError;
use crate::math::price_record;
use crate::scan::scan_document;
use crate::snapshot::Snapshot;

/// Per-family bookkeeping for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyStats {
    pub kind: InstrumentKind,
    /// Records that made it through scanning and pricing.
    pub found: usize,
    /// Records kept after `max_per_family`.
    pub kept: usize,
    pub abandoned: usize,
    pub incomplete: usize,
    pub malformed: usize,
}

/// Priced quotes of one family, in document order.
#[derive(Debug, Clone)]
pub struct FamilyQuotes {
    pub quotes: Vec<BondQuote>,
    pub stats: FamilyStats,
}

/// Everything a successful `btp scrape` run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub snapshot: Snapshot,
    pub stats: Vec<FamilyStats>,
    /// Non-fatal signals (currently only `ExtractionEmpty`).
    pub warnings: Vec<ScrapeError>,
}

/// Scan and price one family's page.
pub fn extract_quotes(
    kind: InstrumentKind,
    html: &str,
    fetched_at: DateTime<Utc>,
    max_per_family: Option<usize>,
) -> FamilyQuotes {
    let report = scan_document(kind, html);
    let mut malformed = report.malformed.len();

    let mut quotes = Vec::with_capacity(report.records.len());
    for record in report.records {
        match price_record(record, fetched_at) {
            Ok(quote) => quotes.push(quote),
            Err(e) => {
                debug!(error = %e, "dropping record");
                malformed += 1;
            }
        }
    }

    let found = quotes.len();
    if let Some(max) = max_per_family {
        quotes.truncate(max);
    }

    let stats = FamilyStats {
        kind,
        found,
        kept: quotes.len(),
        abandoned: report.abandoned,
        incomplete: report.incomplete,
        malformed,
    };
    FamilyQuotes { quotes, stats }
}

fn run_family(
    source: &dyn HtmlSource,
    kind: InstrumentKind,
    config: &ScrapeConfig,
    fetched_at: DateTime<Utc>,
    deadline: &Deadline,
) -> Result<FamilyQuotes, ScrapeError> {
    let span = info_span!("family", kind = kind.label());
    let _enter = span.enter();

    let url = config.sources.for_kind(kind);
    info!(url, "fetching");
    let html = source.fetch(url, deadline)?;

    let family = extract_quotes(kind, &html, fetched_at, config.max_per_family);
    let s = &family.stats;
    info!(
        found = s.found,
        kept = s.kept,
        abandoned = s.abandoned,
        incomplete = s.incomplete,
        malformed = s.malformed,
        "scanned"
    );
    Ok(family)
}

/// Execute the full pipeline and return the assembled snapshot.
///
/// `fetched_at` anchors the time-to-maturity of every coupon bond; the snapshot
/// timestamp is taken when the run completes.
pub fn run_scrape(
    source: &dyn HtmlSource,
    config: &ScrapeConfig,
    fetched_at: DateTime<Utc>,
) -> Result<RunOutput, ScrapeError> {
    let deadline = Deadline::after(config.run_budget);

    let (coupon_bonds, discount_bills) = rayon::join(
        || run_family(source, InstrumentKind::CouponBond, config, fetched_at, &deadline),
        || run_family(source, InstrumentKind::DiscountBill, config, fetched_at, &deadline),
    );
    let coupon_bonds = coupon_bonds?;
    let discount_bills = discount_bills?;
    deadline.check()?;

    let mut warnings = Vec::new();
    for family in [&coupon_bonds, &discount_bills] {
        // Judged on what the scan found, not on what survived the cap.
        if family.stats.found == 0 {
            let signal = ScrapeError::ExtractionEmpty {
                family: family.stats.kind,
            };
            if config.fail_on_empty {
                return Err(signal);
            }
            warn!("{signal}");
            warnings.push(signal);
        }
    }

    let stats = vec![coupon_bonds.stats, discount_bills.stats];
    let snapshot = Snapshot::assemble(Utc::now(), coupon_bonds.quotes, discount_bills.quotes);

    Ok(RunOutput {
        snapshot,
        stats,
        warnings,
    })
}
