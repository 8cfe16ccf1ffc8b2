//! Formatted terminal output for runs and persisted snapshots.
//!
//! Formatting lives here so the pipeline stays free of presentation concerns.

use std::path::Path;

use crate::app::pipeline::{FamilyStats, RunOutput};
use crate::domain::BondQuote;
use crate::snapshot::Snapshot;

/// Summary printed after `btp scrape`.
pub fn format_run_summary(run: &RunOutput, output: &Path) -> String {
    let mut out = String::new();

    out.push_str("=== btp - Italian government bond snapshot ===\n");
    for stats in &run.stats {
        out.push_str(&format_family_stats(stats));
        out.push('\n');
    }
    for warning in &run.warnings {
        out.push_str(&format!("warning: {warning}\n"));
    }
    out.push_str(&format!(
        "Summary: {} BTPs, {} BOTs, avg yield {}%\n",
        run.snapshot.summary.total_coupon_bonds,
        run.snapshot.summary.total_discount_bills,
        run.snapshot.summary.average_gross_yield,
    ));
    out.push_str(&format!("Saved: {}\n", output.display()));

    out
}

/// One line of scan bookkeeping.
pub fn format_family_stats(stats: &FamilyStats) -> String {
    let mut line = format!("{}: {} found", stats.kind.label(), stats.found);
    if stats.kept != stats.found {
        line.push_str(&format!(", {} kept", stats.kept));
    }
    line.push_str(&format!(
        " | abandoned={} incomplete={} malformed={}",
        stats.abandoned, stats.incomplete, stats.malformed
    ));
    line
}

/// Header block for `btp show`.
pub fn format_snapshot_summary(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!("Last update: {}\n", snapshot.generated_at.to_rfc3339()));
    out.push_str(&format!(
        "BTPs: {} | BOTs: {} | avg gross yield: {}%\n",
        snapshot.summary.total_coupon_bonds,
        snapshot.summary.total_discount_bills,
        snapshot.summary.average_gross_yield,
    ));
    if let Some(best) = snapshot
        .quotes()
        .max_by(|a, b| a.gross_yield.partial_cmp(&b.gross_yield).unwrap_or(std::cmp::Ordering::Equal))
    {
        out.push_str(&format!(
            "Highest gross yield: {}% ({} {})\n",
            best.gross_yield, best.isin, best.description
        ));
    }
    out
}

/// Both family tables of a snapshot.
pub fn format_quotes(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    out.push_str("BTP (coupon bonds):\n");
    out.push_str(&format_quote_table(&snapshot.coupon_bonds));
    out.push('\n');

    out.push_str("BOT (discount bills):\n");
    out.push_str(&format_quote_table(&snapshot.discount_bills));

    out
}

pub fn format_quote_table(rows: &[BondQuote]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<12} {:<28} {:<10} {:>9} {:>7} {:>8} {:>8}",
            "isin", "description", "expiry", "price", "coupon", "gross%", "net%"
        )
        .trim_end(),
    );
    out.push('\n');

    out.push_str(
        format!(
            "{:-<12} {:-<28} {:-<10} {:-<9} {:-<7} {:-<8} {:-<8}",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for q in rows {
        out.push_str(
            format!(
                "{:<12} {:<28} {:<10} {:>9.3} {:>7} {:>8} {:>8}",
                q.isin.as_str(),
                truncate(&q.description, 28),
                q.maturity,
                q.price,
                q.coupon.map(|c| format!("{c:.3}")).unwrap_or_default(),
                q.gross_yield.to_string(),
                q.net_yield.map(|n| n.to_string()).unwrap_or_default(),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
