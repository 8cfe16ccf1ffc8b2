//! Snapshot assembly: both families merged, summary derived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BondQuote, Rate};

/// Summary block. Always recomputed from the lists it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(rename = "totalBTPs")]
    pub total_coupon_bonds: usize,
    #[serde(rename = "totalBOTs")]
    pub total_discount_bills: usize,
    #[serde(rename = "avgYield")]
    pub average_gross_yield: Rate,
}

/// The persisted document read by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "lastUpdate")]
    pub generated_at: DateTime<Utc>,
    #[serde(rename = "btps")]
    pub coupon_bonds: Vec<BondQuote>,
    #[serde(rename = "bots")]
    pub discount_bills: Vec<BondQuote>,
    pub summary: Summary,
}

impl Snapshot {
    /// Merge both families (scan order kept) and derive the summary.
    pub fn assemble(
        generated_at: DateTime<Utc>,
        coupon_bonds: Vec<BondQuote>,
        discount_bills: Vec<BondQuote>,
    ) -> Self {
        let average_gross_yield =
            average_gross_yield(coupon_bonds.iter().chain(discount_bills.iter()));
        let summary = Summary {
            total_coupon_bonds: coupon_bonds.len(),
            total_discount_bills: discount_bills.len(),
            average_gross_yield,
        };

        Snapshot {
            generated_at,
            coupon_bonds,
            discount_bills,
            summary,
        }
    }

    pub fn quotes(&self) -> impl Iterator<Item = &BondQuote> {
        self.coupon_bonds.iter().chain(self.discount_bills.iter())
    }
}

/// Arithmetic mean of the gross yields, `0.00` for an empty set.
pub fn average_gross_yield<'a>(quotes: impl Iterator<Item = &'a BondQuote>) -> Rate {
    let (sum, n) = quotes.fold((0.0, 0usize), |(sum, n), q| (sum + q.gross_yield.value(), n + 1));
    if n == 0 {
        Rate::ZERO
    } else {
        Rate::new(sum / n as f64)
    }
}
