//! Gross/net yield derivation.
//!
//! Both conversions are pure functions of already-scanned fields. The only
//! failure is a price that cannot anchor a yield (non-finite or non-positive),
//! reported as `MalformedField` so the record is dropped.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{BondQuote, Field, InstrumentKind, Rate, RawRecord};
use crate::error::ScrapeError;

/// Withholding rate on Italian sovereign instruments.
pub const WITHHOLDING_TAX_RATE: f64 = 0.125;

/// Lower bound on time-to-maturity, in years.
///
/// Near-maturity and already-matured bonds would otherwise blow up the
/// `(100 - price) / years` pull-to-par term.
pub const MIN_YEARS_TO_MATURITY: f64 = 0.1;

const MILLIS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0 * 1000.0;

/// Years from `fetched_at` to 00:00 UTC on `maturity` (ACT/365F), floored.
pub fn years_to_maturity(maturity: NaiveDate, fetched_at: DateTime<Utc>) -> f64 {
    let maturity_at = maturity.and_time(chrono::NaiveTime::MIN).and_utc();
    let millis = (maturity_at - fetched_at).num_milliseconds() as f64;
    (millis / MILLIS_PER_YEAR).max(MIN_YEARS_TO_MATURITY)
}

/// Simple annualized gross yield of a coupon bond, in percent.
///
/// `((coupon + (100 - price) / years) / price) * 100`
pub fn coupon_bond_gross_yield(price: f64, coupon: f64, maturity: NaiveDate, fetched_at: DateTime<Utc>) -> Rate {
    let years = years_to_maturity(maturity, fetched_at);
    Rate::new((coupon + (100.0 - price) / years) / price * 100.0)
}

/// Convert a published net yield back to gross using the tax-adjustment divisor.
pub fn gross_from_net(net_yield: f64) -> Rate {
    Rate::new(net_yield / (1.0 - WITHHOLDING_TAX_RATE))
}

/// Price a scanned record into an immutable `BondQuote`.
pub fn price_record(record: RawRecord, fetched_at: DateTime<Utc>) -> Result<BondQuote, ScrapeError> {
    if !(record.price.is_finite() && record.price > 0.0) {
        return Err(ScrapeError::MalformedField {
            family: record.kind,
            field: Field::Price,
            value: record.price.to_string(),
            reason: "price must be positive".to_string(),
        });
    }

    let (coupon, gross_yield, net_yield) = match record.kind {
        InstrumentKind::CouponBond => {
            let coupon = record.coupon.unwrap_or(0.0);
            let gross = coupon_bond_gross_yield(record.price, coupon, record.maturity, fetched_at);
            (Some(coupon), gross, None)
        }
        InstrumentKind::DiscountBill => {
            let net = record.net_yield.ok_or_else(|| ScrapeError::MalformedField {
                family: record.kind,
                field: Field::NetYield,
                value: String::new(),
                reason: "discount bill without a published net yield".to_string(),
            })?;
            (None, gross_from_net(net), Some(Rate::new(net)))
        }
    };

    Ok(BondQuote {
        isin: record.isin,
        description: record.description,
        kind: record.kind,
        price: record.price,
        coupon,
        maturity: record.maturity,
        gross_yield,
        net_yield,
    })
}
