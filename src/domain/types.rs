//! Shared domain types.
//!
//! These types are serializable so the same values flow from the scanner through
//! the yield calculator into the persisted snapshot without re-mapping.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Instrument family. Each family is scraped from its own source page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum InstrumentKind {
    /// Multi-year coupon bond (BTP).
    #[serde(rename = "BTP")]
    #[value(name = "btp")]
    CouponBond,
    /// Short-term zero-coupon bill (BOT).
    #[serde(rename = "BOT")]
    #[value(name = "bot")]
    DiscountBill,
}

impl InstrumentKind {
    pub fn label(self) -> &'static str {
        match self {
            InstrumentKind::CouponBond => "BTP",
            InstrumentKind::DiscountBill => "BOT",
        }
    }
}

/// A field the scanner can recover from a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Identifier,
    Description,
    Price,
    Coupon,
    Maturity,
    NetYield,
}

/// Italian ISIN: `IT` followed by exactly 10 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isin(String);

impl Isin {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let bytes = raw.as_bytes();
        let valid = bytes.len() == 12
            && bytes.starts_with(b"IT")
            && bytes[2..].iter().all(u8::is_ascii_digit);
        if valid {
            Ok(Isin(raw.to_string()))
        } else {
            Err(format!("'{raw}' is not an IT ISIN (IT + 10 digits)"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Isin {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Isin::parse(&value)
    }
}

impl From<Isin> for String {
    fn from(value: Isin) -> Self {
        value.0
    }
}

impl fmt::Display for Isin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Percentage rounded to 2 decimals.
///
/// Serialized as a decimal string with exactly two fraction digits (`"2.00"`),
/// which is the representation the presentation layer expects. Deserialization
/// also accepts a bare JSON number so older snapshots still load.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Rate(f64);

impl Rate {
    pub const ZERO: Rate = Rate(0.0);

    pub fn new(value: f64) -> Self {
        let rounded = round2(value);
        // Tiny negatives round to -0.0; keep the sign off the wire.
        Rate(if rounded == 0.0 { 0.0 } else { rounded })
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(f64),
        }

        let value = match Repr::deserialize(deserializer)? {
            Repr::Number(v) => v,
            Repr::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| serde::de::Error::custom(format!("invalid rate '{s}': {e}")))?,
        };
        if !value.is_finite() {
            return Err(serde::de::Error::custom("rate must be finite"));
        }
        Ok(Rate::new(value))
    }
}

/// Round half away from zero to 2 decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Field tuple recovered by the scanner, before any yield is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub kind: InstrumentKind,
    pub isin: Isin,
    pub description: String,
    pub price: f64,
    pub coupon: Option<f64>,
    pub maturity: NaiveDate,
    pub net_yield: Option<f64>,
}

/// One priced market record as persisted in the snapshot.
///
/// Field order matches the snapshot layout: `coupon` only appears on BTPs and
/// `netYield` only on BOTs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BondQuote {
    pub isin: Isin,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: InstrumentKind,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<f64>,
    #[serde(rename = "expiry")]
    pub maturity: NaiveDate,
    pub gross_yield: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_yield: Option<Rate>,
}

/// Where each family's page is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrls {
    pub coupon_bonds: String,
    pub discount_bills: String,
}

impl SourceUrls {
    pub fn for_kind(&self, kind: InstrumentKind) -> &str {
        match kind {
            InstrumentKind::CouponBond => &self.coupon_bonds,
            InstrumentKind::DiscountBill => &self.discount_bills,
        }
    }
}

/// HTTP behaviour of the fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub max_redirects: usize,
}

/// Fully-resolved run configuration for `btp scrape`.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub sources: SourceUrls,
    pub fetch: FetchConfig,
    pub output: PathBuf,
    /// Overall wall-clock budget for fetching and scanning both families.
    pub run_budget: Duration,
    /// Keep at most this many quotes per family (scan order).
    pub max_per_family: Option<usize>,
    /// Treat a family that yields zero records as a fatal error.
    pub fail_on_empty: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rate_rounding_to_zero_drops_the_sign() {
        assert_eq!(Rate::new(-0.001).to_string(), "0.00");
        assert!(Rate::new(-0.004).value().is_sign_positive());
        assert_eq!(Rate::new(-0.006).to_string(), "-0.01");
        assert_eq!(serde_json::to_string(&Rate::new(-0.0)).unwrap(), "\"0.00\"");
    }

    #[test]
    fn isin_rejects_near_misses() {
        assert!(Isin::parse("IT0005689887").is_ok());
        for bad in [
            "IT000568988",
            "IT00056898870",
            "it0005689887",
            "FR0005689887",
            "IT00056898A7",
            "IT０００５６８９８８７",
            " IT0005689887",
            "",
        ] {
            assert!(Isin::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    proptest! {
        #[test]
        fn isin_accepts_any_ten_digit_suffix(digits in "[0-9]{10}") {
            let raw = format!("IT{digits}");
            let isin = Isin::parse(&raw).unwrap();
            prop_assert_eq!(isin.as_str(), raw.as_str());
        }

        #[test]
        fn isin_rejects_other_arrangements(raw in "[A-Z0-9]{0,14}") {
            let expected = raw.len() == 12
                && raw.starts_with("IT")
                && raw[2..].chars().all(|c| c.is_ascii_digit());
            prop_assert_eq!(Isin::parse(&raw).is_ok(), expected);
        }
    }

    #[test]
    fn rate_serializes_with_two_fraction_digits() {
        assert_eq!(serde_json::to_string(&Rate::new(2.0)).unwrap(), "\"2.00\"");
        assert_eq!(serde_json::to_string(&Rate::new(3.456)).unwrap(), "\"3.46\"");

        let from_text: Rate = serde_json::from_str("\"1.75\"").unwrap();
        let from_number: Rate = serde_json::from_str("1.754").unwrap();
        assert_eq!(from_text, Rate::new(1.75));
        assert_eq!(from_number, Rate::new(1.75));
    }

    #[test]
    fn bond_quote_uses_snapshot_field_names() {
        let quote = BondQuote {
            isin: Isin::parse("IT0005689887").unwrap(),
            description: "Bot Zc Jan27 A Eur".to_string(),
            kind: InstrumentKind::DiscountBill,
            price: 98.067,
            coupon: None,
            maturity: NaiveDate::from_ymd_opt(2027, 1, 14).unwrap(),
            gross_yield: Rate::new(2.02),
            net_yield: Some(Rate::new(1.77)),
        };

        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["type"], "BOT");
        assert_eq!(json["expiry"], "2027-01-14");
        assert_eq!(json["grossYield"], "2.02");
        assert_eq!(json["netYield"], "1.77");
        assert!(json.get("coupon").is_none());
    }
}
