//! Per-family field grammars.
//!
//! A grammar is data: the ordered list of fields a record is made of, each with
//! the recognizer that extracts it. The markup-specific anchors of each source
//! live here and nowhere else.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{Field, InstrumentKind};

/// Recognizer for one field: a regex whose first capture group is the value.
#[derive(Debug)]
pub struct FieldRule {
    pub field: Field,
    pub pattern: Regex,
    /// Optional fields may be skipped when the following field matches first.
    pub optional: bool,
}

/// Field sequence and lexical conventions of one source page.
#[derive(Debug)]
pub struct FamilyGrammar {
    pub kind: InstrumentKind,
    /// Text that must appear on the same line as an identifier for it to count.
    pub identifier_anchor: Option<&'static str>,
    /// `chrono` format of the maturity field.
    pub date_format: &'static str,
    /// `rules[0]` is always the identifier.
    pub rules: Vec<FieldRule>,
}

impl FamilyGrammar {
    pub fn for_kind(kind: InstrumentKind) -> &'static FamilyGrammar {
        match kind {
            InstrumentKind::CouponBond => &COUPON_BONDS,
            InstrumentKind::DiscountBill => &DISCOUNT_BILLS,
        }
    }

    pub fn identifier(&self) -> &FieldRule {
        &self.rules[0]
    }

    pub fn anchor_matches(&self, line: &str) -> bool {
        self.identifier_anchor.is_none_or(|anchor| line.contains(anchor))
    }
}

fn rule(field: Field, pattern: &str) -> FieldRule {
    FieldRule {
        field,
        pattern: Regex::new(pattern).expect("static field pattern"),
        optional: false,
    }
}

fn optional(field: Field, pattern: &str) -> FieldRule {
    FieldRule {
        optional: true,
        ..rule(field, pattern)
    }
}

const IDENTIFIER: &str = r">\s*(IT[0-9]{10})\s*<";

/// Borsa Italiana MOT list:
///
/// ```text
/// <a href="/borsa/obbligazioni/mot/btp/scheda/IT0001086567.html?lang=en">IT0001086567</a>
/// <span>Btp-1nv26 7,25%</span>
/// <span>103.767</span>
/// <span>3.625</span>
/// <span>2026/11/01</span>
/// ```
static COUPON_BONDS: Lazy<FamilyGrammar> = Lazy::new(|| FamilyGrammar {
    kind: InstrumentKind::CouponBond,
    identifier_anchor: Some("/borsa/obbligazioni/mot/btp/"),
    date_format: "%Y/%m/%d",
    rules: vec![
        rule(Field::Identifier, IDENTIFIER),
        rule(Field::Description, r"(?i)>\s*(btp[^<]*?)\s*<"),
        rule(Field::Price, r">\s*([0-9]{2,3}\.[0-9]{3})\s*<"),
        optional(Field::Coupon, r">\s*([0-9]+(?:\.[0-9]+)?)\s*<"),
        rule(Field::Maturity, r">\s*([0-9]{4}/[0-9]{2}/[0-9]{2})\s*<"),
    ],
});

/// Rendimenti.it BOT table:
///
/// ```text
/// <td><a href="/bot/IT0005689887">IT0005689887</a></td>
/// <td>Bot Zc Jan27 A Eur</td>
/// <td>2027-01-14</td>
/// <td>12</td>
/// <td>98.067</td>
/// <td>1.77%</td>
/// ```
static DISCOUNT_BILLS: Lazy<FamilyGrammar> = Lazy::new(|| FamilyGrammar {
    kind: InstrumentKind::DiscountBill,
    identifier_anchor: None,
    date_format: "%Y-%m-%d",
    rules: vec![
        rule(Field::Identifier, IDENTIFIER),
        rule(Field::Description, r"(?i)>\s*(bot\s+zc[^<]*?)\s*<"),
        rule(Field::Maturity, r">\s*([0-9]{4}-[0-9]{2}-[0-9]{2})\s*<"),
        // Decimal point required: the days-to-maturity column sits between
        // maturity and price and is a bare integer.
        rule(Field::Price, r">\s*([0-9]{2,3}\.[0-9]+)\s*<"),
        rule(Field::NetYield, r">\s*(-?[0-9]+(?:\.[0-9]+)?)\s*%\s*<"),
    ],
});
