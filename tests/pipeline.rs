//! End-to-end pipeline runs against saved listing pages.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use btp_tracker::app::pipeline::run_scrape;
use btp_tracker::data::{Deadline, HtmlSource};
use btp_tracker::domain::{FetchConfig, InstrumentKind, Rate, ScrapeConfig, SourceUrls};
use btp_tracker::error::ScrapeError;
use btp_tracker::io::{read_snapshot, write_snapshot};
use btp_tracker::math::coupon_bond_gross_yield;

const BTP_URL: &str = "https://fixture.test/btp";
const BOT_URL: &str = "https://fixture.test/bot";

const BTP_PAGE: &str = include_str!("fixtures/borsa_btp.html");
const BOT_PAGE: &str = include_str!("fixtures/rendimenti_bot.html");

/// Serves canned pages; unknown URLs fail like an unreachable host.
struct FixtureSource {
    pages: HashMap<&'static str, &'static str>,
}

impl FixtureSource {
    fn new(btp: &'static str, bot: &'static str) -> Self {
        Self {
            pages: HashMap::from([(BTP_URL, btp), (BOT_URL, bot)]),
        }
    }

    fn without(mut self, url: &str) -> Self {
        self.pages.remove(url);
        self
    }
}

impl HtmlSource for FixtureSource {
    fn fetch(&self, url: &str, deadline: &Deadline) -> Result<String, ScrapeError> {
        deadline.check()?;
        self.pages
            .get(url)
            .map(|page| page.to_string())
            .ok_or_else(|| ScrapeError::Network {
                url: url.to_string(),
                status: None,
                reason: "connection refused".to_string(),
            })
    }
}

fn config() -> ScrapeConfig {
    ScrapeConfig {
        sources: SourceUrls {
            coupon_bonds: BTP_URL.to_string(),
            discount_bills: BOT_URL.to_string(),
        },
        fetch: FetchConfig {
            user_agent: "btp-tracker-test".to_string(),
            request_timeout: Duration::from_secs(5),
            max_retries: 0,
            retry_base_delay: Duration::from_millis(1),
            max_redirects: 5,
        },
        output: PathBuf::from("unused.json"),
        run_budget: Duration::from_secs(30),
        max_per_family: None,
        fail_on_empty: false,
    }
}

fn fetched_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

#[test]
fn builds_snapshot_from_both_listing_pages() {
    let source = FixtureSource::new(BTP_PAGE, BOT_PAGE);
    let run = run_scrape(&source, &config(), fetched_at()).unwrap();
    let snap = &run.snapshot;

    // The BTP row without a maturity date is dropped; its neighbours survive.
    let btp_isins: Vec<&str> = snap.coupon_bonds.iter().map(|q| q.isin.as_str()).collect();
    assert_eq!(btp_isins, ["IT0001086567", "IT0005436693"]);

    let first = &snap.coupon_bonds[0];
    assert_eq!(first.kind, InstrumentKind::CouponBond);
    assert_eq!(first.description, "Btp-1nv26 7,25%");
    assert_eq!(first.price, 103.767);
    assert_eq!(first.coupon, Some(3.625));
    assert_eq!(first.maturity, NaiveDate::from_ymd_opt(2026, 11, 1).unwrap());
    assert_eq!(
        first.gross_yield,
        coupon_bond_gross_yield(103.767, 3.625, first.maturity, fetched_at())
    );
    assert!(first.net_yield.is_none());

    let bot_isins: Vec<&str> = snap.discount_bills.iter().map(|q| q.isin.as_str()).collect();
    assert_eq!(bot_isins, ["IT0005689887", "IT0005684888"]);

    let bill = &snap.discount_bills[0];
    assert_eq!(bill.price, 98.067);
    assert_eq!(bill.net_yield.unwrap().to_string(), "1.77");
    assert_eq!(bill.gross_yield.to_string(), "2.02");
    assert_eq!(snap.discount_bills[1].gross_yield.to_string(), "2.00");

    let sum: f64 = snap.quotes().map(|q| q.gross_yield.value()).sum();
    assert_eq!(snap.summary.total_coupon_bonds, 2);
    assert_eq!(snap.summary.total_discount_bills, 2);
    assert_eq!(snap.summary.average_gross_yield, Rate::new(sum / 4.0));

    let btp_stats = &run.stats[0];
    assert_eq!(btp_stats.kind, InstrumentKind::CouponBond);
    assert_eq!(btp_stats.abandoned, 1);
    assert!(run.warnings.is_empty());
}

#[test]
fn identical_pages_give_identical_content() {
    let source = FixtureSource::new(BTP_PAGE, BOT_PAGE);
    let first = run_scrape(&source, &config(), fetched_at()).unwrap().snapshot;
    let second = run_scrape(&source, &config(), fetched_at()).unwrap().snapshot;

    assert_eq!(first.coupon_bonds, second.coupon_bonds);
    assert_eq!(first.discount_bills, second.discount_bills);
    assert_eq!(first.summary, second.summary);
}

#[test]
fn fetch_failure_aborts_without_touching_prior_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("btp-data.json");

    let good = run_scrape(&FixtureSource::new(BTP_PAGE, BOT_PAGE), &config(), fetched_at()).unwrap();
    write_snapshot(&path, &good.snapshot).unwrap();
    let before = std::fs::read(&path).unwrap();

    let broken = FixtureSource::new(BTP_PAGE, BOT_PAGE).without(BOT_URL);
    let err = run_scrape(&broken, &config(), fetched_at()).unwrap_err();
    assert!(matches!(err, ScrapeError::Network { .. }));

    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn empty_family_is_a_warning_unless_strict() {
    let source = FixtureSource::new(BTP_PAGE, "<html><body>Servizio non disponibile</body></html>");

    let run = run_scrape(&source, &config(), fetched_at()).unwrap();
    assert_eq!(run.snapshot.summary.total_coupon_bonds, 2);
    assert_eq!(run.snapshot.summary.total_discount_bills, 0);
    assert!(matches!(
        run.warnings.as_slice(),
        [ScrapeError::ExtractionEmpty {
            family: InstrumentKind::DiscountBill
        }]
    ));

    let strict = ScrapeConfig {
        fail_on_empty: true,
        ..config()
    };
    let err = run_scrape(&source, &strict, fetched_at()).unwrap_err();
    assert!(matches!(err, ScrapeError::ExtractionEmpty { .. }));
}

#[test]
fn per_family_cap_applies_before_the_summary() {
    let capped = ScrapeConfig {
        max_per_family: Some(1),
        ..config()
    };
    let run = run_scrape(&FixtureSource::new(BTP_PAGE, BOT_PAGE), &capped, fetched_at()).unwrap();

    assert_eq!(run.snapshot.coupon_bonds.len(), 1);
    assert_eq!(run.snapshot.discount_bills.len(), 1);
    assert_eq!(run.snapshot.summary.total_coupon_bonds, 1);
    assert_eq!(run.snapshot.summary.total_discount_bills, 1);
    assert_eq!(run.stats[1].found, 2);
    assert_eq!(run.stats[1].kept, 1);
}

#[test]
fn cap_of_zero_is_not_an_empty_extraction() {
    let strict = ScrapeConfig {
        max_per_family: Some(0),
        fail_on_empty: true,
        ..config()
    };
    let run = run_scrape(&FixtureSource::new(BTP_PAGE, BOT_PAGE), &strict, fetched_at()).unwrap();

    assert!(run.warnings.is_empty());
    assert!(run.snapshot.coupon_bonds.is_empty());
    assert!(run.snapshot.discount_bills.is_empty());
    assert_eq!(run.snapshot.summary.average_gross_yield, Rate::ZERO);
    assert_eq!(run.stats[0].found, 2);
    assert_eq!(run.stats[0].kept, 0);
}

#[test]
fn exhausted_budget_is_a_timeout() {
    let no_time = ScrapeConfig {
        run_budget: Duration::ZERO,
        ..config()
    };
    let err = run_scrape(&FixtureSource::new(BTP_PAGE, BOT_PAGE), &no_time, fetched_at()).unwrap_err();
    assert!(matches!(err, ScrapeError::Timeout { .. }));
}

#[test]
fn persisted_document_follows_the_presentation_contract() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("btp-data.json");

    let run = run_scrape(&FixtureSource::new(BTP_PAGE, BOT_PAGE), &config(), fetched_at()).unwrap();
    write_snapshot(&path, &run.snapshot).unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert!(raw["lastUpdate"].is_string());

    let btp = &raw["btps"][0];
    assert_eq!(btp["isin"], "IT0001086567");
    assert_eq!(btp["type"], "BTP");
    assert_eq!(btp["expiry"], "2026-11-01");
    assert!(btp["price"].is_number());
    assert!(btp["coupon"].is_number());
    assert!(btp.get("netYield").is_none());

    let bot = &raw["bots"][0];
    assert_eq!(bot["type"], "BOT");
    assert_eq!(bot["expiry"], "2027-01-14");
    assert_eq!(bot["grossYield"], "2.02");
    assert_eq!(bot["netYield"], "1.77");
    assert!(bot.get("coupon").is_none());

    assert_eq!(raw["summary"]["totalBTPs"], 2);
    assert_eq!(raw["summary"]["totalBOTs"], 2);
    let avg = raw["summary"]["avgYield"].as_str().unwrap();
    assert_eq!(avg.split('.').nth(1).map(str::len), Some(2));

    assert_eq!(read_snapshot(&path).unwrap(), run.snapshot);
}
