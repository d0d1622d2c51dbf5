// tests/rates_xml.rs
//
// Full daily-quotes fixture through RateTable::parse. The fixture mirrors
// the central-bank payload shape: decimal commas, per-Nominal quotes and
// extra elements (NumCode, Name, VunitRate) the parser must ignore.

use chrono::NaiveDate;

use pricewatch::rates::RateTable;

const DAILY_XML: &str = include_str!("fixtures/cbr_daily.xml");

#[test]
fn fixture_parses_every_quote_and_the_date() {
    let table = RateTable::parse(DAILY_XML).expect("daily fixture parses");

    assert_eq!(table.date, NaiveDate::from_ymd_opt(2026, 8, 21));
    assert_eq!(
        table.rub_per_unit.len(),
        5,
        "all five quoted currencies survive"
    );
    assert_eq!(table.rate("USD"), Some(92.5));
    assert_eq!(table.rate("EUR"), Some(100.25));
    assert_eq!(table.rate("GBP"), Some(117.81));
}

#[test]
fn hundred_unit_nominals_are_scaled_to_one_unit() {
    let table = RateTable::parse(DAILY_XML).expect("daily fixture parses");

    assert_eq!(table.rate("JPY"), Some(0.635));
    let kzt = table.rate("KZT").expect("KZT is quoted");
    assert!(
        (kzt - 0.192).abs() < 1e-12,
        "100 KZT at 19.20 is 0.192 per tenge, got {kzt}"
    );
}

#[test]
fn conversion_uses_the_quoted_rate_or_declines() {
    let table = RateTable::parse(DAILY_XML).expect("daily fixture parses");

    // $19.99 at 92.5 RUB/USD, in minor units on both sides.
    assert_eq!(table.convert_minor_units(1999, "USD"), Some(184_907.5));
    assert_eq!(table.convert_minor_units(1999, "usd"), Some(184_907.5));
    assert_eq!(
        table.convert_minor_units(1999, "CHF"),
        None,
        "an unquoted currency converts to nothing rather than guessing"
    );
}
