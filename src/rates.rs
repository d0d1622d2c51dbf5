// src/rates.rs
use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};

use crate::catalog::error::SourceError;
use crate::config::RatesConfig;

// --- wire format ---
// Central-bank daily quotes: `<ValCurs Date="22.08.2026"><Valute>...` with
// decimal-comma values and per-`Nominal` quotes (e.g. 100 JPY at once).

#[derive(Debug, Deserialize)]
struct ValCurs {
    #[serde(rename = "@Date", default)]
    date: Option<String>,
    #[serde(rename = "Valute", default)]
    valute: Vec<Valute>,
}

#[derive(Debug, Deserialize)]
struct Valute {
    #[serde(rename = "CharCode")]
    char_code: String,
    #[serde(rename = "Nominal")]
    nominal: u64,
    #[serde(rename = "Value")]
    value: String,
}

fn parse_decimal_comma(s: &str) -> Option<f64> {
    s.trim().replace(',', ".").parse::<f64>().ok()
}

/// One day's RUB quotes, keyed by ISO char code, normalized to a single
/// currency unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateTable {
    pub date: Option<NaiveDate>,
    pub rub_per_unit: BTreeMap<String, f64>,
}

impl RateTable {
    /// Parse the daily XML body. Entries with a zero nominal or an
    /// unparseable value are skipped; a body yielding no usable entry at
    /// all is a schema failure, not an empty table.
    pub fn parse(body: &str) -> Result<Self, SourceError> {
        let doc: ValCurs = from_str(body)
            .map_err(|e| SourceError::schema(format!("rates xml: {e}")))?;

        let mut rub_per_unit = BTreeMap::new();
        for v in &doc.valute {
            if v.nominal == 0 {
                continue;
            }
            let Some(value) = parse_decimal_comma(&v.value) else {
                tracing::warn!(code = %v.char_code, raw = %v.value, "unparseable rate value");
                continue;
            };
            rub_per_unit.insert(v.char_code.clone(), value / v.nominal as f64);
        }
        if rub_per_unit.is_empty() {
            return Err(SourceError::schema("rates xml carries no usable quotes"));
        }

        let date = doc
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%d.%m.%Y").ok());
        Ok(Self { date, rub_per_unit })
    }

    /// RUB per one unit of `code`. RUB itself converts at identity.
    pub fn rate(&self, code: &str) -> Option<f64> {
        if code.eq_ignore_ascii_case("RUB") {
            return Some(1.0);
        }
        self.rub_per_unit.get(&code.to_ascii_uppercase()).copied()
    }

    /// Convert an amount in `from` minor units to RUB minor units.
    /// `None` when the currency is not quoted.
    pub fn convert_minor_units(&self, amount_minor: u64, from: &str) -> Option<f64> {
        self.rate(from).map(|r| amount_minor as f64 * r)
    }
}

/// Daily-quote fetcher for the central-bank XML endpoint.
pub struct RatesClient {
    cfg: RatesConfig,
    client: reqwest::Client,
}

impl RatesClient {
    pub fn new(cfg: RatesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building rates http client")?;
        Ok(Self { cfg, client })
    }

    pub async fn daily(&self) -> Result<RateTable, SourceError> {
        let url = format!(
            "{}/scripts/XML_daily.asp",
            self.cfg.base_url.trim_end_matches('/')
        );
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }
        // reqwest decodes windows-1251 via the response charset header.
        let body = resp.text().await?;
        RateTable::parse(&body)
    }
}
