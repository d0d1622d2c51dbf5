// src/catalog/sources/litres.rs
use std::collections::BTreeSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use serde::Deserialize;

use crate::catalog::error::SourceError;
use crate::catalog::item::{Badge, Category, CatalogItem, SourceId, UNKNOWN_CREATOR};
use crate::catalog::sources::CatalogSource;
use crate::catalog::text::clean_or;
use crate::config::LitresConfig;

const FALLBACK_TITLE: &str = "Untitled";

// --- wire format ---
// Listing endpoints answer `{"payload": {"data": [<art>]}}`, the detail
// endpoint `{"payload": {"data": <art>|null}}`. Prices are decimal rubles.

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    payload: ListPayload,
}

#[derive(Debug, Deserialize)]
struct ListPayload {
    data: Vec<Art>,
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    payload: DetailPayload,
}

#[derive(Debug, Deserialize)]
struct DetailPayload {
    data: Option<Art>,
}

#[derive(Debug, Deserialize)]
struct Art {
    id: Option<u64>,
    #[serde(default)]
    art_type: i64,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    persons: Vec<Person>,
    prices: Option<Prices>,
    rating: Option<Rating>,
    #[serde(default)]
    is_new: bool,
    #[serde(default)]
    is_bestseller: bool,
}

#[derive(Debug, Deserialize)]
struct Person {
    full_name: Option<String>,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Prices {
    final_price: Option<f64>,
    full_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Rating {
    rated_avg: Option<f32>,
    rated_total_count: Option<u64>,
}

fn rubles_to_kopeks(rubles: f64) -> u64 {
    (rubles * 100.0).round().max(0.0) as u64
}

/// Book storefront client.
///
/// Listing responses already carry everything an item needs, so there is no
/// enrichment step. All request shaping, including the browser session
/// cookie, comes from the injected config; the cookie value itself is
/// resolved from the environment at config load time.
pub struct LitresSource {
    cfg: LitresConfig,
    client: reqwest::Client,
}

impl LitresSource {
    pub fn new(cfg: LitresConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cfg.session_cookie() {
            let value = HeaderValue::from_str(&format!("SESSION_ID={cookie}"))
                .context("litres session cookie is not a valid header value")?;
            headers.insert(COOKIE, value);
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .default_headers(headers)
            .build()
            .context("building litres http client")?;
        Ok(Self { cfg, client })
    }

    fn detail_url(&self, id: u64, relative: Option<&str>) -> String {
        let site = self.cfg.site_url.trim_end_matches('/');
        match relative {
            Some(path) if !path.is_empty() => {
                format!("{}/{}", site, path.trim_start_matches('/'))
            }
            _ => format!("{site}/art/{id}"),
        }
    }

    fn normalize_art(&self, art: &Art) -> Option<CatalogItem> {
        let id = art.id?;

        let category = match art.art_type {
            1 => Category::Audiobook,
            _ => Category::Book,
        };

        // First author-roled person, else whoever is listed first.
        let author = art
            .persons
            .iter()
            .find(|p| {
                p.role
                    .as_deref()
                    .is_some_and(|r| r.eq_ignore_ascii_case("author"))
            })
            .or_else(|| art.persons.first())
            .and_then(|p| p.full_name.as_deref());

        let price_minor = art
            .prices
            .as_ref()
            .and_then(|p| p.final_price)
            .map(rubles_to_kopeks);
        let previous_minor = match (&art.prices, price_minor) {
            (Some(prices), Some(current)) => prices
                .full_price
                .map(rubles_to_kopeks)
                .filter(|&full| full > current),
            _ => None,
        };

        let rating_count = art
            .rating
            .as_ref()
            .and_then(|r| r.rated_total_count)
            .unwrap_or(0);
        let rating_average = if rating_count > 0 {
            art.rating
                .as_ref()
                .and_then(|r| r.rated_avg)
                .map(|avg| avg.clamp(0.0, 5.0))
        } else {
            None
        };

        let mut badges = BTreeSet::new();
        if art.is_new {
            badges.insert(Badge::New);
        }
        if art.is_bestseller {
            badges.insert(Badge::Bestseller);
        }
        if previous_minor.is_some() {
            badges.insert(Badge::Discount);
        }

        Some(CatalogItem {
            source: SourceId::Litres,
            external_id: id.to_string(),
            title: clean_or(art.title.as_deref(), FALLBACK_TITLE),
            creator: clean_or(author, UNKNOWN_CREATOR),
            category,
            price_minor_units: price_minor,
            previous_price_minor_units: previous_minor,
            rating_average,
            rating_count,
            badges,
            detail_url: self.detail_url(id, art.url.as_deref()),
            currency: self.cfg.currency.clone(),
        })
    }

    /// Turn a listing body into items, capped at `max_results`.
    pub fn normalize_list_body(&self, body: &str) -> Result<Vec<CatalogItem>, SourceError> {
        let t0 = std::time::Instant::now();
        let envelope: ListEnvelope = serde_json::from_str(body)
            .map_err(|e| SourceError::schema(format!("litres listing payload: {e}")))?;

        let out: Vec<CatalogItem> = envelope
            .payload
            .data
            .iter()
            .filter_map(|art| self.normalize_art(art))
            .take(self.cfg.max_results)
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("catalog_parse_ms").record(ms);
        counter!("catalog_items_total", "source" => "litres").increment(out.len() as u64);
        Ok(out)
    }

    /// Turn a detail body into at most one item; `data: null` means the art
    /// does not exist.
    pub fn normalize_detail_body(&self, body: &str) -> Result<Option<CatalogItem>, SourceError> {
        let envelope: DetailEnvelope = serde_json::from_str(body)
            .map_err(|e| SourceError::schema(format!("litres detail payload: {e}")))?;
        Ok(envelope
            .payload
            .data
            .as_ref()
            .and_then(|art| self.normalize_art(art)))
    }

    async fn get_list(&self, path: &str, query: &[(&str, &str)]) -> Result<String, SourceError> {
        let url = format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path);
        let resp = self.client.get(&url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl CatalogSource for LitresSource {
    fn id(&self) -> SourceId {
        SourceId::Litres
    }

    async fn search(&self, term: &str) -> Result<Vec<CatalogItem>, SourceError> {
        let limit = self.cfg.max_results.to_string();
        let body = self
            .get_list("/api/search", &[("q", term), ("limit", limit.as_str())])
            .await?;
        self.normalize_list_body(&body)
    }

    async fn featured(&self) -> Result<Vec<CatalogItem>, SourceError> {
        let limit = self.cfg.max_results.to_string();
        let body = self
            .get_list("/api/arts/popular", &[("limit", limit.as_str())])
            .await?;
        self.normalize_list_body(&body)
    }

    async fn detail(&self, external_id: &str) -> Result<Option<CatalogItem>, SourceError> {
        if external_id.parse::<u64>().is_err() {
            return Ok(None);
        }
        let url = format!(
            "{}/api/arts/{}",
            self.cfg.base_url.trim_end_matches('/'),
            external_id
        );
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }
        let body = resp.text().await?;
        self.normalize_detail_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> LitresSource {
        let cfg = LitresConfig {
            session_cookie: String::new(),
            ..LitresConfig::default()
        };
        LitresSource::new(cfg).expect("client builds")
    }

    #[test]
    fn list_body_maps_prices_authors_and_badges() {
        let body = r#"{"payload":{"data":[
            {
                "id": 70500123,
                "art_type": 0,
                "title": "Война и мир",
                "url": "/book/lev-tolstoy/voyna-i-mir-70500123/",
                "persons": [
                    {"full_name": "Иван Переводчиков", "role": "translator"},
                    {"full_name": "Лев Толстой", "role": "author"}
                ],
                "prices": {"final_price": 199.0, "full_price": 399.5},
                "rating": {"rated_avg": 4.8, "rated_total_count": 1523},
                "is_new": false,
                "is_bestseller": true
            },
            {
                "id": 70500124,
                "art_type": 1,
                "title": "Аудио новинка",
                "persons": [{"full_name": "Чтец Чтецов", "role": "reader"}],
                "prices": {"final_price": 299.0, "full_price": 299.0},
                "is_new": true
            }
        ]}}"#;
        let items = source().normalize_list_body(body).expect("valid body parses");

        assert_eq!(items.len(), 2);
        let book = &items[0];
        assert_eq!(book.external_id, "70500123");
        assert_eq!(book.category, Category::Book);
        assert_eq!(book.creator, "Лев Толстой", "author role wins over list order");
        assert_eq!(book.price_minor_units, Some(19900));
        assert_eq!(book.previous_price_minor_units, Some(39950));
        assert!(book.badges.contains(&Badge::Discount));
        assert!(book.badges.contains(&Badge::Bestseller));
        assert_eq!(book.rating_average, Some(4.8));
        assert_eq!(book.rating_count, 1523);
        assert_eq!(
            book.detail_url,
            "https://www.litres.ru/book/lev-tolstoy/voyna-i-mir-70500123/"
        );

        let audio = &items[1];
        assert_eq!(audio.category, Category::Audiobook);
        assert_eq!(audio.creator, "Чтец Чтецов", "fall back to the first person");
        assert_eq!(
            audio.previous_price_minor_units, None,
            "equal full and final price is not a discount"
        );
        assert!(audio.badges.contains(&Badge::New));
        assert!(!audio.badges.contains(&Badge::Discount));
        assert_eq!(audio.detail_url, "https://www.litres.ru/art/70500124");
    }

    #[test]
    fn list_body_without_payload_is_schema_error() {
        let err = source()
            .normalize_list_body(r#"{"status": "ok"}"#)
            .expect_err("missing payload must not look like an empty catalog");
        assert!(matches!(err, SourceError::Schema(_)));
    }

    #[test]
    fn detail_null_data_is_absent_art() {
        let found = source()
            .normalize_detail_body(r#"{"payload":{"data":null}}"#)
            .expect("envelope parses");
        assert!(found.is_none());
    }

    #[test]
    fn rating_without_votes_is_dropped() {
        let body = r#"{"payload":{"data":[
            {"id": 1, "title": "x", "rating": {"rated_avg": 4.0, "rated_total_count": 0}}
        ]}}"#;
        let items = source().normalize_list_body(body).expect("valid body parses");
        assert_eq!(items[0].rating_average, None);
        assert_eq!(items[0].rating_count, 0);
    }

    #[test]
    fn kopek_rounding_is_half_up() {
        assert_eq!(rubles_to_kopeks(99.9), 9990);
        assert_eq!(rubles_to_kopeks(0.005), 1);
        assert_eq!(rubles_to_kopeks(123.456), 12346);
    }
}
