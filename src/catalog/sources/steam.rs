// src/catalog/sources/steam.rs
use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use tokio::task::JoinSet;

use crate::catalog::error::SourceError;
use crate::catalog::item::{Badge, Category, CatalogItem, SourceId, UNKNOWN_CREATOR};
use crate::catalog::sources::CatalogSource;
use crate::catalog::text::clean_or;
use crate::config::SteamConfig;

const FALLBACK_TITLE: &str = "Unknown Game";

// --- wire format: storesearch ---

#[derive(Debug, Deserialize)]
struct SearchPayload {
    items: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: Option<u64>,
    name: Option<String>,
    price: Option<StubPrice>,
}

#[derive(Debug, Deserialize)]
struct StubPrice {
    currency: Option<String>,
    initial: Option<u64>,
    #[serde(rename = "final")]
    final_amount: u64,
}

// --- wire format: appdetails ---
// Response is `{"<appid>": {"success": bool, "data": {...}}}`; `data` is
// absent whenever `success` is false.

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<DetailData>,
}

#[derive(Debug, Deserialize)]
struct DetailData {
    name: Option<String>,
    #[serde(default)]
    is_free: bool,
    #[serde(default)]
    publishers: Vec<String>,
    price_overview: Option<PriceOverview>,
    metacritic: Option<Metacritic>,
    recommendations: Option<Recommendations>,
}

#[derive(Debug, Deserialize)]
struct PriceOverview {
    currency: Option<String>,
    initial: Option<u64>,
    #[serde(rename = "final")]
    final_amount: u64,
    #[serde(default)]
    discount_percent: u64,
}

#[derive(Debug, Deserialize)]
struct Metacritic {
    score: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct Recommendations {
    #[serde(default)]
    total: u64,
}

// --- wire format: featuredcategories ---

#[derive(Debug, Deserialize)]
struct FeaturedPayload {
    specials: Option<FeaturedCategory>,
    top_sellers: Option<FeaturedCategory>,
    new_releases: Option<FeaturedCategory>,
    coming_soon: Option<FeaturedCategory>,
}

#[derive(Debug, Deserialize)]
struct FeaturedCategory {
    #[serde(default)]
    items: Vec<FeaturedHit>,
}

#[derive(Debug, Deserialize)]
struct FeaturedHit {
    id: Option<u64>,
    name: Option<String>,
    #[serde(default)]
    discounted: bool,
    currency: Option<String>,
    original_price: Option<u64>,
    final_price: Option<u64>,
}

/// Steam storefront client.
///
/// Listings are two-step: `storesearch`/`featuredcategories` only return
/// thin stubs, so each stub is enriched through a per-app `appdetails` call.
/// A failed enrichment keeps the stub; only a failed listing fails the
/// source.
pub struct SteamSource {
    cfg: SteamConfig,
    client: reqwest::Client,
}

impl SteamSource {
    pub fn new(cfg: SteamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building steam http client")?;
        Ok(Self { cfg, client })
    }

    fn detail_url(&self, appid: u64) -> String {
        format!("{}/app/{}", self.cfg.store_url.trim_end_matches('/'), appid)
    }

    fn stub(&self, appid: u64, name: Option<&str>, price: Option<&StubPrice>) -> CatalogItem {
        let (price_minor, previous_minor, currency) = match price {
            Some(p) => {
                let previous = p
                    .initial
                    .filter(|&initial| initial > p.final_amount);
                (
                    Some(p.final_amount),
                    previous,
                    p.currency.clone().unwrap_or_else(|| self.cfg.currency.clone()),
                )
            }
            None => (None, None, self.cfg.currency.clone()),
        };
        let mut badges = BTreeSet::new();
        if previous_minor.is_some() {
            badges.insert(Badge::Discount);
        }
        CatalogItem {
            source: SourceId::Steam,
            external_id: appid.to_string(),
            title: clean_or(name, FALLBACK_TITLE),
            creator: UNKNOWN_CREATOR.to_string(),
            category: Category::Game,
            price_minor_units: price_minor,
            previous_price_minor_units: previous_minor,
            rating_average: None,
            rating_count: 0,
            badges,
            detail_url: self.detail_url(appid),
            currency,
        }
    }

    /// Turn a `storesearch` body into item stubs, capped at `max_results`.
    pub fn normalize_search_body(&self, body: &str) -> Result<Vec<CatalogItem>, SourceError> {
        let t0 = std::time::Instant::now();
        let payload: SearchPayload = serde_json::from_str(body)
            .map_err(|e| SourceError::schema(format!("steam search payload: {e}")))?;

        let mut out = Vec::new();
        for hit in payload.items {
            let Some(appid) = hit.id else { continue };
            out.push(self.stub(appid, hit.name.as_deref(), hit.price.as_ref()));
            if out.len() >= self.cfg.max_results {
                break;
            }
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("catalog_parse_ms").record(ms);
        counter!("catalog_items_total", "source" => "steam").increment(out.len() as u64);
        Ok(out)
    }

    /// Turn a `featuredcategories` body into item stubs.
    ///
    /// Categories are scanned in a fixed order and each contributes its
    /// badge; an app listed in several categories is kept once, from the
    /// first category that mentions it. A body where all four categories
    /// are missing is a schema failure, not an empty catalog.
    pub fn normalize_featured_body(&self, body: &str) -> Result<Vec<CatalogItem>, SourceError> {
        let t0 = std::time::Instant::now();
        let payload: FeaturedPayload = serde_json::from_str(body)
            .map_err(|e| SourceError::schema(format!("steam featured payload: {e}")))?;

        let buckets: [(&Option<FeaturedCategory>, Badge); 4] = [
            (&payload.specials, Badge::Discount),
            (&payload.top_sellers, Badge::Bestseller),
            (&payload.new_releases, Badge::New),
            (&payload.coming_soon, Badge::ComingSoon),
        ];
        if buckets.iter().all(|(cat, _)| cat.is_none()) {
            return Err(SourceError::schema("steam featured payload has no categories"));
        }

        let mut seen: HashSet<u64> = HashSet::new();
        let mut out = Vec::new();
        'scan: for (cat, badge) in buckets {
            let Some(cat) = cat else { continue };
            for hit in &cat.items {
                let Some(appid) = hit.id else { continue };
                if !seen.insert(appid) {
                    continue;
                }
                let mut item = self.featured_stub(appid, hit);
                item.badges.insert(badge);
                out.push(item);
                if out.len() >= self.cfg.max_results {
                    break 'scan;
                }
            }
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("catalog_parse_ms").record(ms);
        counter!("catalog_items_total", "source" => "steam").increment(out.len() as u64);
        Ok(out)
    }

    fn featured_stub(&self, appid: u64, hit: &FeaturedHit) -> CatalogItem {
        let price_minor = hit.final_price;
        let previous_minor = match (hit.original_price, hit.final_price) {
            (Some(orig), Some(fin)) if hit.discounted && orig > fin => Some(orig),
            _ => None,
        };
        let mut badges = BTreeSet::new();
        if previous_minor.is_some() {
            badges.insert(Badge::Discount);
        }
        CatalogItem {
            source: SourceId::Steam,
            external_id: appid.to_string(),
            title: clean_or(hit.name.as_deref(), FALLBACK_TITLE),
            creator: UNKNOWN_CREATOR.to_string(),
            category: Category::Game,
            price_minor_units: price_minor,
            previous_price_minor_units: previous_minor,
            rating_average: None,
            rating_count: 0,
            badges,
            detail_url: self.detail_url(appid),
            currency: hit
                .currency
                .clone()
                .unwrap_or_else(|| self.cfg.currency.clone()),
        }
    }

    /// Merge one `appdetails` body into a stub.
    ///
    /// `Ok(None)` means the store answered `success: false` for this app
    /// (delisted or region-locked); callers decide whether that keeps the
    /// stub or turns into a 404.
    pub fn merge_detail(
        &self,
        stub: &CatalogItem,
        body: &str,
    ) -> Result<Option<CatalogItem>, SourceError> {
        let envelopes: HashMap<String, DetailEnvelope> = serde_json::from_str(body)
            .map_err(|e| SourceError::schema(format!("steam detail payload: {e}")))?;
        let envelope = envelopes
            .get(&stub.external_id)
            .ok_or_else(|| SourceError::schema("steam detail payload missing requested app"))?;
        if !envelope.success {
            return Ok(None);
        }
        let Some(data) = &envelope.data else {
            return Ok(None);
        };

        let mut item = stub.clone();
        if let Some(name) = data.name.as_deref() {
            item.title = clean_or(Some(name), FALLBACK_TITLE);
        }
        if let Some(publisher) = data.publishers.iter().find(|p| !p.trim().is_empty()) {
            item.creator = clean_or(Some(publisher.as_str()), UNKNOWN_CREATOR);
        }

        if data.is_free {
            item.price_minor_units = Some(0);
            item.previous_price_minor_units = None;
        } else if let Some(price) = &data.price_overview {
            item.price_minor_units = Some(price.final_amount);
            item.previous_price_minor_units = price
                .initial
                .filter(|&initial| initial > price.final_amount);
            if let Some(currency) = &price.currency {
                item.currency = currency.clone();
            }
            if price.discount_percent > 0 || item.previous_price_minor_units.is_some() {
                item.badges.insert(Badge::Discount);
            }
        }

        item.rating_count = data.recommendations.as_ref().map_or(0, |r| r.total);
        item.rating_average = if item.rating_count > 0 {
            data.metacritic
                .as_ref()
                .and_then(|m| m.score)
                .map(|score| (score / 20.0).clamp(0.0, 5.0))
        } else {
            None
        };

        Ok(Some(item))
    }

    /// Fan out one `appdetails` call per stub; keep the stub on any failure.
    async fn enrich(&self, stubs: Vec<CatalogItem>) -> Vec<CatalogItem> {
        let mut out = stubs;
        let mut tasks = JoinSet::new();
        for (idx, stub) in out.iter().enumerate() {
            let client = self.client.clone();
            let base_url = self.cfg.base_url.clone();
            let appid = stub.external_id.clone();
            let language = self.cfg.language.clone();
            let country = self.cfg.country.clone();
            tasks.spawn(async move {
                let body = fetch_detail_body(&client, &base_url, &appid, &language, &country).await;
                (idx, body)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (idx, fetched) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = ?e, source = "steam", "detail task failed");
                    continue;
                }
            };
            let merged = fetched.and_then(|body| self.merge_detail(&out[idx], &body));
            match merged {
                Ok(Some(full)) => out[idx] = full,
                Ok(None) => {
                    tracing::warn!(
                        appid = %out[idx].external_id,
                        source = "steam",
                        "detail reported success=false, keeping stub"
                    );
                    counter!("catalog_detail_fallback_total", "source" => "steam").increment(1);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        appid = %out[idx].external_id,
                        source = "steam",
                        "detail fetch failed, keeping stub"
                    );
                    counter!("catalog_detail_fallback_total", "source" => "steam").increment(1);
                }
            }
        }
        out
    }
}

async fn fetch_detail_body(
    client: &reqwest::Client,
    base_url: &str,
    appid: &str,
    language: &str,
    country: &str,
) -> Result<String, SourceError> {
    let url = format!("{}/appdetails", base_url.trim_end_matches('/'));
    get_text(
        client,
        &url,
        &[("appids", appid), ("l", language), ("cc", country)],
    )
    .await
}

async fn get_text(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<String, SourceError> {
    let resp = client.get(url).query(query).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Status(status));
    }
    Ok(resp.text().await?)
}

#[async_trait]
impl CatalogSource for SteamSource {
    fn id(&self) -> SourceId {
        SourceId::Steam
    }

    async fn search(&self, term: &str) -> Result<Vec<CatalogItem>, SourceError> {
        let url = format!("{}/storesearch/", self.cfg.base_url.trim_end_matches('/'));
        let body = get_text(
            &self.client,
            &url,
            &[
                ("term", term),
                ("l", self.cfg.language.as_str()),
                ("cc", self.cfg.country.as_str()),
            ],
        )
        .await?;
        let stubs = self.normalize_search_body(&body)?;
        Ok(self.enrich(stubs).await)
    }

    async fn featured(&self) -> Result<Vec<CatalogItem>, SourceError> {
        let url = format!(
            "{}/featuredcategories",
            self.cfg.base_url.trim_end_matches('/')
        );
        let body = get_text(
            &self.client,
            &url,
            &[
                ("l", self.cfg.language.as_str()),
                ("cc", self.cfg.country.as_str()),
            ],
        )
        .await?;
        let stubs = self.normalize_featured_body(&body)?;
        Ok(self.enrich(stubs).await)
    }

    async fn detail(&self, external_id: &str) -> Result<Option<CatalogItem>, SourceError> {
        // Steam ids are numeric appids; anything else cannot exist there.
        let Ok(appid) = external_id.parse::<u64>() else {
            return Ok(None);
        };
        let stub = self.stub(appid, None, None);
        let body = fetch_detail_body(
            &self.client,
            &self.cfg.base_url,
            external_id,
            &self.cfg.language,
            &self.cfg.country,
        )
        .await?;
        self.merge_detail(&stub, &body)
    }
}
