// src/catalog/item.rs
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sentinel creator for items whose author/publisher is not reported.
pub const UNKNOWN_CREATOR: &str = "unknown";

/// Storefront an item was fetched from. Together with `external_id` this is
/// the dedup key; ids are only meaningful within their source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Steam,
    Litres,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Steam => "steam",
            SourceId::Litres => "litres",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "steam" => Ok(SourceId::Steam),
            "litres" => Ok(SourceId::Litres),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Book,
    Audiobook,
    Game,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Book => "book",
            Category::Audiobook => "audiobook",
            Category::Game => "game",
        }
    }
}

/// Cross-source badge vocabulary. Sources map their own boolean flags onto
/// these tags so downstream code never needs source-specific knowledge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    New,
    Bestseller,
    Discount,
    ComingSoon,
}

impl Badge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Badge::New => "new",
            Badge::Bestseller => "bestseller",
            Badge::Discount => "discount",
            Badge::ComingSoon => "coming_soon",
        }
    }
}

/// Normalized representation of a purchasable item from any source.
///
/// Prices are integers in the currency's smallest unit (kopeks, cents);
/// `Some(0)` means free, `None` means the source did not report a price.
/// `rating_average` is on a 0–5 scale and is `None` whenever
/// `rating_count == 0`. Text fields hold full, untruncated, HTML-scrubbed
/// strings; display truncation is the view layer's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub source: SourceId,
    pub external_id: String,
    pub title: String,
    pub creator: String,
    pub category: Category,
    pub price_minor_units: Option<u64>,
    pub previous_price_minor_units: Option<u64>,
    pub rating_average: Option<f32>,
    pub rating_count: u64,
    pub badges: BTreeSet<Badge>,
    pub detail_url: String,
    pub currency: String,
}

/// Summary statistics over one aggregation's returned items.
///
/// `None` means "unavailable" (no item qualified for the measurement),
/// never a real zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub per_source: BTreeMap<SourceId, usize>,
    pub mean_price_minor_units: Option<f64>,
    pub mean_rating: Option<f64>,
}

impl Stats {
    /// Compute stats over the items a response actually carries.
    ///
    /// Items without a price are excluded from the price mean entirely
    /// (numerator and denominator); the rating mean only considers items
    /// with at least one vote.
    pub fn compute(items: &[CatalogItem]) -> Self {
        let mut per_source: BTreeMap<SourceId, usize> = BTreeMap::new();
        for item in items {
            *per_source.entry(item.source).or_insert(0) += 1;
        }

        let mut price_sum = 0.0f64;
        let mut price_n = 0usize;
        let mut rating_sum = 0.0f64;
        let mut rating_n = 0usize;
        for item in items {
            if let Some(p) = item.price_minor_units {
                price_sum += p as f64;
                price_n += 1;
            }
            if item.rating_count > 0 {
                if let Some(r) = item.rating_average {
                    rating_sum += f64::from(r);
                    rating_n += 1;
                }
            }
        }

        Stats {
            total: items.len(),
            per_source,
            mean_price_minor_units: (price_n > 0).then(|| price_sum / price_n as f64),
            mean_rating: (rating_n > 0).then(|| rating_sum / rating_n as f64),
        }
    }
}

/// One aggregation response: built per request, never persisted.
/// `errors` maps each failed source to a human-readable reason and is empty
/// when every source succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub items: Vec<CatalogItem>,
    #[serde(rename = "errors")]
    pub source_errors: BTreeMap<SourceId, String>,
    pub stats: Stats,
}
