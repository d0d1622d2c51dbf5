// src/catalog/sources/mod.rs
pub mod litres;
pub mod steam;

use async_trait::async_trait;

use super::error::SourceError;
use super::item::{CatalogItem, SourceId};

/// One upstream storefront.
///
/// Implementations hold their own `reqwest::Client`, built at startup with
/// the configured timeout, and normalize their payloads into `CatalogItem`s.
/// Every method returns a structured outcome; transport faults and schema
/// mismatches surface as `SourceError`, never as a panic. No retries at this
/// layer.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Free-text catalog search. The aggregator validates the term before
    /// calling, so implementations may assume it is non-empty.
    async fn search(&self, term: &str) -> Result<Vec<CatalogItem>, SourceError>;

    /// Storefront-curated "featured/top" listing.
    async fn featured(&self) -> Result<Vec<CatalogItem>, SourceError>;

    /// Single-item lookup. `Ok(None)` when the source does not know the id.
    async fn detail(&self, external_id: &str) -> Result<Option<CatalogItem>, SourceError>;
}
