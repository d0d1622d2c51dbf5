// src/catalog/mod.rs
pub mod error;
pub mod item;
pub mod sources;
pub mod text;

use std::collections::BTreeMap;
use std::sync::Arc;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::catalog::error::{SourceError, ValidationError};
use crate::catalog::item::{AggregationResult, CatalogItem, SourceId, Stats};
use crate::catalog::sources::CatalogSource;

/// Shortest accepted search term, in chars.
pub const MIN_QUERY_LEN: usize = 2;
/// Default cap on items per aggregated response.
pub const DEFAULT_MAX_ITEMS: usize = 24;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "catalog_items_total",
            "Items normalized from source payloads."
        );
        describe_counter!(
            "catalog_source_errors_total",
            "Per-source fetch/parse failures during aggregation."
        );
        describe_counter!(
            "catalog_detail_fallback_total",
            "Listing stubs kept because their detail call failed."
        );
        describe_histogram!("catalog_parse_ms", "Source payload parse time in milliseconds.");
        describe_histogram!(
            "catalog_aggregate_ms",
            "Wall time of one full fan-out in milliseconds."
        );
    });
}

/// A validated search term. The only way to get one is through `parse`,
/// so every upstream call sees a trimmed, long-enough term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    term: String,
}

impl SearchQuery {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let term = raw.trim();
        if term.chars().count() < MIN_QUERY_LEN {
            return Err(ValidationError::QueryTooShort { min: MIN_QUERY_LEN });
        }
        Ok(Self {
            term: term.to_string(),
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }
}

/// Fans one request out to every configured source and merges whatever
/// came back. A failing source costs its own items only; the reason lands
/// in `source_errors` and the rest of the response is unaffected.
pub struct Aggregator {
    sources: Vec<Arc<dyn CatalogSource>>,
    max_items: usize,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn CatalogSource>>, max_items: usize) -> Self {
        Self { sources, max_items }
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    pub async fn search(&self, query: &SearchQuery) -> AggregationResult {
        self.fan_out(Some(query.term().to_string())).await
    }

    pub async fn featured(&self) -> AggregationResult {
        self.fan_out(None).await
    }

    /// Look one item up on the source that owns it. A source we do not
    /// serve cannot have the item.
    pub async fn detail(
        &self,
        source: SourceId,
        external_id: &str,
    ) -> Result<Option<CatalogItem>, SourceError> {
        match self.sources.iter().find(|s| s.id() == source) {
            Some(s) => s.detail(external_id).await,
            None => Ok(None),
        }
    }

    /// `term` selects the operation: `Some` searches, `None` lists featured.
    ///
    /// Results are kept in configured source order regardless of task
    /// completion order; a panicked task is charged to its source like any
    /// other failure.
    async fn fan_out(&self, term: Option<String>) -> AggregationResult {
        ensure_metrics_described();
        let t0 = std::time::Instant::now();

        let mut tasks = JoinSet::new();
        for (idx, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let term = term.clone();
            tasks.spawn(async move {
                let outcome = match term.as_deref() {
                    Some(t) => source.search(t).await,
                    None => source.featured().await,
                };
                (idx, outcome)
            });
        }

        let mut slots: Vec<Option<Result<Vec<CatalogItem>, SourceError>>> =
            self.sources.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(e) => {
                    // Slot stays empty; attributed below by position.
                    tracing::warn!(error = ?e, "source task failed");
                }
            }
        }

        let mut items = Vec::new();
        let mut source_errors = BTreeMap::new();
        for (idx, slot) in slots.into_iter().enumerate() {
            let source_id = self.sources[idx].id();
            match slot {
                Some(Ok(batch)) => items.extend(batch),
                Some(Err(e)) => {
                    tracing::warn!(source = %source_id, error = %e, "source failed");
                    counter!("catalog_source_errors_total", "source" => source_id.as_str())
                        .increment(1);
                    source_errors.insert(source_id, e.to_string());
                }
                None => {
                    counter!("catalog_source_errors_total", "source" => source_id.as_str())
                        .increment(1);
                    source_errors.insert(source_id, "source task failed".to_string());
                }
            }
        }

        items.truncate(self.max_items);
        let stats = Stats::compute(&items);

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("catalog_aggregate_ms").record(ms);
        tracing::debug!(
            total = stats.total,
            failed_sources = source_errors.len(),
            elapsed_ms = ms,
            "catalog fan-out complete"
        );

        AggregationResult {
            items,
            source_errors,
            stats,
        }
    }
}
