// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod metrics;
pub mod rates;
pub mod view;
pub mod wishlist;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::catalog::item::{AggregationResult, Badge, CatalogItem, Category, SourceId, Stats};
pub use crate::catalog::{Aggregator, SearchQuery, DEFAULT_MAX_ITEMS, MIN_QUERY_LEN};
