// tests/metrics_http.rs
//
// End-to-end check of the Prometheus surface: install the recorder, drive
// one search with a failing source, then scrape /metrics.
//
// The recorder is process-global, so this file holds exactly one test.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt as _; // for `oneshot`

use pricewatch::api::{create_router, AppState};
use pricewatch::auth::SessionTable;
use pricewatch::catalog::error::SourceError;
use pricewatch::catalog::item::{CatalogItem, Category, SourceId};
use pricewatch::catalog::sources::CatalogSource;
use pricewatch::catalog::Aggregator;
use pricewatch::config::RatesConfig;
use pricewatch::metrics::Metrics;
use pricewatch::rates::RatesClient;
use pricewatch::wishlist::MemoryWishlist;

const BODY_LIMIT: usize = 1 * 1024 * 1024; // 1MB, safe for tests

struct OneItemSource;

#[async_trait]
impl CatalogSource for OneItemSource {
    fn id(&self) -> SourceId {
        SourceId::Steam
    }
    async fn search(&self, _term: &str) -> Result<Vec<CatalogItem>, SourceError> {
        Ok(vec![CatalogItem {
            source: SourceId::Steam,
            external_id: "1".to_string(),
            title: "one".to_string(),
            creator: "someone".to_string(),
            category: Category::Game,
            price_minor_units: Some(1000),
            previous_price_minor_units: None,
            rating_average: None,
            rating_count: 0,
            badges: BTreeSet::new(),
            detail_url: "https://example.test/1".to_string(),
            currency: "RUB".to_string(),
        }])
    }
    async fn featured(&self) -> Result<Vec<CatalogItem>, SourceError> {
        self.search("").await
    }
    async fn detail(&self, _external_id: &str) -> Result<Option<CatalogItem>, SourceError> {
        Ok(None)
    }
}

struct DownSource;

#[async_trait]
impl CatalogSource for DownSource {
    fn id(&self) -> SourceId {
        SourceId::Litres
    }
    async fn search(&self, _term: &str) -> Result<Vec<CatalogItem>, SourceError> {
        Err(SourceError::Transport("request timed out: test".to_string()))
    }
    async fn featured(&self) -> Result<Vec<CatalogItem>, SourceError> {
        Err(SourceError::Transport("request timed out: test".to_string()))
    }
    async fn detail(&self, _external_id: &str) -> Result<Option<CatalogItem>, SourceError> {
        Err(SourceError::Transport("request timed out: test".to_string()))
    }
}

#[tokio::test]
async fn scrape_reflects_gauge_timings_and_source_errors() {
    let metrics = Metrics::init(2);

    let state = AppState {
        aggregator: Arc::new(Aggregator::new(
            vec![Arc::new(OneItemSource), Arc::new(DownSource)],
            24,
        )),
        rates: Arc::new(
            RatesClient::new(RatesConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                timeout_secs: 1,
            })
            .expect("rates client builds"),
        ),
        wishlist: Arc::new(MemoryWishlist::new()),
        identity: Arc::new(SessionTable::new()),
    };
    let app = create_router(state).merge(metrics.router());

    // One aggregation records the timing histogram and one source failure.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/search?query=metrics")
                .body(Body::empty())
                .expect("build search request"),
        )
        .await
        .expect("oneshot search");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/metrics")
                .body(Body::empty())
                .expect("build scrape request"),
        )
        .await
        .expect("oneshot scrape");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read exposition body");
    let text = String::from_utf8(bytes.to_vec()).expect("exposition is utf-8");

    assert!(
        text.contains("catalog_sources_configured 2"),
        "gauge should carry the configured source count:\n{text}"
    );
    assert!(
        text.contains("catalog_aggregate_ms"),
        "aggregation timing histogram should be present:\n{text}"
    );
    assert!(
        text.contains(r#"catalog_source_errors_total{source="litres"}"#),
        "failed source should be counted under its own label:\n{text}"
    );
}
