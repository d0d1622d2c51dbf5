// src/view.rs
use std::collections::BTreeMap;

use serde::Serialize;

use crate::auth::UserIdentity;
use crate::catalog::item::{AggregationResult, CatalogItem, Stats};

pub const TITLE_MAX_CHARS: usize = 60;
pub const CREATOR_MAX_CHARS: usize = 40;

/// Char-boundary truncation; the ellipsis counts toward `max`.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Render minor units per currency: RUB in local convention, USD in its
/// own, anything else as `"major.minor CODE"`.
pub fn format_minor_units(minor: u64, currency: &str) -> String {
    let major = minor / 100;
    let cents = minor % 100;
    match currency.to_ascii_uppercase().as_str() {
        "RUB" => format!("{},{cents:02} ₽", group_thousands(major)),
        "USD" => format!("${major}.{cents:02}"),
        other => format!("{major}.{cents:02} {other}"),
    }
}

/// Display discount in whole percents; only meaningful cuts count.
fn discount_percent(previous: Option<u64>, current: Option<u64>) -> Option<u8> {
    let prev = previous?;
    let cur = current?;
    if prev == 0 || prev <= cur {
        return None;
    }
    let pct = ((prev - cur) as f64 / prev as f64 * 100.0).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub creator: String,
    pub category: String,
    pub price: Option<String>,
    pub previous_price: Option<String>,
    pub discount_percent: Option<u8>,
    pub rating_average: Option<f32>,
    pub rating_count: u64,
    pub badges: Vec<String>,
    pub detail_url: String,
}

impl ItemView {
    fn from_item(item: &CatalogItem) -> Self {
        Self {
            source: item.source.to_string(),
            external_id: item.external_id.clone(),
            title: truncate_chars(&item.title, TITLE_MAX_CHARS),
            creator: truncate_chars(&item.creator, CREATOR_MAX_CHARS),
            category: item.category.as_str().to_string(),
            price: item
                .price_minor_units
                .map(|p| format_minor_units(p, &item.currency)),
            previous_price: item
                .previous_price_minor_units
                .map(|p| format_minor_units(p, &item.currency)),
            discount_percent: discount_percent(
                item.previous_price_minor_units,
                item.price_minor_units,
            ),
            rating_average: item.rating_average,
            rating_count: item.rating_count,
            badges: item.badges.iter().map(|b| b.as_str().to_string()).collect(),
            detail_url: item.detail_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub total: usize,
    pub per_source: BTreeMap<String, usize>,
    pub mean_price: String,
    pub mean_rating: String,
}

impl StatsView {
    /// Formats only; the numbers were fixed by the aggregator.
    fn from_stats(stats: &Stats) -> Self {
        Self {
            total: stats.total,
            per_source: stats
                .per_source
                .iter()
                .map(|(source, n)| (source.to_string(), *n))
                .collect(),
            mean_price: stats
                .mean_price_minor_units
                .map(|v| format!("{:.2}", v / 100.0))
                .unwrap_or_else(|| "n/a".to_string()),
            mean_rating: stats
                .mean_rating
                .map(|v| format!("{v:.1}"))
                .unwrap_or_else(|| "n/a".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub user: Option<UserIdentity>,
    pub items: Vec<ItemView>,
    pub errors: BTreeMap<String, String>,
    pub stats: StatsView,
}

/// Shape one aggregation response for rendering.
pub fn present(result: &AggregationResult, user: Option<UserIdentity>) -> PageView {
    PageView {
        user,
        items: result.items.iter().map(ItemView::from_item).collect(),
        errors: result
            .source_errors
            .iter()
            .map(|(source, reason)| (source.to_string(), reason.clone()))
            .collect(),
        stats: StatsView::from_stats(&result.stats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::item::{Badge, Category, SourceId};
    use std::collections::BTreeSet;

    #[test]
    fn truncation_respects_char_boundaries() {
        let short = "Метро 2033";
        assert_eq!(truncate_chars(short, 60), short);

        let long = "а".repeat(61);
        let cut = truncate_chars(&long, 60);
        assert_eq!(cut.chars().count(), 60);
        assert!(cut.ends_with('…'));

        let exact = "b".repeat(60);
        assert_eq!(truncate_chars(&exact, 60), exact, "no ellipsis at the limit");
    }

    #[test]
    fn price_formats_per_currency() {
        assert_eq!(format_minor_units(199_900, "RUB"), "1 999,00 ₽");
        assert_eq!(format_minor_units(50, "RUB"), "0,50 ₽");
        assert_eq!(format_minor_units(123_456_700, "RUB"), "1 234 567,00 ₽");
        assert_eq!(format_minor_units(1999, "USD"), "$19.99");
        assert_eq!(format_minor_units(1999, "EUR"), "19.99 EUR");
        assert_eq!(format_minor_units(0, "RUB"), "0,00 ₽");
    }

    #[test]
    fn discount_is_whole_percent_of_previous() {
        assert_eq!(discount_percent(Some(39950), Some(19900)), Some(50));
        assert_eq!(discount_percent(Some(1000), Some(1000)), None);
        assert_eq!(discount_percent(Some(1000), None), None);
        assert_eq!(discount_percent(None, Some(1000)), None);
        assert_eq!(discount_percent(Some(0), Some(0)), None);
    }

    #[test]
    fn page_view_formats_without_recomputing() {
        let mut badges = BTreeSet::new();
        badges.insert(Badge::Discount);
        let item = CatalogItem {
            source: SourceId::Litres,
            external_id: "1".to_string(),
            title: "т".repeat(80),
            creator: "Автор".to_string(),
            category: Category::Audiobook,
            price_minor_units: Some(19900),
            previous_price_minor_units: Some(39950),
            rating_average: Some(4.8),
            rating_count: 12,
            badges,
            detail_url: "https://www.litres.ru/art/1".to_string(),
            currency: "RUB".to_string(),
        };
        let result = AggregationResult {
            items: vec![item],
            source_errors: BTreeMap::new(),
            stats: Stats {
                total: 1,
                per_source: [(SourceId::Litres, 1)].into_iter().collect(),
                mean_price_minor_units: Some(19900.0),
                mean_rating: None,
            },
        };

        let page = present(&result, None);
        let v = &page.items[0];
        assert_eq!(v.source, "litres");
        assert_eq!(v.category, "audiobook");
        assert_eq!(v.title.chars().count(), 60);
        assert_eq!(v.price.as_deref(), Some("199,00 ₽"));
        assert_eq!(v.previous_price.as_deref(), Some("399,50 ₽"));
        assert_eq!(v.discount_percent, Some(50));
        assert_eq!(v.badges, vec!["discount".to_string()]);

        assert_eq!(page.stats.mean_price, "199.00");
        assert_eq!(page.stats.mean_rating, "n/a");
        assert_eq!(page.stats.per_source.get("litres"), Some(&1));
        assert!(page.user.is_none());
    }
}
