// tests/sources_litres.rs
use pricewatch::catalog::item::{Badge, Category, SourceId, UNKNOWN_CREATOR};
use pricewatch::catalog::sources::litres::LitresSource;
use pricewatch::config::LitresConfig;

const ARTS_BODY: &str = include_str!("fixtures/litres_arts.json");
const DETAIL_BODY: &str = include_str!("fixtures/litres_art_detail.json");

fn source() -> LitresSource {
    let cfg = LitresConfig {
        session_cookie: String::new(),
        ..LitresConfig::default()
    };
    LitresSource::new(cfg).expect("client builds")
}

fn source_with_cap(max_results: usize) -> LitresSource {
    let cfg = LitresConfig {
        session_cookie: String::new(),
        max_results,
        ..LitresConfig::default()
    };
    LitresSource::new(cfg).expect("client builds")
}

#[test]
fn arts_fixture_maps_books_and_audiobooks() {
    let items = source().normalize_list_body(ARTS_BODY).expect("fixture parses");
    assert_eq!(items.len(), 3);

    let master = &items[0];
    assert_eq!(master.source, SourceId::Litres);
    assert_eq!(master.external_id, "69428701");
    assert_eq!(master.category, Category::Book);
    assert_eq!(master.title, "Мастер и Маргарита");
    assert_eq!(master.creator, "Михаил Булгаков");
    assert_eq!(master.price_minor_units, Some(24900), "rubles become kopeks");
    assert_eq!(
        master.previous_price_minor_units, None,
        "full price equal to final price is not a discount"
    );
    assert_eq!(master.rating_average, Some(4.9));
    assert_eq!(master.rating_count, 20412);
    assert!(master.badges.contains(&Badge::Bestseller));
    assert_eq!(
        master.detail_url,
        "https://www.litres.ru/book/mihail-bulgakov/master-i-margarita-69428701/"
    );
    assert_eq!(master.currency, "RUB");

    let three_body = &items[1];
    assert_eq!(three_body.category, Category::Audiobook);
    assert_eq!(
        three_body.creator, "Лю Цысинь",
        "the author-roled person wins over the narrator listed first"
    );
    assert_eq!(three_body.price_minor_units, Some(29950));
    assert_eq!(three_body.previous_price_minor_units, Some(59900));
    assert!(three_body.badges.contains(&Badge::Discount));
    assert!(three_body.badges.contains(&Badge::New));

    let quiet = &items[2];
    assert_eq!(quiet.creator, UNKNOWN_CREATOR, "no persons means the sentinel");
    assert_eq!(quiet.price_minor_units, Some(0));
    assert_eq!(quiet.rating_average, None, "zero votes hide the average");
    assert_eq!(
        quiet.detail_url, "https://www.litres.ru/art/71102203",
        "missing url falls back to an id link"
    );
}

#[test]
fn arts_fixture_respects_result_cap() {
    let items = source_with_cap(2)
        .normalize_list_body(ARTS_BODY)
        .expect("fixture parses");
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].external_id, "70834552");
}

#[test]
fn detail_fixture_maps_a_single_art() {
    let item = source()
        .normalize_detail_body(DETAIL_BODY)
        .expect("fixture parses")
        .expect("data present yields an item");
    assert_eq!(item.external_id, "69428701");
    assert_eq!(item.creator, "Михаил Булгаков");
    assert_eq!(item.rating_count, 20412);
    assert!(item.badges.contains(&Badge::Bestseller));
}
