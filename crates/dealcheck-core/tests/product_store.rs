use chrono::Utc;
use dealcheck_core::{keys, MonitoredProduct, ProductDraft, ProductStore, SavedProduct, WriteOutcome};
use dealcheck_store::{KeyValueStore, SqliteStore};
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_draft(id: i64, title: &str, price: f64) -> ProductDraft {
    ProductDraft {
        id,
        title: title.to_string(),
        current_price: price,
        original_price: price * 1.4,
        discount: 29.0,
        image: format!("/images/{}.jpg", id),
        category: "Tech".to_string(),
        ai_quality: 92.0,
    }
}

fn open_store(dir: &TempDir) -> (Arc<SqliteStore>, ProductStore) {
    let kv = Arc::new(SqliteStore::open(dir.path().join("store.db")).unwrap());
    let products = ProductStore::new(kv.clone());
    (kv, products)
}

#[test]
fn test_collections_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let (_, products) = open_store(&dir);
        products.save_product(create_test_draft(1, "iPhone 15 Pro Max", 1199.0));
        products.monitor_product(create_test_draft(2, "AirPods Pro 2", 249.0), Some(199.0));
    }

    let (_, products) = open_store(&dir);
    assert!(products.is_product_saved(1));
    assert!(products.is_product_monitored(2));
    assert_eq!(products.monitored_products()[0].target_price, Some(199.0));
}

#[test]
fn test_stored_blob_is_flat_json_array() {
    let dir = TempDir::new().unwrap();
    let (kv, products) = open_store(&dir);

    products.save_product(create_test_draft(1, "X", 100.0));

    let raw = kv.get(keys::SAVED_PRODUCTS).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let items = value.as_array().expect("collection should be a bare array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], 1);
    assert_eq!(items[0]["title"], "X");
    assert!(items[0]["savedAt"].is_string());
}

#[test]
fn test_collection_roundtrip_is_lossless() {
    let dir = TempDir::new().unwrap();
    let (kv, products) = open_store(&dir);

    for id in 1..=3 {
        products.monitor_product(create_test_draft(id, "deal", 10.0 * id as f64), None);
    }
    products.append_price_sample(2, 15.5, Utc::now());

    let original = products.monitored_products();
    let raw = kv.get(keys::MONITORED_PRODUCTS).unwrap().unwrap();
    let reparsed: Vec<MonitoredProduct> = serde_json::from_str(&raw).unwrap();
    assert_eq!(reparsed, original);

    let rewritten = serde_json::to_string(&reparsed).unwrap();
    let again: Vec<MonitoredProduct> = serde_json::from_str(&rewritten).unwrap();
    assert_eq!(again, original);
}

#[test]
fn test_second_save_keeps_original_title() {
    let dir = TempDir::new().unwrap();
    let (_, products) = open_store(&dir);

    assert_eq!(
        products.save_product(create_test_draft(1, "X", 100.0)),
        WriteOutcome::Applied
    );
    assert_eq!(
        products.save_product(create_test_draft(1, "Something else", 100.0)),
        WriteOutcome::Unchanged
    );

    let saved: Vec<SavedProduct> = products.saved_products();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].product.title, "X");
}

#[test]
fn test_last_writer_wins_across_handles() {
    let dir = TempDir::new().unwrap();
    let (_, first) = open_store(&dir);
    let (_, second) = open_store(&dir);

    first.save_product(create_test_draft(1, "from first", 1.0));
    second.save_product(create_test_draft(2, "from second", 2.0));

    // Each write re-reads, so sequential writers see each other
    assert_eq!(first.saved_products().len(), 2);

    second.remove_saved_product(1);
    assert!(!first.is_product_saved(1));
    assert!(first.is_product_saved(2));
}
