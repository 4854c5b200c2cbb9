//! End-to-end sync passes against a wiremock PrestaShop fixture and the
//! in-memory catalog store.
//!
//! The fixture store: categories 3 (Shoes) and 4 (Hats); product 19, a
//! configurable shirt with Color/Size options and combinations 101
//! ("Red - L") and 102 ("Red - XL"); product 20, a simple mug. Variations on
//! the fixture (combination removed, degradation to simple, handle
//! conflicts) are mounted per test.

use prestasync_client::PrestashopClient;
use prestasync_core::catalog::{
    MoneyAmount, NewProduct, NewVariant, ProductMetadata, ProductStatus, StoreDefaults,
    VariantMetadata,
};
use prestasync_core::store::CatalogStore;
use prestasync_store::{MemoryCatalog, MemoryFiles};
use prestasync_sync::{ConfigurationError, Importer, SyncError, SyncOptions, SyncSummary};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

fn test_client(server: &MockServer) -> PrestashopClient {
    PrestashopClient::new(&server.uri(), "test-key", 30, 0, 0)
        .expect("client construction should not fail")
}

async fn run_pass(
    client: &PrestashopClient,
    store: &MemoryCatalog,
    files: &MemoryFiles,
) -> SyncSummary {
    let importer = Importer::new(client, store, files, SyncOptions::default());
    importer
        .run_full_sync()
        .await
        .expect("sync pass should succeed")
}

async fn mount_json(server: &MockServer, url_path: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(server)
        .await;
}

async fn mount_standard_categories(server: &MockServer) {
    mount_json(
        server,
        "/api/categories",
        serde_json::json!({ "categories": [{ "id": 3 }, { "id": 4 }] }),
    )
    .await;
    mount_json(
        server,
        "/api/categories/3",
        serde_json::json!({
            "categories": [{ "id": 3, "name": "Shoes", "link_rewrite": "shoes", "active": "1" }]
        }),
    )
    .await;
    mount_json(
        server,
        "/api/categories/4",
        serde_json::json!({
            "categories": [{
                "id": 4,
                "name": { "value": "Hats" },
                "link_rewrite": { "value": "hats" },
                "active": "1"
            }]
        }),
    )
    .await;
}

async fn mount_no_categories(server: &MockServer) {
    mount_json(
        server,
        "/api/categories",
        serde_json::json!({ "categories": [] }),
    )
    .await;
}

async fn mount_products_list(server: &MockServer, ids: &[i64]) {
    let products: Vec<_> = ids.iter().map(|id| serde_json::json!({ "id": id })).collect();
    mount_json(
        server,
        "/api/products",
        serde_json::json!({ "products": products }),
    )
    .await;
}

async fn mount_options(server: &MockServer) {
    mount_json(
        server,
        "/api/product_options/2",
        serde_json::json!({
            "product_options": [{
                "id": 2,
                "name": "Color",
                "associations": { "product_option_values": [{ "id": "7" }, { "id": "8" }] }
            }]
        }),
    )
    .await;
    mount_json(
        server,
        "/api/product_options/5",
        serde_json::json!({
            "product_options": [{
                "id": 5,
                "name": "Size",
                "associations": { "product_option_values": [{ "id": "12" }, { "id": "13" }] }
            }]
        }),
    )
    .await;

    for (id, group, name) in [(7, "2", "Red"), (12, "5", "L"), (13, "5", "XL")] {
        mount_json(
            server,
            &format!("/api/product_option_values/{id}"),
            serde_json::json!({
                "product_option_values": [{
                    "id": id,
                    "id_attribute_group": group,
                    "name": name
                }]
            }),
        )
        .await;
    }
}

async fn mount_stock(server: &MockServer, id: i64, quantity: &str, out_of_stock: &str) {
    mount_json(
        server,
        &format!("/api/stock_availables/{id}"),
        serde_json::json!({
            "stock_availables": [{
                "id": id,
                "id_product": "19",
                "id_product_attribute": "0",
                "quantity": quantity,
                "out_of_stock": out_of_stock
            }]
        }),
    )
    .await;
}

async fn mount_combination(
    server: &MockServer,
    id: i64,
    reference: &str,
    price: &str,
    value_ids: &[i64],
) {
    let values: Vec<_> = value_ids
        .iter()
        .map(|v| serde_json::json!({ "id": v.to_string() }))
        .collect();
    mount_json(
        server,
        &format!("/api/combinations/{id}"),
        serde_json::json!({
            "combinations": [{
                "id": id,
                "reference": reference,
                "price": price,
                "associations": { "product_option_values": values }
            }]
        }),
    )
    .await;
}

/// Product 19 in configurable shape: parameterized over which combinations,
/// option values, and stock rows the source currently lists.
async fn mount_product_19(
    server: &MockServer,
    combinations: &[i64],
    option_values: &[i64],
    stock: &[(i64, i64)],
) {
    let combos: Vec<_> = combinations
        .iter()
        .map(|id| serde_json::json!({ "id": id.to_string() }))
        .collect();
    let values: Vec<_> = option_values
        .iter()
        .map(|id| serde_json::json!({ "id": id.to_string() }))
        .collect();
    let stock_rows: Vec<_> = stock
        .iter()
        .map(|(id, attribute)| {
            serde_json::json!({
                "id": id.to_string(),
                "id_product_attribute": attribute.to_string()
            })
        })
        .collect();

    mount_json(
        server,
        "/api/products/19",
        serde_json::json!({
            "products": [{
                "id": 19,
                "name": "Classic Shirt",
                "link_rewrite": "classic-shirt",
                "description": "A shirt.",
                "description_short": "Shirt",
                "reference": "REF-19",
                "price": "19.990000",
                "active": "1",
                "weight": "0.5",
                "height": "2",
                "width": "30",
                "depth": "40",
                "associations": {
                    "categories": [{ "id": "3" }],
                    "stock_availables": stock_rows,
                    "product_option_values": values,
                    "combinations": combos
                }
            }]
        }),
    )
    .await;
}

async fn mount_product_20(server: &MockServer) {
    mount_json(
        server,
        "/api/products/20",
        serde_json::json!({
            "products": [{
                "id": 20,
                "name": { "value": "Mug" },
                "link_rewrite": "mug",
                "reference": "REF-20",
                "price": "9.99",
                "active": "1",
                "associations": {
                    "categories": [{ "id": "4" }],
                    "stock_availables": [{ "id": "50", "id_product_attribute": "0" }]
                }
            }]
        }),
    )
    .await;
}

/// The full standard fixture: both categories, both products, all
/// combinations, options, and stock records.
async fn mount_standard_shop(server: &MockServer) {
    mount_standard_categories(server).await;
    mount_products_list(server, &[19, 20]).await;
    mount_product_19(
        server,
        &[101, 102],
        &[7, 12, 13],
        &[(40, 0), (41, 101), (42, 102)],
    )
    .await;
    mount_product_20(server).await;
    mount_options(server).await;
    mount_combination(server, 101, "REF-19-RED-L", "5.00", &[7, 12]).await;
    mount_combination(server, 102, "REF-19-RED-XL", "7.50", &[7, 13]).await;
    mount_stock(server, 40, "10", "0").await;
    mount_stock(server, 41, "4", "0").await;
    mount_stock(server, 42, "0", "1").await;
    mount_stock(server, 50, "12", "2").await;
}

// ---------------------------------------------------------------------------
// Full pass
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_pass_creates_collections_and_products() {
    let server = MockServer::start().await;
    mount_standard_shop(&server).await;

    let client = test_client(&server);
    let store = MemoryCatalog::with_default_store();
    let files = MemoryFiles::new();

    let summary = run_pass(&client, &store, &files).await;
    assert_eq!(summary.categories_processed, 2);
    assert_eq!(summary.products_processed, 2);
    assert_eq!(summary.report.collections_created, 2);
    assert_eq!(summary.report.products_created, 2);
    assert!(summary.report.write_failures.is_empty());

    // Collections: both name shapes unwrap to plain titles.
    let collections = store.collections();
    assert_eq!(collections.len(), 2);
    let shoes = collections
        .iter()
        .find(|c| c.handle == "shoes")
        .expect("shoes collection");
    assert_eq!(shoes.title, "Shoes");
    assert_eq!(shoes.metadata.prestashop_id, 3);
    let hats = collections
        .iter()
        .find(|c| c.handle == "hats")
        .expect("hats collection");
    assert_eq!(hats.title, "Hats");

    let products = store.products();
    assert_eq!(products.len(), 2);

    // Configurable shirt.
    let shirt = products
        .iter()
        .find(|p| p.external_id == 19)
        .expect("shirt product");
    assert_eq!(shirt.handle, "classic-shirt");
    assert_eq!(shirt.status, ProductStatus::Published);
    assert_eq!(shirt.weight, 50);
    assert_eq!(shirt.length, 40);
    assert_eq!(shirt.collection_id, Some(shoes.id));
    assert_eq!(shirt.profile_id.as_deref(), Some("sp_default"));
    assert_eq!(shirt.metadata.reference, "REF-19");

    let option_titles: Vec<_> = shirt.options.iter().map(|o| o.title.as_str()).collect();
    assert_eq!(option_titles, vec!["Color", "Size"]);

    assert_eq!(shirt.variants.len(), 2);
    let red_l = shirt
        .variant_by_source_id(101)
        .expect("variant for combination 101");
    assert_eq!(red_l.title, "Red - L");
    assert_eq!(red_l.sku.as_deref(), Some("REF-19-RED-L"));
    assert_eq!(red_l.prices, vec![MoneyAmount { currency_code: "usd".into(), amount: 2499 }]);
    assert_eq!(red_l.inventory_quantity, 4);
    assert!(!red_l.allow_backorder);
    assert!(red_l.manage_inventory);
    assert_eq!(red_l.options.len(), 2);
    assert_eq!(red_l.options[0].value, "Red");
    assert_eq!(red_l.options[1].value, "L");

    let red_xl = shirt
        .variant_by_source_id(102)
        .expect("variant for combination 102");
    assert_eq!(red_xl.title, "Red - XL");
    assert_eq!(red_xl.prices[0].amount, 2749);
    assert_eq!(red_xl.inventory_quantity, 0);
    assert!(red_xl.allow_backorder);
    assert!(!red_xl.manage_inventory);

    // Simple mug.
    let mug = products
        .iter()
        .find(|p| p.external_id == 20)
        .expect("mug product");
    assert_eq!(mug.title, "Mug");
    assert_eq!(mug.collection_id, Some(hats.id));
    assert!(mug.options.is_empty());
    assert_eq!(mug.variants.len(), 1);
    let default = &mug.variants[0];
    assert_eq!(default.title, "Default");
    assert_eq!(default.sku.as_deref(), Some("REF-20"));
    assert_eq!(default.prices[0].amount, 999);
    assert_eq!(default.inventory_quantity, 12);
    assert!(default.allow_backorder, "out_of_stock=2 defers to allow");

    let watermark = store.get_sync_watermark().await.expect("watermark read");
    assert!(watermark.is_some(), "completed pass records a watermark");
}

#[tokio::test]
async fn second_pass_with_unchanged_source_issues_no_writes() {
    let server = MockServer::start().await;
    mount_standard_shop(&server).await;

    let client = test_client(&server);
    let store = MemoryCatalog::with_default_store();
    let files = MemoryFiles::new();

    run_pass(&client, &store, &files).await;
    let writes_after_first = store.write_count();
    assert!(writes_after_first > 0);

    let summary = run_pass(&client, &store, &files).await;
    assert_eq!(
        store.write_count(),
        writes_after_first,
        "an unchanged source must produce an empty change set everywhere"
    );
    assert_eq!(summary.report.products_updated, 2);
    assert_eq!(summary.report.collections_updated, 0);
}

#[tokio::test]
async fn identity_is_stable_across_passes() {
    let server = MockServer::start().await;
    mount_standard_shop(&server).await;

    let client = test_client(&server);
    let store = MemoryCatalog::with_default_store();
    let files = MemoryFiles::new();

    run_pass(&client, &store, &files).await;
    run_pass(&client, &store, &files).await;
    run_pass(&client, &store, &files).await;

    let products = store.products();
    assert_eq!(products.len(), 2, "no duplicate products across passes");
    assert_eq!(store.collections().len(), 2, "no duplicate collections");
    assert_eq!(
        products
            .iter()
            .find(|p| p.external_id == 19)
            .map(|p| p.variants.len()),
        Some(2),
        "no duplicate variants across passes"
    );
}

// ---------------------------------------------------------------------------
// Variant deletion and degradation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn variant_is_deleted_when_combination_disappears() {
    let server_before = MockServer::start().await;
    mount_standard_shop(&server_before).await;

    let store = MemoryCatalog::with_default_store();
    let files = MemoryFiles::new();
    run_pass(&test_client(&server_before), &store, &files).await;

    // Same shop, but combination 102 is gone: it drops off the product's
    // association list and its endpoint now answers 404.
    let server_after = MockServer::start().await;
    mount_standard_categories(&server_after).await;
    mount_products_list(&server_after, &[19, 20]).await;
    mount_product_19(&server_after, &[101], &[7, 12], &[(40, 0), (41, 101)]).await;
    mount_product_20(&server_after).await;
    mount_options(&server_after).await;
    mount_combination(&server_after, 101, "REF-19-RED-L", "5.00", &[7, 12]).await;
    mount_stock(&server_after, 40, "10", "0").await;
    mount_stock(&server_after, 41, "4", "0").await;
    mount_stock(&server_after, 50, "12", "2").await;

    run_pass(&test_client(&server_after), &store, &files).await;

    let products = store.products();
    let shirt = products.iter().find(|p| p.external_id == 19).expect("shirt");
    assert_eq!(shirt.variants.len(), 1);
    assert_eq!(shirt.variants[0].title, "Red - L");
    assert!(shirt.variant_by_source_id(102).is_none());
}

#[tokio::test]
async fn configurable_to_simple_degradation_converges_on_one_default() {
    let server_before = MockServer::start().await;
    mount_standard_shop(&server_before).await;

    let store = MemoryCatalog::with_default_store();
    let files = MemoryFiles::new();
    run_pass(&test_client(&server_before), &store, &files).await;

    // The shirt comes back with no combinations and no option values.
    let server_after = MockServer::start().await;
    mount_standard_categories(&server_after).await;
    mount_products_list(&server_after, &[19, 20]).await;
    mount_product_19(&server_after, &[], &[], &[(40, 0)]).await;
    mount_product_20(&server_after).await;
    mount_stock(&server_after, 40, "10", "0").await;
    mount_stock(&server_after, 50, "12", "2").await;

    let client_after = test_client(&server_after);
    run_pass(&client_after, &store, &files).await;
    run_pass(&client_after, &store, &files).await;

    let products = store.products();
    let shirt = products.iter().find(|p| p.external_id == 19).expect("shirt");
    let defaults: Vec<_> = shirt
        .variants
        .iter()
        .filter(|v| v.title == "Default")
        .collect();
    assert_eq!(defaults.len(), 1, "repeat passes must not stack Defaults");
    assert_eq!(defaults[0].sku.as_deref(), Some("REF-19"));
    assert_eq!(defaults[0].prices[0].amount, 1999);
}

// ---------------------------------------------------------------------------
// Absorption
// ---------------------------------------------------------------------------

#[tokio::test]
async fn standalone_product_is_absorbed_into_matching_variant() {
    // A variant with SKU REF-20 already exists under an unrelated product,
    // as if the mug had been imported standalone earlier.
    let store = MemoryCatalog::with_default_store();
    let parent = store
        .create_product(NewProduct {
            title: "Drinkware Bundle".to_string(),
            subtitle: None,
            description: None,
            handle: "drinkware-bundle".to_string(),
            is_giftcard: false,
            discountable: true,
            weight: 0,
            height: 0,
            length: 0,
            width: 0,
            external_id: 900,
            status: ProductStatus::Published,
            images: vec![],
            options: vec![],
            collection_id: None,
            profile_id: Some("sp_default".to_string()),
            metadata: ProductMetadata {
                prestashop_id: 900,
                reference: "REF-900".to_string(),
                manufacturer_name: None,
                date_upd: None,
                meta_keywords: vec![],
            },
        })
        .await
        .expect("seed parent product");
    store
        .create_variant(
            parent.id,
            NewVariant {
                title: "Mug".to_string(),
                sku: Some("REF-20".to_string()),
                barcode: None,
                ean: None,
                upc: None,
                prices: vec![MoneyAmount {
                    currency_code: "usd".to_string(),
                    amount: 500,
                }],
                inventory_quantity: 1,
                allow_backorder: false,
                manage_inventory: true,
                weight: 0,
                height: 0,
                length: 0,
                width: 0,
                options: vec![],
                metadata: VariantMetadata {
                    prestashop_id: 20,
                    isbn: None,
                    supplier_reference: None,
                    location: None,
                },
            },
        )
        .await
        .expect("seed variant");

    let server = MockServer::start().await;
    mount_no_categories(&server).await;
    mount_products_list(&server, &[20]).await;
    mount_product_20(&server).await;
    mount_stock(&server, 50, "12", "2").await;

    let files = MemoryFiles::new();
    let summary = run_pass(&test_client(&server), &store, &files).await;

    assert_eq!(summary.report.variants_absorbed, 1);
    assert_eq!(summary.report.products_created, 0);

    let products = store.products();
    assert!(
        !products.iter().any(|p| p.external_id == 20),
        "absorbed product must not become a duplicate product"
    );
    let variant = store
        .get_variant_by_sku("REF-20")
        .await
        .expect("lookup")
        .expect("variant still present");
    assert_eq!(variant.prices[0].amount, 999, "prices synced in place");
    assert_eq!(variant.inventory_quantity, 12);
    assert_eq!(variant.title, "Mug", "absorb keeps the existing title");
}

// ---------------------------------------------------------------------------
// Conflicts and failure isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shared_handle_is_a_conflict_not_a_merge() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/api/categories",
        serde_json::json!({ "categories": [{ "id": 3 }, { "id": 4 }] }),
    )
    .await;
    mount_json(
        &server,
        "/api/categories/3",
        serde_json::json!({
            "categories": [{ "id": 3, "name": "Shoes", "link_rewrite": "shoes", "active": "1" }]
        }),
    )
    .await;
    // Different source category, same link_rewrite.
    mount_json(
        &server,
        "/api/categories/4",
        serde_json::json!({
            "categories": [{ "id": 4, "name": "Sneakers", "link_rewrite": "shoes", "active": "1" }]
        }),
    )
    .await;
    mount_products_list(&server, &[]).await;

    let store = MemoryCatalog::with_default_store();
    let files = MemoryFiles::new();
    let summary = run_pass(&test_client(&server), &store, &files).await;

    assert_eq!(summary.categories_processed, 1);
    assert_eq!(summary.report.category_failures.len(), 1);
    assert_eq!(summary.report.category_failures[0].source_id, 4);

    let collections = store.collections();
    assert_eq!(collections.len(), 1, "no second collection, no merge");
    assert_eq!(collections[0].title, "Shoes");
    assert_eq!(collections[0].metadata.prestashop_id, 3);
}

#[tokio::test]
async fn item_failures_are_isolated_and_the_pass_completes() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/api/categories",
        serde_json::json!({ "categories": [{ "id": 3 }, { "id": 4 }] }),
    )
    .await;
    mount_json(
        &server,
        "/api/categories/3",
        serde_json::json!({
            "categories": [{ "id": 3, "name": "Shoes", "link_rewrite": "shoes", "active": "1" }]
        }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/categories/4"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    mount_products_list(&server, &[19, 20]).await;
    Mock::given(method("GET"))
        .and(path("/api/products/19"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_product_20(&server).await;
    mount_stock(&server, 50, "12", "2").await;

    let store = MemoryCatalog::with_default_store();
    let files = MemoryFiles::new();
    let summary = run_pass(&test_client(&server), &store, &files).await;

    assert_eq!(summary.categories_processed, 1);
    assert_eq!(summary.report.category_failures.len(), 1);
    assert_eq!(summary.products_processed, 1);
    assert_eq!(summary.report.product_failures.len(), 1);
    assert_eq!(summary.report.product_failures[0].source_id, 19);

    assert!(store.products().iter().any(|p| p.external_id == 20));
    assert!(summary.should_retry());
}

#[tokio::test]
async fn missing_store_defaults_abort_the_pass() {
    let server = MockServer::start().await;
    let client = test_client(&server);
    let files = MemoryFiles::new();

    let no_currencies = MemoryCatalog::new(StoreDefaults::default());
    let importer = Importer::new(&client, &no_currencies, &files, SyncOptions::default());
    let err = importer.run_full_sync().await.expect_err("must abort");
    assert!(matches!(
        err,
        SyncError::Config(ConfigurationError::MissingCurrencies)
    ));

    let no_profile = MemoryCatalog::new(StoreDefaults {
        currencies: vec!["usd".to_string()],
        shipping_profile_id: None,
    });
    let importer = Importer::new(&client, &no_profile, &files, SyncOptions::default());
    let err = importer.run_full_sync().await.expect_err("must abort");
    assert!(matches!(
        err,
        SyncError::Config(ConfigurationError::MissingShippingProfile)
    ));
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[tokio::test]
async fn product_images_are_mirrored_and_deduped() {
    let server = MockServer::start().await;
    mount_no_categories(&server).await;
    mount_products_list(&server, &[20]).await;
    mount_product_20(&server).await;
    mount_stock(&server, 50, "12", "2").await;

    let uri = server.uri();
    let listing = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<prestashop xmlns:xlink="http://www.w3.org/1999/xlink">
  <image>
    <declination id="25" xlink:href="{uri}/api/images/products/20/25"/>
    <declination id="26" xlink:href="{uri}/api/images/products/20/26"/>
    <declination id="25" xlink:href="{uri}/api/images/products/20/25"/>
  </image>
</prestashop>"#
    );
    Mock::given(method("GET"))
        .and(path("/api/images/products/20"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/images/products/20/25"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 1]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/images/products/20/26"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 2]))
        .mount(&server)
        .await;

    let store = MemoryCatalog::with_default_store();
    let files = MemoryFiles::new();
    let summary = run_pass(&test_client(&server), &store, &files).await;

    assert_eq!(summary.report.write_failures.len(), 0);

    let uploads = files.uploads();
    assert_eq!(uploads.len(), 2, "duplicate declination is uploaded once");
    assert!(uploads.iter().all(|(name, _)| name == "mug.jpeg"));

    let products = store.products();
    let mug = products.iter().find(|p| p.external_id == 20).expect("mug");
    assert_eq!(mug.images.len(), 2);
    assert!(mug.images.iter().all(|url| url.starts_with("memory://uploads/")));
}
