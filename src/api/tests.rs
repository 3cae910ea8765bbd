//! HTTP contract tests against an in-memory catalogue

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use super::{build_router, AppState};
use crate::cache::create_cache;
use crate::config::Config;
use crate::db::{create_test_pool, migrations};

async fn setup_server_with(config: Config) -> TestServer {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    let cache = create_cache(&config.cache);
    let state = AppState::new(pool, cache, &config).expect("Failed to build state");

    TestServer::new(build_router(state, "*")).expect("Failed to start test server")
}

async fn setup_server() -> TestServer {
    setup_server_with(Config::default()).await
}

async fn create(server: &TestServer, path: &str, body: Value) -> Value {
    let response = server.post(path).json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().expect("response has an id")
}

#[tokio::test]
async fn test_health() {
    let server = setup_server().await;
    let response = server.get("/api/v1/health").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_missing_resources_are_404() {
    let server = setup_server().await;
    for path in [
        "/api/v1/products/999",
        "/api/v1/products/999/price",
        "/api/v1/products/999/availability",
        "/api/v1/products/999/stockrecords/1",
        "/api/v1/stockrecords/999",
        "/api/v1/categories/999",
        "/api/v1/attributes/999",
        "/api/v1/attribute-values/999",
        "/api/v1/images/999",
        "/api/v1/nowhere",
    ] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "GET {}", path);
        assert_eq!(response.json::<Value>()["error"]["code"], "NOT_FOUND", "GET {}", path);
    }
}

#[tokio::test]
async fn test_product_lifecycle() {
    let server = setup_server().await;
    let product = create(
        &server,
        "/api/v1/products",
        json!({"title": "Reading Lamp", "upc": "0001", "description": "Brass"}),
    )
    .await;
    let id = id_of(&product);
    assert_eq!(product["structure"], "standalone");
    assert_eq!(product["slug"], "reading-lamp");
    assert_eq!(product["price"], format!("/api/v1/products/{}/price", id));

    let response = server
        .patch(&format!("/api/v1/products/{}", id))
        .json(&json!({"title": "Desk Lamp"}))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["title"], "Desk Lamp");

    server
        .delete(&format!("/api/v1/products/{}", id))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get(&format!("/api/v1/products/{}", id))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_duplicate_upc_is_conflict() {
    let server = setup_server().await;
    create(&server, "/api/v1/products", json!({"title": "A", "upc": "X1"})).await;

    let response = server
        .post("/api/v1/products")
        .json(&json!({"title": "B", "upc": "X1"}))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_child_requires_parent() {
    let server = setup_server().await;
    let response = server
        .post("/api/v1/products")
        .json(&json!({"structure": "child"}))
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<Value>()["error"]["code"], "VALIDATION_ERROR");

    let standalone = create(&server, "/api/v1/products", json!({"title": "Mug"})).await;
    let response = server
        .post("/api/v1/products")
        .json(&json!({"structure": "child", "parent_id": id_of(&standalone)}))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_structure_filter() {
    let server = setup_server().await;
    let parent = create(
        &server,
        "/api/v1/products",
        json!({"title": "T-shirt", "structure": "parent"}),
    )
    .await;
    create(
        &server,
        "/api/v1/products",
        json!({"structure": "child", "parent_id": id_of(&parent), "upc": "TS-S"}),
    )
    .await;
    create(&server, "/api/v1/products", json!({"title": "Mug"})).await;

    let all = server.get("/api/v1/products").await.json::<Value>();
    assert_eq!(all["total"], 3);

    let parents = server
        .get("/api/v1/products")
        .add_query_param("structure", "parent")
        .await
        .json::<Value>();
    assert_eq!(parents["total"], 1);
    assert_eq!(parents["results"][0]["id"], id_of(&parent));

    let unknown = server
        .get("/api/v1/products")
        .add_query_param("structure", "bundle")
        .await
        .json::<Value>();
    assert_eq!(unknown["total"], 0);
    assert_eq!(unknown["results"], json!([]));
}

#[tokio::test]
async fn test_parent_detail_links_children() {
    let server = setup_server().await;
    let parent = create(
        &server,
        "/api/v1/products",
        json!({"title": "T-shirt", "structure": "parent"}),
    )
    .await;
    let child = create(
        &server,
        "/api/v1/products",
        json!({"structure": "child", "parent_id": id_of(&parent)}),
    )
    .await;
    assert_eq!(child["title"], "T-shirt");
    assert_eq!(child["parent"], format!("/api/v1/products/{}", id_of(&parent)));

    let detail = server
        .get(&format!("/api/v1/products/{}", id_of(&parent)))
        .await
        .json::<Value>();
    assert_eq!(
        detail["children"],
        json!([format!("/api/v1/products/{}", id_of(&child))])
    );
}

#[tokio::test]
async fn test_category_browse() {
    let server = setup_server().await;
    let books = create(&server, "/api/v1/categories", json!({"name": "Books"})).await;
    let fiction = create(
        &server,
        "/api/v1/categories",
        json!({"name": "Fiction", "parent_id": id_of(&books)}),
    )
    .await;
    assert_eq!(fiction["breadcrumbs"], "Books > Fiction");
    create(
        &server,
        "/api/v1/categories",
        json!({"name": "Crime", "parent_id": id_of(&fiction)}),
    )
    .await;

    let roots = server.get("/api/v1/categories").await.json::<Value>();
    assert_eq!(roots.as_array().map(Vec::len), Some(1));
    assert_eq!(roots[0]["slug"], "books");

    let children = server
        .get("/api/v1/categories/browse/books/fiction")
        .await
        .json::<Value>();
    assert_eq!(children.as_array().map(Vec::len), Some(1));
    assert_eq!(children[0]["name"], "Crime");

    server
        .get("/api/v1/categories/browse/books/poetry")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_category_cycle_is_rejected() {
    let server = setup_server().await;
    let books = create(&server, "/api/v1/categories", json!({"name": "Books"})).await;
    let fiction = create(
        &server,
        "/api/v1/categories",
        json!({"name": "Fiction", "parent_id": id_of(&books)}),
    )
    .await;

    server
        .patch(&format!("/api/v1/categories/{}", id_of(&books)))
        .json(&json!({"parent_id": id_of(&fiction)}))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_product_categories_carry_breadcrumbs() {
    let server = setup_server().await;
    let books = create(&server, "/api/v1/categories", json!({"name": "Books"})).await;
    let fiction = create(
        &server,
        "/api/v1/categories",
        json!({"name": "Fiction", "parent_id": id_of(&books)}),
    )
    .await;
    let product = create(
        &server,
        "/api/v1/products",
        json!({"title": "Novel", "category_ids": [id_of(&fiction)]}),
    )
    .await;

    assert_eq!(product["categories"][0]["breadcrumbs"], "Books > Fiction");
}

#[tokio::test]
async fn test_price_and_availability() {
    let server = setup_server_with(Config {
        pricing: crate::config::PricingConfig {
            tax_rate: "0.2".to_string(),
            ..Default::default()
        },
        ..Default::default()
    })
    .await;
    let product = create(&server, "/api/v1/products", json!({"title": "Lamp"})).await;
    let id = id_of(&product);

    let price = server
        .get(&format!("/api/v1/products/{}/price", id))
        .await
        .json::<Value>();
    assert_eq!(price["exists"], false);
    let availability = server
        .get(&format!("/api/v1/products/{}/availability", id))
        .await
        .json::<Value>();
    assert_eq!(availability["is_available_to_buy"], false);
    assert_eq!(availability["code"], "unavailable");

    create(
        &server,
        "/api/v1/stockrecords",
        json!({
            "product_id": id,
            "partner": "acme",
            "partner_sku": "LAMP-1",
            "price": "10.00",
            "num_in_stock": 5,
            "num_allocated": 2
        }),
    )
    .await;

    let price = server
        .get(&format!("/api/v1/products/{}/price", id))
        .add_header(
            HeaderName::from_static("x-customer-id"),
            HeaderValue::from_static("42"),
        )
        .await
        .json::<Value>();
    assert_eq!(price["exists"], true);
    assert_eq!(price["currency"], "GBP");
    assert_eq!(price["excl_tax"], "10.00");
    assert_eq!(price["tax"], "2.00");
    assert_eq!(price["incl_tax"], "12.00");
    assert_eq!(price["is_tax_known"], true);

    let availability = server
        .get(&format!("/api/v1/products/{}/availability", id))
        .await
        .json::<Value>();
    assert_eq!(availability["is_available_to_buy"], true);
    assert_eq!(availability["num_available"], 3);
    assert_eq!(availability["code"], "instock");
    assert_eq!(availability["message"], "In stock (3 available)");
}

#[tokio::test]
async fn test_product_stockrecords() {
    let server = setup_server().await;
    let lamp = create(&server, "/api/v1/products", json!({"title": "Lamp"})).await;
    let mug = create(&server, "/api/v1/products", json!({"title": "Mug"})).await;
    let record = create(
        &server,
        "/api/v1/stockrecords",
        json!({"product_id": id_of(&lamp), "partner": "acme", "partner_sku": "L1", "price": 5}),
    )
    .await;

    let records = server
        .get(&format!("/api/v1/products/{}/stockrecords", id_of(&lamp)))
        .await
        .json::<Value>();
    assert_eq!(records.as_array().map(Vec::len), Some(1));

    server
        .get(&format!(
            "/api/v1/products/{}/stockrecords/{}",
            id_of(&lamp),
            id_of(&record)
        ))
        .await
        .assert_status_ok();
    server
        .get(&format!(
            "/api/v1/products/{}/stockrecords/{}",
            id_of(&mug),
            id_of(&record)
        ))
        .await
        .assert_status_not_found();

    let empty = server
        .get("/api/v1/products/999/stockrecords")
        .await
        .json::<Value>();
    assert_eq!(empty, json!([]));
}

#[tokio::test]
async fn test_duplicate_partner_sku_is_conflict() {
    let server = setup_server().await;
    let lamp = create(&server, "/api/v1/products", json!({"title": "Lamp"})).await;
    let body = json!({"product_id": id_of(&lamp), "partner": "acme", "partner_sku": "L1"});
    create(&server, "/api/v1/stockrecords", body.clone()).await;

    server
        .post("/api/v1/stockrecords")
        .json(&body)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_configured_currency_is_normalized() {
    let server = setup_server_with(Config {
        pricing: crate::config::PricingConfig {
            default_currency: " gbp ".to_string(),
            ..Default::default()
        },
        ..Default::default()
    })
    .await;
    let lamp = create(&server, "/api/v1/products", json!({"title": "Lamp"})).await;
    let record = create(
        &server,
        "/api/v1/stockrecords",
        json!({"product_id": id_of(&lamp), "partner": "acme", "partner_sku": "L1"}),
    )
    .await;
    assert_eq!(record["price_currency"], "GBP");
}

#[tokio::test]
async fn test_invalid_configured_currency_fails_startup() {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    let config = Config {
        pricing: crate::config::PricingConfig {
            default_currency: "pounds".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let result = AppState::new(pool, create_cache(&config.cache), &config);
    let error = result.err().expect("state must not build");
    assert!(format!("{:#}", error).contains("pounds"));
}

#[tokio::test]
async fn test_attribute_values_follow_type() {
    let server = setup_server().await;
    let lamp = create(&server, "/api/v1/products", json!({"title": "Lamp"})).await;
    let weight = create(
        &server,
        "/api/v1/attributes",
        json!({"name": "Weight", "code": "weight", "type": "integer"}),
    )
    .await;

    server
        .post("/api/v1/attribute-values")
        .json(&json!({"product_id": id_of(&lamp), "attribute_id": id_of(&weight), "value": "heavy"}))
        .await
        .assert_status_bad_request();

    create(
        &server,
        "/api/v1/attribute-values",
        json!({"product_id": id_of(&lamp), "attribute_id": id_of(&weight), "value": 3}),
    )
    .await;

    let values = server
        .get("/api/v1/attribute-values")
        .add_query_param("product", id_of(&lamp))
        .await
        .json::<Value>();
    assert_eq!(values.as_array().map(Vec::len), Some(1));
    assert_eq!(values[0]["value"], 3);

    let detail = server
        .get(&format!("/api/v1/products/{}", id_of(&lamp)))
        .await
        .json::<Value>();
    assert_eq!(detail["attributes"][0]["code"], "weight");
}

#[tokio::test]
async fn test_images_filter_by_product() {
    let server = setup_server().await;
    let lamp = create(&server, "/api/v1/products", json!({"title": "Lamp"})).await;
    let mug = create(&server, "/api/v1/products", json!({"title": "Mug"})).await;
    create(
        &server,
        "/api/v1/images",
        json!({"product_id": id_of(&lamp), "original": "images/lamp.jpg"}),
    )
    .await;
    create(
        &server,
        "/api/v1/images",
        json!({"product_id": id_of(&mug), "original": "images/mug.jpg"}),
    )
    .await;

    let all = server.get("/api/v1/images").await.json::<Value>();
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    let lamp_images = server
        .get("/api/v1/images")
        .add_query_param("product", id_of(&lamp))
        .await
        .json::<Value>();
    assert_eq!(lamp_images.as_array().map(Vec::len), Some(1));
    assert_eq!(lamp_images[0]["original"], "images/lamp.jpg");

    server
        .post("/api/v1/images")
        .json(&json!({"product_id": id_of(&lamp), "original": ""}))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_malformed_requests_are_400() {
    let server = setup_server().await;

    let response = server
        .post("/api/v1/products")
        .bytes(b"{\"title\": ".as_slice().into())
        .content_type("application/json")
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<Value>()["error"]["code"], "VALIDATION_ERROR");

    server
        .get("/api/v1/products/not-a-number")
        .await
        .assert_status_bad_request();
}
