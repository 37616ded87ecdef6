mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::ListingBuilder;
use listings_backend::config::Config;
use listings_backend::models::listing::AdTier;
use listings_backend::routes;
use listings_backend::services::count_cache::InMemoryAggregateCache;
use listings_backend::services::fx_service::MemoryExchangeRates;
use listings_backend::services::memory_listing_store::MemoryListingStore;
use listings_backend::AppState;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

fn app() -> (Router, Arc<MemoryListingStore>) {
    let rates = Arc::new(MemoryExchangeRates::new());
    let store = Arc::new(MemoryListingStore::new(rates.clone()));
    let state = AppState::from_parts(
        Config::default(),
        store.clone(),
        rates,
        Arc::new(InMemoryAggregateCache::new()),
    );
    (routes::api_router().with_state(state), store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn draft(title: &str, location: &str) -> JsonValue {
    json!({
        "title": title,
        "company": "Acme",
        "company_email": "jobs@acme.test",
        "location": location,
        "description": "Building Rust services",
        "how_to_apply": "https://acme.test/apply",
        "salary_min": 60000,
        "salary_max": 90000,
        "currency": "EUR"
    })
}

async fn publish(app: &Router, title: &str, location: &str) -> JsonValue {
    let (status, created) = send(app, "POST", "/api/listings", Some(draft(title, location))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();
    let (status, approved) =
        send(app, "POST", &format!("/api/admin/listings/{}/approve", id), None).await;
    assert_eq!(status, StatusCode::OK);
    approved
}

#[tokio::test]
async fn health_and_openapi() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, doc) = send(&app, "GET", "/api/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/listings"].is_object());
}

#[tokio::test]
async fn drafts_stay_hidden_until_approved() {
    let (app, _) = app();
    let (status, created) = send(&app, "POST", "/api/listings", Some(draft("Rust Engineer", "Berlin"))).await;
    assert_eq!(status, StatusCode::CREATED);
    let external_id = created["external_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "GET", &format!("/api/listings/{}", external_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = send(&app, "GET", "/api/listings?l=Berlin", None).await;
    assert_eq!(page["total"], 0);

    let id = created["id"].as_i64().unwrap();
    send(&app, "POST", &format!("/api/admin/listings/{}/approve", id), None).await;
    let (status, listing) = send(&app, "GET", &format!("/api/listings/{}", external_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["view_count"], 1);
    assert!(listing.get("company_email").is_none());
}

#[tokio::test]
async fn invalid_drafts_are_rejected() {
    let (app, _) = app();
    let mut inverted = draft("Rust Engineer", "Berlin");
    inverted["salary_min"] = json!(100000);
    let (status, _) = send(&app, "POST", "/api/listings", Some(inverted)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_email = draft("Rust Engineer", "Berlin");
    bad_email["company_email"] = json!("not-an-email");
    let (status, _) = send(&app, "POST", "/api/listings", Some(bad_email)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn approval_refreshes_cached_counts() {
    let (app, _) = app();
    publish(&app, "Rust Engineer", "Berlin").await;

    let (_, page) = send(&app, "GET", "/api/listings", None).await;
    assert_eq!(page["new_last_week"], 1);
    assert_eq!(page["new_last_month"], 1);

    publish(&app, "Go Engineer", "London").await;
    let (_, page) = send(&app, "GET", "/api/listings", None).await;
    assert_eq!(page["new_last_week"], 2);
    assert_eq!(page["total"], 2);
    assert_eq!(page["page_indexes"], json!([1]));
}

#[tokio::test]
async fn landing_page_shows_pinned_block() {
    let (app, _) = app();
    let pinned = publish(&app, "Rust Engineer", "Berlin").await;
    publish(&app, "Go Engineer", "London").await;

    let (_, page) = send(&app, "GET", "/api/listings", None).await;
    assert_eq!(page["pinned"], json!([]));
    assert_eq!(page["total"], 2);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/admin/listings/{}/tier", pinned["id"]),
        Some(json!({ "tier": "pinned_for_30_days" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, page) = send(&app, "GET", "/api/listings", None).await;
    assert_eq!(page["pinned"].as_array().unwrap().len(), 1);
    assert_eq!(page["pinned"][0]["id"], pinned["id"]);
    let organic: Vec<i64> = page["listings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_i64().unwrap())
        .collect();
    assert_eq!(organic.len(), 1);
    assert!(!organic.contains(&pinned["id"].as_i64().unwrap()));
    assert_eq!(page["total"], 1);
    assert_eq!(page["page_indexes"], json!([1]));

    let (_, filtered) = send(&app, "GET", "/api/listings?l=Berlin", None).await;
    assert_eq!(filtered["pinned"], json!([]));
    assert!(filtered["complementary_remote"].as_bool().unwrap());
}

#[tokio::test]
async fn unknown_salary_band_or_currency_is_a_bad_request() {
    let (app, _) = app();
    let (status, _) = send(&app, "GET", "/api/listings?salary=12345&currency=USD", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, "GET", "/api/listings?salary=100000&currency=JPY", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, page) = send(&app, "GET", "/api/listings?p=abc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 1);
}

#[tokio::test]
async fn manual_rate_drives_salary_filter() {
    let (app, _) = app();
    publish(&app, "Rust Engineer", "Berlin").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/admin/fx-rates",
        Some(json!({ "base": "eur", "target": "usd", "value": 1.2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, page) = send(&app, "GET", "/api/listings?l=Berlin&salary=100000&currency=USD", None).await;
    assert_eq!(page["total"], 1);
    assert!(!page["complementary_remote"].as_bool().unwrap());

    let (_, rates) = send(&app, "GET", "/api/admin/fx-rates", None).await;
    assert_eq!(rates[0]["base"], "EUR");
}

#[tokio::test]
async fn same_currency_rate_is_rejected() {
    let (app, _) = app();
    publish(&app, "Rust Engineer", "Berlin").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/admin/fx-rates",
        Some(json!({ "base": "EUR", "target": "eur", "value": 2.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, rates) = send(&app, "GET", "/api/admin/fx-rates", None).await;
    assert_eq!(rates, json!([]));
    // 90000 EUR stays below a 100000 EUR floor.
    let (_, page) = send(&app, "GET", "/api/listings?l=Berlin&salary=100000&currency=EUR", None).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn tier_catalogue_is_listed_by_priority() {
    let (app, _) = app();
    let (status, tiers) = send(&app, "GET", "/api/tiers", None).await;
    assert_eq!(status, StatusCode::OK);

    let tiers = tiers.as_array().unwrap();
    assert_eq!(tiers.len(), 6);
    assert_eq!(tiers[0]["tier"], "pinned_for_60_days");
    assert_eq!(tiers[0]["price_cents"], 19900);
    assert_eq!(tiers[0]["pinned"], true);
    assert_eq!(tiers[5]["tier"], "basic");
    assert_eq!(tiers[5]["duration_days"], 90);
    assert_eq!(tiers[5]["pinned"], false);
}

#[tokio::test]
async fn clickouts_and_related_listings() {
    let (app, store) = app();
    let listing = publish(&app, "Rust Engineer", "London").await;
    store
        .insert(ListingBuilder::new(100).location("London / Remote").build())
        .unwrap();
    store
        .insert(
            ListingBuilder::new(101)
                .location("Lisbon")
                .tier(AdTier::WithCompanyLogo)
                .build(),
        )
        .unwrap();
    let external_id = listing["external_id"].as_str().unwrap();

    let (status, click) = send(&app, "POST", &format!("/api/listings/{}/clickout", external_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(click["how_to_apply"], "https://acme.test/apply");

    let (_, related) = send(&app, "GET", &format!("/api/listings/{}/related", external_id), None).await;
    let related_ids: Vec<i64> = related["listings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_i64().unwrap())
        .collect();
    assert_eq!(related_ids, vec![101, 100]);
}

#[tokio::test]
async fn expired_listings_leave_search_results() {
    let (app, _) = app();
    let listing = publish(&app, "Rust Engineer", "Berlin").await;
    let (status, _) = send(&app, "POST", &format!("/api/admin/listings/{}/expire", listing["id"]), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, page) = send(&app, "GET", "/api/listings?l=Berlin", None).await;
    assert_eq!(page["total"], 0);
    let (_, page) = send(&app, "GET", "/api/listings", None).await;
    assert_eq!(page["new_last_week"], 1);
}

#[tokio::test]
async fn salary_report_falls_back_to_remote() {
    let (app, store) = app();
    store
        .insert(ListingBuilder::new(1).location("Remote").salary(50000, 70000, "USD").build())
        .unwrap();
    store
        .insert(ListingBuilder::new(2).location("Berlin").salary(60000, 80000, "EUR").build())
        .unwrap();

    let (status, report) = send(&app, "GET", "/api/salaries/Berlin?currency=EUR", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["sample_count"], 1);
    assert_eq!(report["substituted"], false);
    assert_eq!(report["chart_min"], 30000);
    assert_eq!(report["chart_max"], 110000);

    let (_, report) = send(&app, "GET", "/api/salaries/Narnia?currency=GBP", None).await;
    assert_eq!(report["substituted"], true);
    assert_eq!(report["location"], "Remote");
    assert_eq!(report["currency"], "USD");
    assert_eq!(report["sample_count"], 1);
}
