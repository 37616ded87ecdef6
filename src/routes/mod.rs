pub mod admin;
pub mod health;
pub mod listing;
pub mod openapi;
pub mod salary;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::AppState;

pub fn api_router() -> Router<AppState> {
    let public_api = Router::new()
        .route(
            "/api/listings",
            get(listing::browse_listings).post(listing::create_listing),
        )
        .route("/api/listings/:external_id", get(listing::get_listing))
        .route(
            "/api/listings/:external_id/related",
            get(listing::related_listings),
        )
        .route(
            "/api/listings/:external_id/clickout",
            post(listing::clickout),
        )
        .route("/api/salaries/:location", get(salary::get_salary_report))
        .route("/api/tiers", get(listing::list_tiers));

    let admin_api = Router::new()
        .route("/api/admin/listings/:id", patch(admin::update_listing))
        .route(
            "/api/admin/listings/:id/approve",
            post(admin::approve_listing),
        )
        .route(
            "/api/admin/listings/:id/disapprove",
            post(admin::disapprove_listing),
        )
        .route(
            "/api/admin/listings/:id/expire",
            post(admin::expire_listing),
        )
        .route(
            "/api/admin/listings/:id/tier",
            post(admin::set_listing_tier),
        )
        .route(
            "/api/admin/fx-rates",
            get(admin::list_fx_rates).put(admin::upsert_fx_rate),
        );

    Router::new()
        .route("/health", get(health::health))
        .route("/api/openapi.json", get(openapi::openapi_json))
        .merge(public_api)
        .merge(admin_api)
}
