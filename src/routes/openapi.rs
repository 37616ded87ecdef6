use axum::Json;
use utoipa::OpenApi;

use crate::dto::listing_dto::{
    BrowseResponse, ClickoutResponse, CreateListingPayload, ListingResponse,
    RelatedListingsResponse, SetTierPayload, TierResponse, UpdateListingPayload, UpsertRatePayload,
};
use crate::models::exchange_rate::ExchangeRate;
use crate::models::listing::AdTier;
use crate::routes::{admin, health, listing, salary};
use crate::services::salary_service::{SalaryReport, SalaryStats, SalaryTrendPoint};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        listing::browse_listings,
        listing::create_listing,
        listing::get_listing,
        listing::related_listings,
        listing::clickout,
        listing::list_tiers,
        admin::update_listing,
        admin::approve_listing,
        admin::disapprove_listing,
        admin::expire_listing,
        admin::set_listing_tier,
        admin::list_fx_rates,
        admin::upsert_fx_rate,
        salary::get_salary_report,
    ),
    components(schemas(
        AdTier,
        BrowseResponse,
        ClickoutResponse,
        CreateListingPayload,
        ExchangeRate,
        ListingResponse,
        RelatedListingsResponse,
        SalaryReport,
        SalaryStats,
        SalaryTrendPoint,
        SetTierPayload,
        TierResponse,
        UpdateListingPayload,
        UpsertRatePayload,
    )),
    tags(
        (name = "listings", description = "Public listing search and detail"),
        (name = "admin", description = "Listing moderation and exchange rates"),
        (name = "salaries", description = "Salary statistics per location"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
