use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    dto::listing_dto::{
        BrowseQuery, BrowseResponse, ClickoutResponse, CreateListingPayload, ListingResponse,
        RelatedListingsResponse, TierResponse,
    },
    error::{Error, Result},
    models::{listing::AdTier, search::SearchRequest},
    services::pagination,
    AppState,
};

/// Keeps ASCII letters and digits, whitespace and the tag separators.
fn sanitize(raw: Option<&str>) -> String {
    raw.unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == ',' || *c == '|')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Turns raw browse parameters into a search request. Salary floors outside
/// the configured bands and unknown currencies are rejected.
pub fn search_request_from(query: &BrowseQuery, config: &Config) -> Result<SearchRequest> {
    let page = pagination::normalize_page(query.p.as_deref());
    let location = sanitize(query.l.as_deref());
    let tag = sanitize(query.t.as_deref());

    let salary_floor = match query.salary.as_deref().map(str::trim) {
        None | Some("") => 0,
        Some(raw) => {
            let salary = raw
                .parse::<i64>()
                .map_err(|_| Error::BadRequest(format!("Invalid salary: {}", raw)))?;
            if !config.is_available_salary_band(salary) {
                return Err(Error::BadRequest(format!("Invalid salary: {}", salary)));
            }
            salary
        }
    };

    let currency = if salary_floor > 0 {
        let currency = query
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| config.default_currency.clone());
        if !config.is_available_currency(&currency) {
            return Err(Error::BadRequest(format!("Invalid currency: {}", currency)));
        }
        currency
    } else {
        String::new()
    };

    let mut request = SearchRequest::new(location, tag, page).with_salary(salary_floor, currency);
    request.include_pinned = request.is_unfiltered() && page == 1;
    Ok(request)
}

#[utoipa::path(
    get,
    path = "/api/listings",
    params(BrowseQuery),
    responses(
        (status = 200, description = "Page of listings", body = BrowseResponse),
        (status = 400, description = "Invalid salary or currency")
    ),
    tag = "listings"
)]
#[axum::debug_handler]
pub async fn browse_listings(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> Result<impl IntoResponse> {
    let request = search_request_from(&query, &state.config)?;
    let page = state.browse_service.browse(request).await?;

    Ok(Json(BrowseResponse {
        pinned: page.pinned.into_iter().map(ListingResponse::from).collect(),
        listings: page
            .result
            .listings
            .into_iter()
            .map(ListingResponse::from)
            .collect(),
        total: page.result.total,
        page: page.page,
        page_indexes: page.page_indexes,
        complementary_remote: page.complementary_remote,
        new_last_week: page.counts.last_week,
        new_last_month: page.counts.last_month,
    }))
}

#[utoipa::path(
    post,
    path = "/api/listings",
    request_body = CreateListingPayload,
    responses(
        (status = 201, description = "Draft listing created", body = ListingResponse),
        (status = 400, description = "Invalid payload")
    ),
    tag = "listings"
)]
#[axum::debug_handler]
pub async fn create_listing(
    State(state): State<AppState>,
    Json(payload): Json<CreateListingPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let listing = state.listing_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(ListingResponse::from(listing))))
}

#[utoipa::path(
    get,
    path = "/api/listings/{external_id}",
    params(
        ("external_id" = Uuid, Path, description = "Public listing ID")
    ),
    responses(
        (status = 200, description = "Listing", body = ListingResponse),
        (status = 404, description = "Listing not found")
    ),
    tag = "listings"
)]
#[axum::debug_handler]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(external_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let listing = state.listing_service.view(external_id).await?;
    Ok(Json(ListingResponse::from(listing)))
}

#[utoipa::path(
    get,
    path = "/api/listings/{external_id}/related",
    params(
        ("external_id" = Uuid, Path, description = "Public listing ID")
    ),
    responses(
        (status = 200, description = "Related listings", body = RelatedListingsResponse),
        (status = 404, description = "Listing not found")
    ),
    tag = "listings"
)]
#[axum::debug_handler]
pub async fn related_listings(
    State(state): State<AppState>,
    Path(external_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let listings = state.listing_service.related(external_id).await?;
    Ok(Json(RelatedListingsResponse {
        listings: listings.into_iter().map(ListingResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/listings/{external_id}/clickout",
    params(
        ("external_id" = Uuid, Path, description = "Public listing ID")
    ),
    responses(
        (status = 200, description = "Apply target", body = ClickoutResponse),
        (status = 404, description = "Listing not found")
    ),
    tag = "listings"
)]
#[axum::debug_handler]
pub async fn clickout(
    State(state): State<AppState>,
    Path(external_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let how_to_apply = state.listing_service.clickout(external_id).await?;
    Ok(Json(ClickoutResponse { how_to_apply }))
}

#[utoipa::path(
    get,
    path = "/api/tiers",
    responses(
        (status = 200, description = "Ad tier catalogue, highest display priority first", body = [TierResponse])
    ),
    tag = "listings"
)]
#[axum::debug_handler]
pub async fn list_tiers() -> Json<Vec<TierResponse>> {
    Json(
        AdTier::ALL
            .iter()
            .rev()
            .copied()
            .map(TierResponse::from)
            .collect(),
    )
}
