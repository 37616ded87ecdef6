use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use validator::Validate;

use crate::{
    dto::listing_dto::{ListingResponse, SetTierPayload, UpdateListingPayload, UpsertRatePayload},
    error::{Error, Result},
    models::exchange_rate::ExchangeRate,
    AppState,
};

#[utoipa::path(
    patch,
    path = "/api/admin/listings/{id}",
    params(
        ("id" = i64, Path, description = "Listing ID")
    ),
    request_body = UpdateListingPayload,
    responses(
        (status = 200, description = "Listing updated", body = ListingResponse),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Listing not found")
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn update_listing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateListingPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let listing = state.listing_service.update(id, payload).await?;
    Ok(Json(ListingResponse::from(listing)))
}

#[utoipa::path(
    post,
    path = "/api/admin/listings/{id}/approve",
    params(
        ("id" = i64, Path, description = "Listing ID")
    ),
    responses(
        (status = 200, description = "Listing approved", body = ListingResponse),
        (status = 404, description = "Listing not found")
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn approve_listing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let listing = state.listing_service.approve(id).await?;
    Ok(Json(ListingResponse::from(listing)))
}

#[utoipa::path(
    post,
    path = "/api/admin/listings/{id}/disapprove",
    params(
        ("id" = i64, Path, description = "Listing ID")
    ),
    responses(
        (status = 200, description = "Listing hidden from search", body = ListingResponse),
        (status = 404, description = "Listing not found")
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn disapprove_listing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let listing = state.listing_service.disapprove(id).await?;
    Ok(Json(ListingResponse::from(listing)))
}

#[utoipa::path(
    post,
    path = "/api/admin/listings/{id}/expire",
    params(
        ("id" = i64, Path, description = "Listing ID")
    ),
    responses(
        (status = 204, description = "Listing expired"),
        (status = 404, description = "Listing not found")
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn expire_listing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.listing_service.expire(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/listings/{id}/tier",
    params(
        ("id" = i64, Path, description = "Listing ID")
    ),
    request_body = SetTierPayload,
    responses(
        (status = 200, description = "Tier changed", body = ListingResponse),
        (status = 404, description = "Listing not found")
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn set_listing_tier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<SetTierPayload>,
) -> Result<impl IntoResponse> {
    let listing = state.listing_service.set_tier(id, payload.tier).await?;
    Ok(Json(ListingResponse::from(listing)))
}

#[utoipa::path(
    get,
    path = "/api/admin/fx-rates",
    responses(
        (status = 200, description = "Stored exchange rates", body = [ExchangeRate])
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn list_fx_rates(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.rates.list().await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/fx-rates",
    request_body = UpsertRatePayload,
    responses(
        (status = 200, description = "Rate stored", body = ExchangeRate),
        (status = 400, description = "Invalid payload or identical currencies")
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn upsert_fx_rate(
    State(state): State<AppState>,
    Json(payload): Json<UpsertRatePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    if payload.base.eq_ignore_ascii_case(&payload.target) {
        return Err(Error::BadRequest(
            "base and target currencies must differ".to_string(),
        ));
    }
    let rate = ExchangeRate {
        base: payload.base.to_uppercase(),
        target: payload.target.to_uppercase(),
        value: payload.value,
        updated_at: Utc::now(),
    };
    state.rates.upsert(&rate).await?;
    tracing::info!(base = %rate.base, target = %rate.target, value = rate.value, "fx rate set manually");
    Ok(Json(rate))
}
