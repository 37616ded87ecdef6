use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};

use crate::{
    dto::listing_dto::SalaryQuery,
    error::{Error, Result},
    models::exchange_rate::is_currency_code,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/salaries/{location}",
    params(
        ("location" = String, Path, description = "Location to report on"),
        SalaryQuery
    ),
    responses(
        (status = 200, description = "Salary statistics", body = crate::services::salary_service::SalaryReport),
        (status = 400, description = "Malformed currency code")
    ),
    tag = "salaries"
)]
#[axum::debug_handler]
pub async fn get_salary_report(
    State(state): State<AppState>,
    Path(location): Path<String>,
    Query(query): Query<SalaryQuery>,
) -> Result<impl IntoResponse> {
    let currency = query
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
        .unwrap_or_else(|| state.config.default_currency.clone());
    if !is_currency_code(&currency) {
        return Err(Error::BadRequest(format!(
            "Malformed currency code: {}",
            currency
        )));
    }

    let report = state.salary_service.report(&location, &currency).await?;
    Ok(Json(report))
}
