use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::listing::{AdTier, Listing};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateListingPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub company: String,
    #[validate(email)]
    pub company_email: String,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1, max = 500))]
    pub how_to_apply: String,
    pub perks: Option<String>,
    pub interview_process: Option<String>,
    #[validate(range(min = 0))]
    pub salary_min: i64,
    #[validate(range(min = 0))]
    pub salary_max: i64,
    #[validate(length(equal = 3))]
    pub currency: String,
    pub salary_period: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateListingPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub company: Option<String>,
    #[validate(email)]
    pub company_email: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub how_to_apply: Option<String>,
    pub perks: Option<String>,
    pub interview_process: Option<String>,
    #[validate(range(min = 0))]
    pub salary_min: Option<i64>,
    #[validate(range(min = 0))]
    pub salary_max: Option<i64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub salary_period: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetTierPayload {
    pub tier: AdTier,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertRatePayload {
    #[validate(length(equal = 3))]
    pub base: String,
    #[validate(length(equal = 3))]
    pub target: String,
    #[validate(range(exclusive_min = 0.0))]
    pub value: f64,
}

/// Raw browse parameters. Everything arrives as text so malformed values can
/// be normalised instead of rejected by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(default)]
pub struct BrowseQuery {
    /// Location filter.
    pub l: Option<String>,
    /// Tag filter, terms separated by `|` or `,`.
    pub t: Option<String>,
    /// Salary floor, one of the configured bands.
    pub salary: Option<String>,
    pub currency: Option<String>,
    /// 1-based page.
    pub p: Option<String>,
}

/// Public view of a listing. The contact address stays private.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingResponse {
    pub id: i64,
    pub external_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub how_to_apply: String,
    pub perks: Option<String>,
    pub interview_process: Option<String>,
    pub salary_min: i64,
    pub salary_max: i64,
    pub currency: String,
    pub salary_period: String,
    pub ad_tier: AdTier,
    pub approved_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub view_count: i64,
    pub clickout_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Listing> for ListingResponse {
    fn from(value: Listing) -> Self {
        Self {
            id: value.id,
            external_id: value.external_id,
            title: value.title,
            company: value.company,
            location: value.location,
            description: value.description,
            how_to_apply: value.how_to_apply,
            perks: value.perks,
            interview_process: value.interview_process,
            salary_min: value.salary_min,
            salary_max: value.salary_max,
            currency: value.currency,
            salary_period: value.salary_period,
            ad_tier: value.ad_tier,
            approved_at: value.approved_at,
            expired: value.expired,
            view_count: value.view_count,
            clickout_count: value.clickout_count,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BrowseResponse {
    /// Pinned listings, only on the unfiltered first page.
    pub pinned: Vec<ListingResponse>,
    pub listings: Vec<ListingResponse>,
    pub total: i64,
    pub page: i64,
    pub page_indexes: Vec<i64>,
    /// The filters matched nothing and Remote listings are shown instead.
    pub complementary_remote: bool,
    pub new_last_week: i64,
    pub new_last_month: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RelatedListingsResponse {
    pub listings: Vec<ListingResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClickoutResponse {
    pub how_to_apply: String,
}

/// One entry of the ad tier catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TierResponse {
    pub tier: AdTier,
    pub rank: i16,
    pub price_cents: i64,
    pub duration_days: i64,
    pub description: String,
    pub pinned: bool,
}

impl From<AdTier> for TierResponse {
    fn from(tier: AdTier) -> Self {
        Self {
            tier,
            rank: tier.rank(),
            price_cents: tier.price_cents(),
            duration_days: tier.duration_days(),
            description: tier.description().to_string(),
            pinned: tier.is_pinned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(default)]
pub struct SalaryQuery {
    /// Three-letter currency code; the configured default when missing.
    pub currency: Option<String>,
}
