use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::listing_dto::{CreateListingPayload, UpdateListingPayload};
use crate::error::Result;
use crate::models::listing::{AdTier, Listing};
use crate::services::search_plan::QueryPlan;

/// One window of a plan's matches and the match count over the whole plan.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub items: Vec<Listing>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewListingCounts {
    pub last_week: i64,
    pub last_month: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalarySample {
    pub min: i64,
    pub max: i64,
    pub created_at: DateTime<Utc>,
}

/// Approved, non-expired listing whose apply target should be link-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyTarget {
    pub id: i64,
    pub how_to_apply: String,
}

/// Durable listing collection. Every read path applies the plan's
/// predicates at call time, so approval and expiry written concurrently are
/// honoured by the next query.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn query(&self, plan: &QueryPlan) -> Result<ListingPage>;

    async fn get(&self, id: i64) -> Result<Listing>;

    async fn get_by_external_id(&self, external_id: Uuid) -> Result<Listing>;

    async fn create(&self, payload: CreateListingPayload) -> Result<Listing>;

    async fn update_fields(&self, id: i64, payload: UpdateListingPayload) -> Result<Listing>;

    async fn approve(&self, id: i64, now: DateTime<Utc>) -> Result<Listing>;

    async fn disapprove(&self, id: i64) -> Result<Listing>;

    async fn mark_expired(&self, id: i64) -> Result<()>;

    async fn set_tier(&self, id: i64, tier: AdTier) -> Result<Listing>;

    async fn record_view(&self, id: i64) -> Result<()>;

    async fn record_clickout(&self, id: i64) -> Result<()>;

    /// Listings approved within the last 7 and 30 days, counted in one pass.
    async fn new_listing_counts(&self, now: DateTime<Utc>) -> Result<NewListingCounts>;

    /// Approved yearly salaries for listings located in `location` and paid
    /// in `currency`, expired ones included.
    async fn salary_samples(&self, location: &str, currency: &str) -> Result<Vec<SalarySample>>;

    async fn apply_targets(&self) -> Result<Vec<ApplyTarget>>;

    /// Demotes pinned listings whose pin period has lapsed to Basic and
    /// returns how many were changed.
    async fn demote_lapsed_tiers(&self, now: DateTime<Utc>) -> Result<u64>;
}
