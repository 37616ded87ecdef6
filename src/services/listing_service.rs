use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::dto::listing_dto::{CreateListingPayload, UpdateListingPayload};
use crate::error::{Error, Result};
use crate::models::exchange_rate::is_currency_code;
use crate::models::listing::{AdTier, Listing};
use crate::services::count_cache::LandingCache;
use crate::services::listing_store::{ApplyTarget, ListingStore};
use crate::services::search_service::SearchService;

/// Listing lifecycle. Every write that can change the landing page clears
/// the aggregate cache.
#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn ListingStore>,
    search: SearchService,
    landing: LandingCache,
}

fn check_salary(min: i64, max: i64, currency: &str) -> Result<()> {
    if min > max {
        return Err(Error::BadRequest(
            "salary_min must not exceed salary_max".to_string(),
        ));
    }
    if !is_currency_code(currency) {
        return Err(Error::BadRequest(format!(
            "Malformed currency code: {}",
            currency
        )));
    }
    Ok(())
}

impl ListingService {
    pub fn new(store: Arc<dyn ListingStore>, search: SearchService, landing: LandingCache) -> Self {
        Self {
            store,
            search,
            landing,
        }
    }

    pub async fn create(&self, payload: CreateListingPayload) -> Result<Listing> {
        check_salary(payload.salary_min, payload.salary_max, &payload.currency)?;
        let listing = self.store.create(payload).await?;
        info!(listing_id = listing.id, "listing draft created");
        Ok(listing)
    }

    /// A listing visible to visitors. Unapproved drafts are reported missing.
    pub async fn get_public(&self, external_id: Uuid) -> Result<Listing> {
        let listing = self.store.get_by_external_id(external_id).await?;
        if listing.approved_at.is_none() {
            return Err(Error::NotFound(format!("Listing {} not found", external_id)));
        }
        Ok(listing)
    }

    pub async fn view(&self, external_id: Uuid) -> Result<Listing> {
        let mut listing = self.get_public(external_id).await?;
        self.store.record_view(listing.id).await?;
        listing.view_count += 1;
        Ok(listing)
    }

    pub async fn related(&self, external_id: Uuid) -> Result<Vec<Listing>> {
        let listing = self.get_public(external_id).await?;
        self.search.related_to(&listing).await
    }

    /// Counts a visitor leaving through the apply target and returns it.
    pub async fn clickout(&self, external_id: Uuid) -> Result<String> {
        let listing = self.get_public(external_id).await?;
        self.store.record_clickout(listing.id).await?;
        Ok(listing.how_to_apply)
    }

    pub async fn update(&self, id: i64, payload: UpdateListingPayload) -> Result<Listing> {
        let current = self.store.get(id).await?;
        check_salary(
            payload.salary_min.unwrap_or(current.salary_min),
            payload.salary_max.unwrap_or(current.salary_max),
            payload.currency.as_deref().unwrap_or(&current.currency),
        )?;

        let listing = self.store.update_fields(id, payload).await?;
        self.landing.invalidate_all();
        info!(listing_id = id, "listing updated");
        Ok(listing)
    }

    pub async fn approve(&self, id: i64) -> Result<Listing> {
        let listing = self.store.approve(id, Utc::now()).await?;
        self.landing.invalidate_all();
        info!(listing_id = id, "listing approved");
        Ok(listing)
    }

    pub async fn disapprove(&self, id: i64) -> Result<Listing> {
        let listing = self.store.disapprove(id).await?;
        self.landing.invalidate_all();
        info!(listing_id = id, "listing hidden");
        Ok(listing)
    }

    pub async fn expire(&self, id: i64) -> Result<()> {
        self.store.mark_expired(id).await?;
        self.landing.invalidate_all();
        info!(listing_id = id, "listing marked expired");
        Ok(())
    }

    pub async fn set_tier(&self, id: i64, tier: AdTier) -> Result<Listing> {
        let listing = self.store.set_tier(id, tier).await?;
        self.landing.invalidate_all();
        info!(listing_id = id, tier = ?tier, "listing tier changed");
        Ok(listing)
    }

    pub async fn apply_targets(&self) -> Result<Vec<ApplyTarget>> {
        self.store.apply_targets().await
    }

    pub async fn demote_lapsed_tiers(&self, now: DateTime<Utc>) -> Result<u64> {
        let demoted = self.store.demote_lapsed_tiers(now).await?;
        if demoted > 0 {
            self.landing.invalidate_all();
            info!(demoted, "lapsed pinned listings demoted to basic");
        }
        Ok(demoted)
    }
}
