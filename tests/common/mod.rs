#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use listings_backend::models::listing::{AdTier, Listing};
use listings_backend::services::fx_service::{ExchangeRates, MemoryExchangeRates};
use listings_backend::services::memory_listing_store::MemoryListingStore;
use listings_backend::services::search_service::SearchService;
use uuid::Uuid;

pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
}

pub struct ListingBuilder {
    listing: Listing,
}

impl ListingBuilder {
    /// Approved Basic listing in Berlin, created on day 0.
    pub fn new(id: i64) -> Self {
        Self {
            listing: Listing {
                id,
                external_id: Uuid::new_v4(),
                title: format!("Engineer {}", id),
                company: "Acme".into(),
                company_email: "jobs@acme.test".into(),
                location: "Berlin".into(),
                description: "Building backend services".into(),
                how_to_apply: "https://acme.test/apply".into(),
                perks: None,
                interview_process: None,
                salary_min: 50000,
                salary_max: 80000,
                currency: "EUR".into(),
                salary_period: "year".into(),
                ad_tier: AdTier::Basic,
                approved_at: Some(day(0)),
                expired: false,
                view_count: 0,
                clickout_count: 0,
                created_at: day(0),
                updated_at: day(0),
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.listing.title = title.into();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.listing.description = description.into();
        self
    }

    pub fn location(mut self, location: &str) -> Self {
        self.listing.location = location.into();
        self
    }

    pub fn tier(mut self, tier: AdTier) -> Self {
        self.listing.ad_tier = tier;
        self
    }

    /// Creation and approval on day `n`.
    pub fn created_day(mut self, n: i64) -> Self {
        self.listing.created_at = day(n);
        self.listing.updated_at = day(n);
        if self.listing.approved_at.is_some() {
            self.listing.approved_at = Some(day(n));
        }
        self
    }

    pub fn approved_day(mut self, n: i64) -> Self {
        self.listing.approved_at = Some(day(n));
        self
    }

    pub fn salary(mut self, min: i64, max: i64, currency: &str) -> Self {
        self.listing.salary_min = min;
        self.listing.salary_max = max;
        self.listing.currency = currency.into();
        self
    }

    pub fn unapproved(mut self) -> Self {
        self.listing.approved_at = None;
        self
    }

    pub fn expired(mut self) -> Self {
        self.listing.expired = true;
        self
    }

    pub fn build(self) -> Listing {
        self.listing
    }
}

pub fn store_with(rates: Arc<dyn ExchangeRates>, listings: Vec<Listing>) -> Arc<MemoryListingStore> {
    let store = Arc::new(MemoryListingStore::new(rates));
    for listing in listings {
        store.insert(listing).unwrap();
    }
    store
}

pub fn search_over(listings: Vec<Listing>, page_size: i64) -> (SearchService, Arc<MemoryListingStore>) {
    let store = store_with(Arc::new(MemoryExchangeRates::new()), listings);
    (SearchService::new(store.clone(), page_size, 3), store)
}

pub fn ids(listings: &[Listing]) -> Vec<i64> {
    listings.iter().map(|l| l.id).collect()
}
