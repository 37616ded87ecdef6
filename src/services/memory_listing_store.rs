use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::dto::listing_dto::{CreateListingPayload, UpdateListingPayload};
use crate::error::{Error, Result};
use crate::models::listing::{AdTier, Listing};
use crate::services::fx_service::{conversion_multiplier, ExchangeRates};
use crate::services::listing_store::{
    ApplyTarget, ListingPage, ListingStore, NewListingCounts, SalarySample,
};
use crate::services::relevance;
use crate::services::search_plan::{Predicate, QueryPlan, SortKey};

#[derive(Default)]
struct MemoryState {
    listings: BTreeMap<i64, Listing>,
    next_id: i64,
}

/// Listing store held in process memory. Evaluates query plans with the same
/// semantics as the Postgres store; used by the test-suite and local runs.
pub struct MemoryListingStore {
    state: RwLock<MemoryState>,
    rates: Arc<dyn ExchangeRates>,
    queries: AtomicUsize,
}

struct Scored {
    listing: Listing,
    relevance: f64,
    similarity: f64,
}

impl MemoryListingStore {
    pub fn new(rates: Arc<dyn ExchangeRates>) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            rates,
            queries: AtomicUsize::new(0),
        }
    }

    /// Stores `listing` as is, keeping its id and lifecycle fields.
    pub fn insert(&self, listing: Listing) -> Result<()> {
        let mut state = self.write()?;
        state.next_id = state.next_id.max(listing.id);
        state.listings.insert(listing.id, listing);
        Ok(())
    }

    /// Number of `query` calls served so far.
    pub fn queries_executed(&self) -> usize {
        self.queries.load(AtomicOrdering::SeqCst)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| Error::Internal("listing store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| Error::Internal("listing store lock poisoned".into()))
    }

    fn modify<F>(&self, id: i64, change: F) -> Result<Listing>
    where
        F: FnOnce(&mut Listing),
    {
        let mut state = self.write()?;
        let listing = state
            .listings
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Listing {} not found", id)))?;
        change(listing);
        Ok(listing.clone())
    }
}

fn matches(listing: &Listing, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Searchable => listing.is_searchable(),
        Predicate::ExcludePinned => !listing.ad_tier.is_pinned(),
        Predicate::OnlyPinned => listing.ad_tier.is_pinned(),
        Predicate::ExcludeId(id) => listing.id != *id,
        Predicate::LocationContains(location) => {
            relevance::contains_ignore_case(&listing.location, location)
        }
        Predicate::TextMatches(terms) => {
            relevance::rank(&relevance::listing_document(listing), terms).is_some()
        }
        // Needs exchange rates; evaluated separately.
        Predicate::SalaryAtLeast { .. } => true,
    }
}

fn compare(a: &Scored, b: &Scored, order: &[SortKey]) -> Ordering {
    for key in order {
        let ord = match key {
            SortKey::TierDesc => b.listing.ad_tier.rank().cmp(&a.listing.ad_tier.rank()),
            SortKey::RelevanceDesc => b.relevance.total_cmp(&a.relevance),
            SortKey::LocationSimilarityDesc(_) => b.similarity.total_cmp(&a.similarity),
            SortKey::ApprovedDesc => b.listing.approved_at.cmp(&a.listing.approved_at),
            SortKey::CreatedDesc => b.listing.created_at.cmp(&a.listing.created_at),
            SortKey::IdDesc => b.listing.id.cmp(&a.listing.id),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn query(&self, plan: &QueryPlan) -> Result<ListingPage> {
        self.queries.fetch_add(1, AtomicOrdering::SeqCst);

        let mut candidates: Vec<Listing> = {
            let state = self.read()?;
            state
                .listings
                .values()
                .filter(|l| plan.predicates.iter().all(|p| matches(l, p)))
                .cloned()
                .collect()
        };

        if let Some((floor, currency)) = plan.salary_filter() {
            let currencies: HashSet<String> =
                candidates.iter().map(|l| l.currency.clone()).collect();
            let mut multipliers = HashMap::with_capacity(currencies.len());
            for base in currencies {
                let multiplier = conversion_multiplier(self.rates.as_ref(), &base, currency).await?;
                multipliers.insert(base, multiplier);
            }
            candidates.retain(|l| {
                let multiplier = multipliers.get(&l.currency).copied().unwrap_or(1.0);
                l.salary_max as f64 * multiplier >= floor as f64
            });
        }

        let terms = plan.text_query();
        let reference = plan.order.iter().find_map(|k| match k {
            SortKey::LocationSimilarityDesc(location) => Some(location.as_str()),
            _ => None,
        });
        let mut scored: Vec<Scored> = candidates
            .into_iter()
            .map(|listing| {
                let relevance = terms
                    .and_then(|t| relevance::rank(&relevance::listing_document(&listing), t))
                    .unwrap_or(0.0);
                let similarity = reference
                    .map(|r| relevance::location_similarity(r, &listing.location))
                    .unwrap_or(0.0);
                Scored {
                    listing,
                    relevance,
                    similarity,
                }
            })
            .collect();
        scored.sort_by(|a, b| compare(a, b, &plan.order));

        let total = scored.len() as i64;
        let listings = scored.into_iter().map(|s| s.listing);
        let items = match plan.window {
            Some(window) => listings
                .skip(window.offset.max(0) as usize)
                .take(window.limit.max(0) as usize)
                .collect(),
            None => listings.collect(),
        };

        Ok(ListingPage { items, total })
    }

    async fn get(&self, id: i64) -> Result<Listing> {
        self.read()?
            .listings
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Listing {} not found", id)))
    }

    async fn get_by_external_id(&self, external_id: Uuid) -> Result<Listing> {
        self.read()?
            .listings
            .values()
            .find(|l| l.external_id == external_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Listing {} not found", external_id)))
    }

    async fn create(&self, payload: CreateListingPayload) -> Result<Listing> {
        let mut state = self.write()?;
        state.next_id += 1;
        let now = Utc::now();
        let listing = Listing {
            id: state.next_id,
            external_id: Uuid::new_v4(),
            title: payload.title,
            company: payload.company,
            company_email: payload.company_email,
            location: payload.location,
            description: payload.description,
            how_to_apply: payload.how_to_apply,
            perks: payload.perks,
            interview_process: payload.interview_process,
            salary_min: payload.salary_min,
            salary_max: payload.salary_max,
            currency: payload.currency.to_uppercase(),
            salary_period: payload.salary_period.unwrap_or_else(|| "year".to_string()),
            ad_tier: AdTier::Basic,
            approved_at: None,
            expired: false,
            view_count: 0,
            clickout_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn update_fields(&self, id: i64, payload: UpdateListingPayload) -> Result<Listing> {
        self.modify(id, |l| {
            if let Some(v) = payload.title {
                l.title = v;
            }
            if let Some(v) = payload.company {
                l.company = v;
            }
            if let Some(v) = payload.company_email {
                l.company_email = v;
            }
            if let Some(v) = payload.location {
                l.location = v;
            }
            if let Some(v) = payload.description {
                l.description = v;
            }
            if let Some(v) = payload.how_to_apply {
                l.how_to_apply = v;
            }
            if payload.perks.is_some() {
                l.perks = payload.perks;
            }
            if payload.interview_process.is_some() {
                l.interview_process = payload.interview_process;
            }
            if let Some(v) = payload.salary_min {
                l.salary_min = v;
            }
            if let Some(v) = payload.salary_max {
                l.salary_max = v;
            }
            if let Some(v) = payload.currency {
                l.currency = v.to_uppercase();
            }
            if let Some(v) = payload.salary_period {
                l.salary_period = v;
            }
            l.updated_at = Utc::now();
        })
    }

    async fn approve(&self, id: i64, now: DateTime<Utc>) -> Result<Listing> {
        self.modify(id, |l| {
            l.approved_at = Some(now);
            l.updated_at = now;
        })
    }

    async fn disapprove(&self, id: i64) -> Result<Listing> {
        self.modify(id, |l| {
            l.approved_at = None;
            l.updated_at = Utc::now();
        })
    }

    async fn mark_expired(&self, id: i64) -> Result<()> {
        self.modify(id, |l| {
            l.expired = true;
            l.updated_at = Utc::now();
        })?;
        Ok(())
    }

    async fn set_tier(&self, id: i64, tier: AdTier) -> Result<Listing> {
        self.modify(id, |l| {
            l.ad_tier = tier;
            l.updated_at = Utc::now();
        })
    }

    async fn record_view(&self, id: i64) -> Result<()> {
        self.modify(id, |l| l.view_count += 1)?;
        Ok(())
    }

    async fn record_clickout(&self, id: i64) -> Result<()> {
        self.modify(id, |l| l.clickout_count += 1)?;
        Ok(())
    }

    async fn new_listing_counts(&self, now: DateTime<Utc>) -> Result<NewListingCounts> {
        let week_ago = now - Duration::days(7);
        let month_ago = now - Duration::days(30);
        let state = self.read()?;
        let mut counts = NewListingCounts::default();
        for approved_at in state.listings.values().filter_map(|l| l.approved_at) {
            if approved_at >= week_ago {
                counts.last_week += 1;
            }
            if approved_at >= month_ago {
                counts.last_month += 1;
            }
        }
        Ok(counts)
    }

    async fn salary_samples(&self, location: &str, currency: &str) -> Result<Vec<SalarySample>> {
        let state = self.read()?;
        let mut samples: Vec<SalarySample> = state
            .listings
            .values()
            .filter(|l| {
                l.approved_at.is_some()
                    && l.currency == currency
                    && l.salary_period == "year"
                    && relevance::contains_ignore_case(&l.location, location)
            })
            .map(|l| SalarySample {
                min: l.salary_min,
                max: l.salary_max,
                created_at: l.created_at,
            })
            .collect();
        samples.sort_by_key(|s| s.created_at);
        Ok(samples)
    }

    async fn apply_targets(&self) -> Result<Vec<ApplyTarget>> {
        let state = self.read()?;
        Ok(state
            .listings
            .values()
            .filter(|l| l.is_searchable())
            .map(|l| ApplyTarget {
                id: l.id,
                how_to_apply: l.how_to_apply.clone(),
            })
            .collect())
    }

    async fn demote_lapsed_tiers(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.write()?;
        let mut demoted = 0;
        for listing in state.listings.values_mut() {
            if listing.tier_lapsed_at(now) {
                listing.ad_tier = AdTier::Basic;
                listing.updated_at = now;
                demoted += 1;
            }
        }
        Ok(demoted)
    }
}
