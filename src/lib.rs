pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::services::{
    browse_service::BrowseService,
    count_cache::{AggregateCache, InMemoryAggregateCache, LandingCache},
    fx_service::{ExchangeRates, PgExchangeRates},
    listing_service::ListingService,
    listing_store::ListingStore,
    pg_listing_store::PgListingStore,
    salary_service::SalaryService,
    search_service::SearchService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub listing_service: ListingService,
    pub browse_service: BrowseService,
    pub salary_service: SalaryService,
    pub rates: Arc<dyn ExchangeRates>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let rates: Arc<dyn ExchangeRates> = Arc::new(PgExchangeRates::new(pool.clone()));
        let store: Arc<dyn ListingStore> = Arc::new(PgListingStore::new(pool));
        Self::from_parts(config, store, rates, Arc::new(InMemoryAggregateCache::new()))
    }

    /// Wires the services over any store, rate table and cache.
    pub fn from_parts(
        config: Config,
        store: Arc<dyn ListingStore>,
        rates: Arc<dyn ExchangeRates>,
        cache: Arc<dyn AggregateCache>,
    ) -> Self {
        let search = SearchService::new(
            store.clone(),
            config.jobs_per_page,
            config.related_listings_limit,
        );
        let landing = LandingCache::new(cache, store.clone());
        let listing_service = ListingService::new(store.clone(), search.clone(), landing.clone());
        let browse_service = BrowseService::new(search, landing);
        let salary_service = SalaryService::new(store, config.default_currency.clone());

        Self {
            config: Arc::new(config),
            listing_service,
            browse_service,
            salary_service,
            rates,
        }
    }
}
