pub mod browse_service;
pub mod count_cache;
pub mod fx_service;
pub mod link_checker;
pub mod listing_service;
pub mod listing_store;
pub mod memory_listing_store;
pub mod pagination;
pub mod pg_listing_store;
pub mod relevance;
pub mod salary_service;
pub mod search_plan;
pub mod search_service;
