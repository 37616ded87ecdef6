use chrono::Utc;

use crate::error::Result;
use crate::models::listing::Listing;
use crate::models::search::{SearchRequest, SearchResult};
use crate::services::count_cache::{LandingCache, PINNED_KEY};
use crate::services::listing_store::NewListingCounts;
use crate::services::pagination;
use crate::services::search_service::SearchService;

/// Everything a listings page needs besides rendering.
#[derive(Debug, Clone)]
pub struct BrowsePage {
    /// Pinned block, filled only on the unfiltered first page. Neither listed
    /// in `result` nor counted in `result.total`.
    pub pinned: Vec<Listing>,
    pub result: SearchResult,
    pub page: i64,
    pub page_indexes: Vec<i64>,
    pub complementary_remote: bool,
    pub counts: NewListingCounts,
}

#[derive(Clone)]
pub struct BrowseService {
    search: SearchService,
    landing: LandingCache,
}

impl BrowseService {
    pub fn new(search: SearchService, landing: LandingCache) -> Self {
        Self { search, landing }
    }

    pub async fn browse(&self, request: SearchRequest) -> Result<BrowsePage> {
        let pinned = if request.include_pinned {
            self.landing
                .get_or_load(PINNED_KEY, || self.search.pinned())
                .await?
        } else {
            Vec::new()
        };

        // Pinned listings live only in the block above, never in the organic page.
        let organic = request.clone().with_pinned(false);
        let outcome = self.search.search_with_fallback(&organic).await?;
        let page_indexes =
            pagination::page_window(request.page, outcome.result.total, self.search.page_size());
        let counts = self.landing.new_listing_counts(Utc::now()).await?;

        Ok(BrowsePage {
            pinned,
            result: outcome.result,
            page: request.page,
            page_indexes,
            complementary_remote: outcome.complementary_remote,
            counts,
        })
    }
}
