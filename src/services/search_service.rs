use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::models::exchange_rate::is_currency_code;
use crate::models::listing::Listing;
use crate::models::search::{SearchRequest, SearchResult, REMOTE_LOCATION};
use crate::services::listing_store::ListingStore;
use crate::services::search_plan::QueryPlan;

/// Result of a search after the empty-result relaxations.
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    pub result: SearchResult,
    /// Set when the visitor's location was replaced by Remote.
    pub complementary_remote: bool,
    /// Engine calls made, 1 to 3.
    pub attempts: u8,
}

#[derive(Clone)]
pub struct SearchService {
    store: Arc<dyn ListingStore>,
    page_size: i64,
    related_limit: i64,
}

impl SearchService {
    pub fn new(store: Arc<dyn ListingStore>, page_size: i64, related_limit: i64) -> Self {
        Self {
            store,
            page_size,
            related_limit,
        }
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// One page of matches for `request`. No match is an empty result, not an
    /// error; the page number must already be normalised.
    #[instrument(skip(self))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        let currency = request.currency.trim();
        if request.salary_floor > 0 && !currency.is_empty() && !is_currency_code(currency) {
            return Err(Error::BadRequest(format!(
                "Malformed currency code: {}",
                currency
            )));
        }

        let plan = QueryPlan::for_search(request, self.page_size);
        let page = self.store.query(&plan).await?;
        Ok(SearchResult {
            listings: page.items,
            total: page.total,
        })
    }

    /// Runs `request`; when its page is empty, retries with location Remote,
    /// then with location Remote and no tag. Salary filters are never relaxed
    /// and there is no third retry.
    pub async fn search_with_fallback(&self, request: &SearchRequest) -> Result<CascadeOutcome> {
        let result = self.search(request).await?;
        if !result.is_empty() {
            return Ok(CascadeOutcome {
                result,
                complementary_remote: false,
                attempts: 1,
            });
        }

        let mut relaxed = request.clone();
        relaxed.location = REMOTE_LOCATION.to_string();
        info!(location = %request.location, tag = %request.tag, "no matches, retrying with Remote location");
        let result = self.search(&relaxed).await?;
        if !result.is_empty() {
            return Ok(CascadeOutcome {
                result,
                complementary_remote: true,
                attempts: 2,
            });
        }

        relaxed.tag.clear();
        info!(tag = %request.tag, "no Remote matches, retrying without tag");
        let result = self.search(&relaxed).await?;
        Ok(CascadeOutcome {
            result,
            complementary_remote: true,
            attempts: 3,
        })
    }

    /// Listings to show next to `listing`, closest locations first.
    pub async fn related_to(&self, listing: &Listing) -> Result<Vec<Listing>> {
        let plan = QueryPlan::for_related(listing.id, &listing.location, self.related_limit);
        Ok(self.store.query(&plan).await?.items)
    }

    /// Every searchable pinned listing, newest approval first.
    pub async fn pinned(&self) -> Result<Vec<Listing>> {
        Ok(self.store.query(&QueryPlan::pinned()).await?.items)
    }
}
