use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::listing::Listing;

pub const REMOTE_LOCATION: &str = "Remote";

/// Visitor filters for one result page. `page` is 1-based and already
/// normalised by the caller; `salary_floor == 0` means unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub location: String,
    pub tag: String,
    pub salary_floor: i64,
    pub currency: String,
    pub page: i64,
    pub include_pinned: bool,
}

impl SearchRequest {
    pub fn new(location: impl Into<String>, tag: impl Into<String>, page: i64) -> Self {
        Self {
            location: location.into(),
            tag: tag.into(),
            salary_floor: 0,
            currency: String::new(),
            page,
            include_pinned: false,
        }
    }

    pub fn with_salary(mut self, floor: i64, currency: impl Into<String>) -> Self {
        self.salary_floor = floor;
        self.currency = currency.into();
        self
    }

    pub fn with_pinned(mut self, include_pinned: bool) -> Self {
        self.include_pinned = include_pinned;
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.location.trim().is_empty() && self.tag.trim().is_empty() && self.salary_floor == 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    pub listings: Vec<Listing>,
    /// Matches across all pages, before slicing.
    pub total: i64,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
