use reqwest::{Client, StatusCode};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::services::listing_service::ListingService;

/// Expires listings whose apply link has disappeared.
#[derive(Clone)]
pub struct LinkChecker {
    client: Client,
    listings: ListingService,
}

/// Only http(s) targets are checked; email addresses never are.
pub fn is_checkable(how_to_apply: &str) -> bool {
    let target = how_to_apply.trim();
    (target.starts_with("http://") || target.starts_with("https://"))
        && !target.starts_with("mailto:")
}

impl LinkChecker {
    pub fn new(client: Client, listings: ListingService) -> Self {
        Self { client, listings }
    }

    /// Returns how many listings were expired. Unreachable hosts are logged
    /// and left alone.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<usize> {
        let mut expired = 0;
        for target in self.listings.apply_targets().await? {
            if !is_checkable(&target.how_to_apply) {
                continue;
            }
            match self.client.get(target.how_to_apply.trim()).send().await {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    info!(listing_id = target.id, url = %target.how_to_apply, "apply link returned 404, expiring listing");
                    self.listings.expire(target.id).await?;
                    expired += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(listing_id = target.id, error = %e, "could not check apply link");
                }
            }
        }
        Ok(expired)
    }
}
