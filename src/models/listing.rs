use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Sponsorship level of a listing. The discriminant is the display priority
/// rank stored in `listings.ad_tier`; higher ranks sort first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum AdTier {
    Basic = 0,
    SponsoredBackground = 1,
    WithCompanyLogo = 2,
    #[serde(rename = "pinned_for_7_days")]
    PinnedFor7Days = 3,
    #[serde(rename = "pinned_for_30_days")]
    PinnedFor30Days = 4,
    #[serde(rename = "pinned_for_60_days")]
    PinnedFor60Days = 5,
}

impl AdTier {
    pub const ALL: [AdTier; 6] = [
        AdTier::Basic,
        AdTier::SponsoredBackground,
        AdTier::WithCompanyLogo,
        AdTier::PinnedFor7Days,
        AdTier::PinnedFor30Days,
        AdTier::PinnedFor60Days,
    ];

    pub const PINNED: [AdTier; 3] = [
        AdTier::PinnedFor7Days,
        AdTier::PinnedFor30Days,
        AdTier::PinnedFor60Days,
    ];

    pub fn rank(self) -> i16 {
        self as i16
    }

    pub fn is_pinned(self) -> bool {
        Self::PINNED.contains(&self)
    }

    /// Price in USD cents charged by the checkout flow.
    pub fn price_cents(self) -> i64 {
        match self {
            AdTier::Basic => 3900,
            AdTier::SponsoredBackground => 3900,
            AdTier::WithCompanyLogo => 4900,
            AdTier::PinnedFor7Days => 5900,
            AdTier::PinnedFor30Days => 12900,
            AdTier::PinnedFor60Days => 19900,
        }
    }

    pub fn duration_days(self) -> i64 {
        match self {
            AdTier::PinnedFor7Days => 7,
            AdTier::PinnedFor30Days => 30,
            AdTier::PinnedFor60Days => 60,
            _ => 90,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AdTier::Basic => "Standard Ad",
            AdTier::SponsoredBackground => "Sponsored Ad Highlighted Background",
            AdTier::WithCompanyLogo => "Standard Ad With Company Logo",
            AdTier::PinnedFor7Days => "Sponsored Ad Pinned For 7 Days",
            AdTier::PinnedFor30Days => "Sponsored Ad Pinned For 30 Days",
            AdTier::PinnedFor60Days => "Sponsored Ad Pinned For 60 Days",
        }
    }
}

impl Default for AdTier {
    fn default() -> Self {
        AdTier::Basic
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Listing {
    pub id: i64,
    pub external_id: Uuid,
    pub title: String,
    pub company: String,
    pub company_email: String,
    pub location: String,
    pub description: String,
    pub how_to_apply: String,
    pub perks: Option<String>,
    pub interview_process: Option<String>,
    pub salary_min: i64,
    pub salary_max: i64,
    pub currency: String,
    pub salary_period: String,
    pub ad_tier: AdTier,
    pub approved_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub view_count: i64,
    pub clickout_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Eligible for public search results.
    pub fn is_searchable(&self) -> bool {
        self.approved_at.is_some() && !self.expired
    }

    /// A pinned tier whose pin period has run out since approval.
    pub fn tier_lapsed_at(&self, now: DateTime<Utc>) -> bool {
        match self.approved_at {
            Some(approved_at) if self.ad_tier.is_pinned() => {
                approved_at + Duration::days(self.ad_tier.duration_days()) < now
            }
            _ => false,
        }
    }
}

pub const LISTING_COLUMNS: &str = "id, external_id, title, company, company_email, location, description, how_to_apply, perks, interview_process, salary_min, salary_max, currency, salary_period, ad_tier, approved_at, expired, view_count, clickout_count, created_at, updated_at";
