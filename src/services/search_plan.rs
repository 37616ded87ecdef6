//! Query plans for the listing store.
//!
//! A [`QueryPlan`] is a conjunction of independent [`Predicate`]s, an ordered
//! list of [`SortKey`]s and an optional page [`Window`]. Each filter rule is
//! added on its own, so any combination of location, tag and salary filters
//! yields a single plan rather than one hand-written query per combination.
//! Store backends translate the plan (SQL for Postgres, direct evaluation for
//! the in-memory store).

use crate::models::listing::AdTier;
use crate::models::search::SearchRequest;
use crate::services::pagination;

/// OR-combined full-text terms parsed from a tag filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermQuery {
    terms: Vec<String>,
}

impl TermQuery {
    /// Pipes and commas act as separators, whitespace runs collapse, and each
    /// term keeps only its alphanumeric characters. Returns `None` when no term
    /// survives.
    pub fn parse(tag: &str) -> Option<Self> {
        let terms: Vec<String> = tag
            .replace(['|', ','], " ")
            .split_whitespace()
            .map(|word| {
                word.chars()
                    .filter(|c| c.is_alphanumeric())
                    .flat_map(char::to_lowercase)
                    .collect::<String>()
            })
            .filter(|word| !word.is_empty())
            .collect();

        if terms.is_empty() {
            None
        } else {
            Some(Self { terms })
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// `to_tsquery` syntax: `rust | golang`.
    pub fn to_tsquery(&self) -> String {
        self.terms.join(" | ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Approved and not expired.
    Searchable,
    ExcludePinned,
    OnlyPinned,
    ExcludeId(i64),
    /// Case-insensitive substring of the location field.
    LocationContains(String),
    /// Full-text match of title, company and description.
    TextMatches(TermQuery),
    /// `salary_max` converted into `currency` is at least `floor`.
    SalaryAtLeast { floor: i64, currency: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    TierDesc,
    RelevanceDesc,
    LocationSimilarityDesc(String),
    ApprovedDesc,
    CreatedDesc,
    IdDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub predicates: Vec<Predicate>,
    pub order: Vec<SortKey>,
    pub window: Option<Window>,
}

impl QueryPlan {
    pub fn for_search(request: &SearchRequest, page_size: i64) -> Self {
        let mut predicates = vec![Predicate::Searchable];
        if !request.include_pinned {
            predicates.push(Predicate::ExcludePinned);
        }

        let location = request.location.trim();
        if !location.is_empty() {
            predicates.push(Predicate::LocationContains(location.to_string()));
        }

        let terms = TermQuery::parse(&request.tag);
        if let Some(terms) = &terms {
            predicates.push(Predicate::TextMatches(terms.clone()));
        }

        let currency = request.currency.trim();
        if request.salary_floor > 0 && !currency.is_empty() {
            predicates.push(Predicate::SalaryAtLeast {
                floor: request.salary_floor,
                currency: currency.to_uppercase(),
            });
        }

        let mut order = Vec::with_capacity(4);
        if request.include_pinned {
            order.push(SortKey::TierDesc);
        }
        if terms.is_some() {
            order.push(SortKey::RelevanceDesc);
        }
        order.push(SortKey::CreatedDesc);
        order.push(SortKey::IdDesc);

        Self {
            predicates,
            order,
            window: Some(Window {
                offset: pagination::offset(request.page, page_size),
                limit: page_size,
            }),
        }
    }

    /// Listings shown next to `listing_id`: same tier-first ordering, then
    /// closeness to `location`.
    pub fn for_related(listing_id: i64, location: &str, limit: i64) -> Self {
        Self {
            predicates: vec![Predicate::Searchable, Predicate::ExcludeId(listing_id)],
            order: vec![
                SortKey::TierDesc,
                SortKey::LocationSimilarityDesc(location.trim().to_string()),
                SortKey::CreatedDesc,
                SortKey::IdDesc,
            ],
            window: Some(Window { offset: 0, limit }),
        }
    }

    /// Every searchable pinned listing, newest approval first. Unpaginated.
    pub fn pinned() -> Self {
        Self {
            predicates: vec![Predicate::Searchable, Predicate::OnlyPinned],
            order: vec![SortKey::ApprovedDesc, SortKey::IdDesc],
            window: None,
        }
    }

    pub fn text_query(&self) -> Option<&TermQuery> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::TextMatches(terms) => Some(terms),
            _ => None,
        })
    }

    pub fn salary_filter(&self) -> Option<(i64, &str)> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::SalaryAtLeast { floor, currency } => Some((*floor, currency.as_str())),
            _ => None,
        })
    }
}

pub fn pinned_ranks() -> Vec<i16> {
    AdTier::PINNED.iter().map(|t| t.rank()).collect()
}
