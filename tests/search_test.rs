mod common;

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use common::{day, ids, search_over, store_with, ListingBuilder};
use listings_backend::error::Error;
use listings_backend::models::listing::{AdTier, Listing};
use listings_backend::models::search::SearchRequest;
use listings_backend::services::fx_service::{conversion_multiplier, MemoryExchangeRates};
use listings_backend::services::listing_store::ListingStore;
use listings_backend::services::relevance;
use listings_backend::services::search_plan::TermQuery;
use listings_backend::services::search_service::SearchService;

fn rates() -> Arc<MemoryExchangeRates> {
    Arc::new(
        MemoryExchangeRates::new()
            .with_rate("EUR", "USD", 1.1)
            .with_rate("GBP", "USD", 1.25)
            .with_rate("USD", "EUR", 0.9),
    )
}

fn corpus() -> Vec<Listing> {
    let locations = [
        "Berlin",
        "Berlin / Remote",
        "London",
        "Remote",
        "New York",
        "berlin-mitte",
    ];
    let currencies = ["EUR", "USD", "GBP", "JPY"];
    (1..=40)
        .map(|id| {
            let idx = id as usize;
            let mut description = String::from("Backend services");
            if id % 3 == 0 {
                description.push_str(" in Rust");
            }
            if id % 4 == 0 {
                description.push_str(" and Go");
            }
            if id % 6 == 0 {
                description.push_str(", mostly rust");
            }
            let mut builder = ListingBuilder::new(id)
                .location(locations[idx % locations.len()])
                .tier(AdTier::ALL[(idx * 7) % AdTier::ALL.len()])
                .created_day(id % 9)
                .description(&description)
                .salary(30000, 40000 + (id * 7919 % 100) * 1000, currencies[idx % 4]);
            if id % 11 == 0 {
                builder = builder.unapproved();
            }
            if id % 13 == 0 {
                builder = builder.expired();
            }
            builder.build()
        })
        .collect()
}

fn compare_for(request: &SearchRequest, a: &Listing, b: &Listing) -> Ordering {
    if request.include_pinned {
        let ord = a.ad_tier.rank().cmp(&b.ad_tier.rank());
        if ord != Ordering::Equal {
            return ord;
        }
    }
    if let Some(terms) = TermQuery::parse(&request.tag) {
        let score = |l: &Listing| {
            relevance::rank(&relevance::listing_document(l), &terms).unwrap_or(0.0)
        };
        let ord = score(a).total_cmp(&score(b));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    (a.created_at, a.id).cmp(&(b.created_at, b.id))
}

async fn assert_properties(search: &SearchService, rates: &MemoryExchangeRates, request: SearchRequest) {
    let result = search.search(&request).await.unwrap();
    assert!(result.listings.len() as i64 <= result.total);

    for listing in &result.listings {
        assert!(listing.approved_at.is_some(), "{:?}", request);
        assert!(!listing.expired, "{:?}", request);
        if !request.include_pinned {
            assert!(!listing.ad_tier.is_pinned(), "{:?}", request);
        }
        if !request.location.is_empty() {
            assert!(
                listing
                    .location
                    .to_lowercase()
                    .contains(&request.location.to_lowercase()),
                "{:?}",
                request
            );
        }
        if request.salary_floor > 0 {
            let multiplier = conversion_multiplier(rates, &listing.currency, &request.currency)
                .await
                .unwrap();
            assert!(
                listing.salary_max as f64 * multiplier >= request.salary_floor as f64,
                "{:?}",
                request
            );
        }
    }

    for pair in result.listings.windows(2) {
        assert_eq!(
            compare_for(&request, &pair[0], &pair[1]),
            Ordering::Greater,
            "{:?}",
            request
        );
    }
}

#[tokio::test]
async fn every_returned_listing_satisfies_the_filters() {
    let rates = rates();
    let store = store_with(rates.clone(), corpus());
    let search = SearchService::new(store, 50, 3);

    let requests = vec![
        SearchRequest::new("", "", 1).with_pinned(true),
        SearchRequest::new("", "", 1),
        SearchRequest::new("berlin", "", 1),
        SearchRequest::new("BERLIN", "rust", 1),
        SearchRequest::new("", "rust|go", 1),
        SearchRequest::new("", "go, rust", 1).with_pinned(true),
        SearchRequest::new("", "", 1).with_salary(100000, "USD"),
        SearchRequest::new("Remote", "", 1).with_salary(60000, "EUR"),
        SearchRequest::new("London", "rust", 1).with_salary(40000, "GBP"),
    ];
    for request in requests {
        assert_properties(&search, &rates, request).await;
    }
}

#[tokio::test]
async fn pinned_listings_lead_only_when_included() {
    let a = ListingBuilder::new(1)
        .location("Berlin")
        .tier(AdTier::Basic)
        .created_day(3)
        .build();
    let b = ListingBuilder::new(2)
        .location("Berlin")
        .tier(AdTier::PinnedFor30Days)
        .created_day(1)
        .build();
    let (search, _) = search_over(vec![a, b], 10);

    let with_pinned = search
        .search(&SearchRequest::new("Berlin", "", 1).with_pinned(true))
        .await
        .unwrap();
    assert_eq!(ids(&with_pinned.listings), vec![2, 1]);
    assert_eq!(with_pinned.total, 2);

    let without = search
        .search(&SearchRequest::new("Berlin", "", 1))
        .await
        .unwrap();
    assert_eq!(ids(&without.listings), vec![1]);
    assert_eq!(without.total, 1);
}

#[tokio::test]
async fn salary_floor_compares_converted_maximum() {
    let listing = ListingBuilder::new(1).salary(90000, 100000, "EUR").build();
    let rates = Arc::new(MemoryExchangeRates::new().with_rate("EUR", "USD", 1.1));
    let search = SearchService::new(store_with(rates, vec![listing]), 10, 3);

    let matched = search
        .search(&SearchRequest::new("", "", 1).with_salary(105000, "USD"))
        .await
        .unwrap();
    assert_eq!(ids(&matched.listings), vec![1]);

    let missed = search
        .search(&SearchRequest::new("", "", 1).with_salary(115000, "USD"))
        .await
        .unwrap();
    assert!(missed.listings.is_empty());
    assert_eq!(missed.total, 0);
}

#[tokio::test]
async fn unknown_currency_pairs_compare_unconverted() {
    let listing = ListingBuilder::new(1).salary(100000, 120000, "JPY").build();
    let (search, _) = search_over(vec![listing], 10);

    let result = search
        .search(&SearchRequest::new("", "", 1).with_salary(110000, "USD"))
        .await
        .unwrap();
    assert_eq!(ids(&result.listings), vec![1]);
}

#[tokio::test]
async fn malformed_currency_is_reported() {
    let (search, _) = search_over(vec![ListingBuilder::new(1).build()], 10);
    let err = search
        .search(&SearchRequest::new("", "", 1).with_salary(10000, "dollars"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn pages_concatenate_to_the_full_ordering() {
    let rates = rates();
    let store = store_with(rates, corpus());
    let full = SearchService::new(store.clone(), 1000, 3)
        .search(&SearchRequest::new("", "", 1).with_pinned(true))
        .await
        .unwrap();
    assert!(full.total > 20);

    let paged = SearchService::new(store, 7, 3);
    let last_page = (full.total + 6) / 7;
    let mut concatenated = Vec::new();
    for page in 1..=last_page {
        let result = paged
            .search(&SearchRequest::new("", "", page).with_pinned(true))
            .await
            .unwrap();
        assert_eq!(result.total, full.total);
        assert!(result.listings.len() <= 7);
        concatenated.extend(result.listings);
    }

    assert_eq!(ids(&concatenated), ids(&full.listings));
    let unique: HashSet<i64> = ids(&concatenated).into_iter().collect();
    assert_eq!(unique.len() as i64, full.total);
}

#[tokio::test]
async fn newest_first_with_id_as_last_tiebreak() {
    let listings = vec![
        ListingBuilder::new(1).created_day(1).build(),
        ListingBuilder::new(2).created_day(5).build(),
        ListingBuilder::new(3).created_day(5).build(),
        ListingBuilder::new(4).created_day(2).build(),
    ];
    let (search, _) = search_over(listings, 10);
    let result = search.search(&SearchRequest::new("", "", 1)).await.unwrap();
    assert_eq!(ids(&result.listings), vec![3, 2, 4, 1]);
}

#[tokio::test]
async fn tag_terms_are_or_combined_and_ranked() {
    let listings = vec![
        ListingBuilder::new(1)
            .title("Rust Engineer")
            .description("Rust services and rust tooling")
            .created_day(1)
            .build(),
        ListingBuilder::new(2)
            .title("Backend Engineer")
            .description("Some Rust")
            .created_day(9)
            .build(),
        ListingBuilder::new(3)
            .title("Go Engineer")
            .description("Golang microservices")
            .created_day(5)
            .build(),
        ListingBuilder::new(4)
            .title("Frontend Engineer")
            .description("TypeScript")
            .created_day(7)
            .build(),
    ];
    let (search, _) = search_over(listings, 10);

    let rust = search.search(&SearchRequest::new("", "rust", 1)).await.unwrap();
    assert_eq!(ids(&rust.listings), vec![1, 2]);

    let either = search
        .search(&SearchRequest::new("", " rust | go ", 1))
        .await
        .unwrap();
    assert_eq!(either.total, 3);
    assert_eq!(either.listings[0].id, 1);

    let none = search.search(&SearchRequest::new("", "cobol", 1)).await.unwrap();
    assert!(none.listings.is_empty());
    assert_eq!(none.total, 0);
}

#[tokio::test]
async fn location_matches_any_alternative_case_insensitively() {
    let listings = vec![
        ListingBuilder::new(1).location("London / Remote").build(),
        ListingBuilder::new(2).location("Remote").build(),
        ListingBuilder::new(3).location("Berlin").build(),
    ];
    let (search, _) = search_over(listings, 10);
    let result = search.search(&SearchRequest::new("remote", "", 1)).await.unwrap();
    let mut found = ids(&result.listings);
    found.sort();
    assert_eq!(found, vec![1, 2]);
}

#[tokio::test]
async fn lifecycle_changes_apply_to_the_next_query() {
    let (search, store) = search_over(
        vec![
            ListingBuilder::new(1).build(),
            ListingBuilder::new(2).unapproved().build(),
        ],
        10,
    );
    let request = SearchRequest::new("Berlin", "", 1);
    assert_eq!(ids(&search.search(&request).await.unwrap().listings), vec![1]);

    tokio_test::assert_ok!(store.approve(2, day(4)).await);
    tokio_test::assert_ok!(store.mark_expired(1).await);
    let result = tokio_test::assert_ok!(search.search(&request).await);
    assert_eq!(ids(&result.listings), vec![2]);
}

#[tokio::test]
async fn related_listings_rank_tier_then_location() {
    let reference = ListingBuilder::new(1).location("London").build();
    let listings = vec![
        reference.clone(),
        ListingBuilder::new(2).location("Tokyo").created_day(9).build(),
        ListingBuilder::new(3).location("London / Remote").created_day(1).build(),
        ListingBuilder::new(4)
            .location("Paris")
            .tier(AdTier::PinnedFor7Days)
            .build(),
        ListingBuilder::new(5).location("Londres").created_day(2).build(),
    ];
    let (search, _) = search_over(listings, 10);

    let related = search.related_to(&reference).await.unwrap();
    assert_eq!(ids(&related), vec![4, 3, 5]);
}

#[tokio::test]
async fn pinned_block_is_newest_approval_first() {
    let listings = vec![
        ListingBuilder::new(1)
            .tier(AdTier::PinnedFor7Days)
            .approved_day(2)
            .build(),
        ListingBuilder::new(2)
            .tier(AdTier::PinnedFor60Days)
            .approved_day(1)
            .build(),
        ListingBuilder::new(3)
            .tier(AdTier::PinnedFor30Days)
            .approved_day(3)
            .build(),
        ListingBuilder::new(4).tier(AdTier::WithCompanyLogo).build(),
        ListingBuilder::new(5)
            .tier(AdTier::PinnedFor30Days)
            .expired()
            .build(),
    ];
    let (search, _) = search_over(listings, 1);
    assert_eq!(ids(&search.pinned().await.unwrap()), vec![3, 1, 2]);
}
