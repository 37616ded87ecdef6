use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::dto::listing_dto::{CreateListingPayload, UpdateListingPayload};
use crate::error::{Error, Result};
use crate::models::listing::{AdTier, Listing, LISTING_COLUMNS};
use crate::services::listing_store::{
    ApplyTarget, ListingPage, ListingStore, NewListingCounts, SalarySample,
};
use crate::services::search_plan::{pinned_ranks, Predicate, QueryPlan, SortKey};

#[derive(Clone)]
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SqlArg {
    Text(String),
    Int(i64),
    Float(f64),
}

/// SQL for one plan. The first `count_arg_len` args are the filter binds and
/// are all the count query needs; ordering and window binds follow them.
#[derive(Debug)]
struct SqlPlan {
    items_sql: String,
    count_sql: String,
    args: Vec<SqlArg>,
    count_arg_len: usize,
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn prefixed_columns() -> String {
    LISTING_COLUMNS
        .split(", ")
        .map(|c| format!("l.{}", c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn rank_list() -> String {
    pinned_ranks()
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render(plan: &QueryPlan) -> SqlPlan {
    let mut args: Vec<SqlArg> = Vec::new();
    let mut joins: Vec<String> = Vec::new();
    let mut filters: Vec<String> = Vec::new();
    let mut text_arg: Option<usize> = None;

    for predicate in &plan.predicates {
        match predicate {
            Predicate::Searchable => {
                filters.push("l.approved_at IS NOT NULL AND l.expired = FALSE".to_string())
            }
            Predicate::ExcludePinned => filters.push(format!("l.ad_tier NOT IN ({})", rank_list())),
            Predicate::OnlyPinned => filters.push(format!("l.ad_tier IN ({})", rank_list())),
            Predicate::ExcludeId(id) => {
                args.push(SqlArg::Int(*id));
                filters.push(format!("l.id <> ${}", args.len()));
            }
            Predicate::LocationContains(location) => {
                args.push(SqlArg::Text(format!("%{}%", escape_like(location))));
                filters.push(format!("l.location ILIKE ${}", args.len()));
            }
            Predicate::TextMatches(terms) => {
                args.push(SqlArg::Text(terms.to_tsquery()));
                text_arg = Some(args.len());
                filters.push(format!(
                    "l.search_doc @@ to_tsquery('english', ${})",
                    args.len()
                ));
            }
            Predicate::SalaryAtLeast { floor, currency } => {
                args.push(SqlArg::Text(currency.clone()));
                joins.push(format!(
                    "LEFT JOIN fx_rates fx ON fx.base = l.currency AND fx.target = ${}",
                    args.len()
                ));
                args.push(SqlArg::Float(*floor as f64));
                filters.push(format!(
                    "COALESCE(fx.value, 1) * l.salary_max >= ${}",
                    args.len()
                ));
            }
        }
    }
    let count_arg_len = args.len();

    let mut order: Vec<String> = Vec::new();
    for key in &plan.order {
        match key {
            SortKey::TierDesc => order.push("l.ad_tier DESC".to_string()),
            SortKey::RelevanceDesc => {
                if let Some(n) = text_arg {
                    order.push(format!(
                        "ts_rank(l.search_doc, to_tsquery('english', ${})) DESC",
                        n
                    ));
                }
            }
            SortKey::LocationSimilarityDesc(location) => {
                args.push(SqlArg::Text(location.clone()));
                order.push(format!("word_similarity(${}, l.location) DESC", args.len()));
            }
            SortKey::ApprovedDesc => order.push("l.approved_at DESC".to_string()),
            SortKey::CreatedDesc => order.push("l.created_at DESC".to_string()),
            SortKey::IdDesc => order.push("l.id DESC".to_string()),
        }
    }

    let join_clause = joins.join(" ");
    let where_clause = if filters.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", filters.join(" AND "))
    };
    let order_clause = if order.is_empty() {
        String::new()
    } else {
        format!("ORDER BY {}", order.join(", "))
    };
    let window_clause = match plan.window {
        Some(window) => {
            args.push(SqlArg::Int(window.limit));
            args.push(SqlArg::Int(window.offset));
            format!("LIMIT ${} OFFSET ${}", args.len() - 1, args.len())
        }
        None => String::new(),
    };

    let items_sql = format!(
        "SELECT {} FROM listings l {} {} {} {}",
        prefixed_columns(),
        join_clause,
        where_clause,
        order_clause,
        window_clause
    );
    let count_sql = format!(
        "SELECT COUNT(*) FROM listings l {} {}",
        join_clause, where_clause
    );

    SqlPlan {
        items_sql,
        count_sql,
        args,
        count_arg_len,
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn query(&self, plan: &QueryPlan) -> Result<ListingPage> {
        let sql = render(plan);
        debug!(sql = %sql.items_sql, "listing query");

        let mut items_query = sqlx::query_as::<_, Listing>(&sql.items_sql);
        for arg in &sql.args {
            items_query = match arg {
                SqlArg::Text(v) => items_query.bind(v.as_str()),
                SqlArg::Int(v) => items_query.bind(*v),
                SqlArg::Float(v) => items_query.bind(*v),
            };
        }
        let items = items_query.fetch_all(&self.pool).await?;

        if plan.window.is_none() {
            let total = items.len() as i64;
            return Ok(ListingPage { items, total });
        }

        let mut count_query = sqlx::query_scalar::<_, i64>(&sql.count_sql);
        for arg in &sql.args[..sql.count_arg_len] {
            count_query = match arg {
                SqlArg::Text(v) => count_query.bind(v.as_str()),
                SqlArg::Int(v) => count_query.bind(*v),
                SqlArg::Float(v) => count_query.bind(*v),
            };
        }
        let total = count_query.fetch_one(&self.pool).await?;

        Ok(ListingPage { items, total })
    }

    async fn get(&self, id: i64) -> Result<Listing> {
        let sql = format!("SELECT {} FROM listings WHERE id = $1", LISTING_COLUMNS);
        let listing = sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(listing)
    }

    async fn get_by_external_id(&self, external_id: Uuid) -> Result<Listing> {
        let sql = format!(
            "SELECT {} FROM listings WHERE external_id = $1",
            LISTING_COLUMNS
        );
        let listing = sqlx::query_as::<_, Listing>(&sql)
            .bind(external_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(listing)
    }

    async fn create(&self, payload: CreateListingPayload) -> Result<Listing> {
        let sql = format!(
            r#"
            INSERT INTO listings (
                external_id, title, company, company_email, location,
                description, how_to_apply, perks, interview_process,
                salary_min, salary_max, currency, salary_period
            ) VALUES (
                $1,$2,$3,$4,$5,
                $6,$7,$8,$9,
                $10,$11,$12,$13
            )
            RETURNING {}
            "#,
            LISTING_COLUMNS
        );
        let listing = sqlx::query_as::<_, Listing>(&sql)
            .bind(Uuid::new_v4())
            .bind(payload.title)
            .bind(payload.company)
            .bind(payload.company_email)
            .bind(payload.location)
            .bind(payload.description)
            .bind(payload.how_to_apply)
            .bind(payload.perks)
            .bind(payload.interview_process)
            .bind(payload.salary_min)
            .bind(payload.salary_max)
            .bind(payload.currency.to_uppercase())
            .bind(payload.salary_period.unwrap_or_else(|| "year".to_string()))
            .fetch_one(&self.pool)
            .await?;
        Ok(listing)
    }

    async fn update_fields(&self, id: i64, payload: UpdateListingPayload) -> Result<Listing> {
        let sql = format!(
            r#"
            UPDATE listings
            SET
                title = COALESCE($2, title),
                company = COALESCE($3, company),
                company_email = COALESCE($4, company_email),
                location = COALESCE($5, location),
                description = COALESCE($6, description),
                how_to_apply = COALESCE($7, how_to_apply),
                perks = COALESCE($8, perks),
                interview_process = COALESCE($9, interview_process),
                salary_min = COALESCE($10, salary_min),
                salary_max = COALESCE($11, salary_max),
                currency = COALESCE($12, currency),
                salary_period = COALESCE($13, salary_period),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LISTING_COLUMNS
        );
        let listing = sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .bind(payload.title)
            .bind(payload.company)
            .bind(payload.company_email)
            .bind(payload.location)
            .bind(payload.description)
            .bind(payload.how_to_apply)
            .bind(payload.perks)
            .bind(payload.interview_process)
            .bind(payload.salary_min)
            .bind(payload.salary_max)
            .bind(payload.currency.map(|c| c.to_uppercase()))
            .bind(payload.salary_period)
            .fetch_one(&self.pool)
            .await?;
        Ok(listing)
    }

    async fn approve(&self, id: i64, now: DateTime<Utc>) -> Result<Listing> {
        let sql = format!(
            "UPDATE listings SET approved_at = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            LISTING_COLUMNS
        );
        let listing = sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(listing)
    }

    async fn disapprove(&self, id: i64) -> Result<Listing> {
        let sql = format!(
            "UPDATE listings SET approved_at = NULL, updated_at = NOW() WHERE id = $1 RETURNING {}",
            LISTING_COLUMNS
        );
        let listing = sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(listing)
    }

    async fn mark_expired(&self, id: i64) -> Result<()> {
        let result =
            sqlx::query("UPDATE listings SET expired = TRUE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Listing {} not found", id)));
        }
        Ok(())
    }

    async fn set_tier(&self, id: i64, tier: AdTier) -> Result<Listing> {
        let sql = format!(
            "UPDATE listings SET ad_tier = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            LISTING_COLUMNS
        );
        let listing = sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .bind(tier)
            .fetch_one(&self.pool)
            .await?;
        Ok(listing)
    }

    async fn record_view(&self, id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE listings SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Listing {} not found", id)));
        }
        Ok(())
    }

    async fn record_clickout(&self, id: i64) -> Result<()> {
        let result =
            sqlx::query("UPDATE listings SET clickout_count = clickout_count + 1 WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Listing {} not found", id)));
        }
        Ok(())
    }

    async fn new_listing_counts(&self, now: DateTime<Utc>) -> Result<NewListingCounts> {
        let (last_week, last_month) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE approved_at >= $1),
                COUNT(*) FILTER (WHERE approved_at >= $2)
            FROM listings
            WHERE approved_at IS NOT NULL
            "#,
        )
        .bind(now - Duration::days(7))
        .bind(now - Duration::days(30))
        .fetch_one(&self.pool)
        .await?;
        Ok(NewListingCounts {
            last_week,
            last_month,
        })
    }

    async fn salary_samples(&self, location: &str, currency: &str) -> Result<Vec<SalarySample>> {
        let rows = sqlx::query_as::<_, (i64, i64, DateTime<Utc>)>(
            r#"
            SELECT salary_min, salary_max, created_at
            FROM listings
            WHERE approved_at IS NOT NULL
              AND currency = $1
              AND location ILIKE $2
              AND salary_period = 'year'
            ORDER BY created_at ASC
            "#,
        )
        .bind(currency)
        .bind(format!("%{}%", escape_like(location)))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(min, max, created_at)| SalarySample {
                min,
                max,
                created_at,
            })
            .collect())
    }

    async fn apply_targets(&self) -> Result<Vec<ApplyTarget>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, how_to_apply FROM listings WHERE approved_at IS NOT NULL AND expired = FALSE ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, how_to_apply)| ApplyTarget { id, how_to_apply })
            .collect())
    }

    async fn demote_lapsed_tiers(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut demoted = 0;
        for tier in AdTier::PINNED {
            let result = sqlx::query(
                r#"
                UPDATE listings
                SET ad_tier = $1, updated_at = NOW()
                WHERE ad_tier = $2 AND approved_at IS NOT NULL AND approved_at < $3
                "#,
            )
            .bind(AdTier::Basic)
            .bind(tier)
            .bind(now - Duration::days(tier.duration_days()))
            .execute(&self.pool)
            .await?;
            demoted += result.rows_affected();
        }
        Ok(demoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::search::SearchRequest;

    #[test]
    fn unfiltered_plan_renders_without_binds_besides_the_window() {
        let plan = QueryPlan::for_search(&SearchRequest::new("", "", 2).with_pinned(true), 10);
        let sql = render(&plan);
        assert!(sql
            .items_sql
            .contains("WHERE l.approved_at IS NOT NULL AND l.expired = FALSE"));
        assert!(sql
            .items_sql
            .contains("ORDER BY l.ad_tier DESC, l.created_at DESC, l.id DESC"));
        assert!(sql.items_sql.ends_with("LIMIT $1 OFFSET $2"));
        assert_eq!(sql.args, vec![SqlArg::Int(10), SqlArg::Int(10)]);
        assert_eq!(sql.count_arg_len, 0);
        assert!(!sql.count_sql.contains("LIMIT"));
    }

    #[test]
    fn filters_share_placeholders_with_the_count_query() {
        let request = SearchRequest::new("Berlin", "rust|go", 1).with_salary(50000, "USD");
        let sql = render(&QueryPlan::for_search(&request, 10));

        assert!(sql.items_sql.contains("l.ad_tier NOT IN (3, 4, 5)"));
        assert!(sql.items_sql.contains("l.location ILIKE $1"));
        assert!(sql
            .items_sql
            .contains("l.search_doc @@ to_tsquery('english', $2)"));
        assert!(sql
            .items_sql
            .contains("LEFT JOIN fx_rates fx ON fx.base = l.currency AND fx.target = $3"));
        assert!(sql.items_sql.contains("COALESCE(fx.value, 1) * l.salary_max >= $4"));
        assert!(sql
            .items_sql
            .contains("ORDER BY ts_rank(l.search_doc, to_tsquery('english', $2)) DESC"));
        assert_eq!(sql.count_arg_len, 4);
        assert_eq!(
            &sql.args[..4],
            &[
                SqlArg::Text("%Berlin%".into()),
                SqlArg::Text("rust | go".into()),
                SqlArg::Text("USD".into()),
                SqlArg::Float(50000.0),
            ]
        );
        assert!(sql.count_sql.contains("fx.target = $3"));
        assert!(!sql.count_sql.contains("$5"));
    }

    #[test]
    fn related_plan_orders_by_word_similarity_after_filter_binds() {
        let sql = render(&QueryPlan::for_related(42, "London", 3));
        assert!(sql.items_sql.contains("l.id <> $1"));
        assert!(sql
            .items_sql
            .contains("ORDER BY l.ad_tier DESC, word_similarity($2, l.location) DESC"));
        assert_eq!(sql.count_arg_len, 1);
        assert_eq!(sql.args.len(), 4);
    }

    #[test]
    fn pinned_plan_has_no_window() {
        let sql = render(&QueryPlan::pinned());
        assert!(sql.items_sql.contains("l.ad_tier IN (3, 4, 5)"));
        assert!(!sql.items_sql.contains("LIMIT"));
        assert!(sql.args.is_empty());
    }

    #[test]
    fn like_wildcards_in_locations_are_escaped() {
        assert_eq!(escape_like("100%_remote\\"), "100\\%\\_remote\\\\");
    }
}
