use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::error::Result;
use crate::models::search::REMOTE_LOCATION;
use crate::services::listing_store::{ListingStore, SalarySample};

/// Padding applied around the observed salaries for chart axes.
const CHART_MARGIN: i64 = 30_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SalaryStats {
    pub mean: f64,
    pub std_dev: f64,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SalaryTrendPoint {
    /// First day of the month, `YYYY-MM-DD`.
    pub month: String,
    pub p10: i64,
    pub p25: i64,
    pub p50: i64,
    pub p75: i64,
    pub p90: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SalaryReport {
    pub location: String,
    pub currency: String,
    /// No data for the requested location, Remote figures are shown instead.
    pub substituted: bool,
    pub sample_count: usize,
    pub min_salary: SalaryStats,
    pub max_salary: SalaryStats,
    pub trend: Vec<SalaryTrendPoint>,
    pub chart_min: i64,
    pub chart_max: i64,
}

#[derive(Clone)]
pub struct SalaryService {
    store: Arc<dyn ListingStore>,
    default_currency: String,
}

impl SalaryService {
    pub fn new(store: Arc<dyn ListingStore>, default_currency: String) -> Self {
        Self {
            store,
            default_currency,
        }
    }

    pub async fn report(&self, location: &str, currency: &str) -> Result<SalaryReport> {
        let mut location = location.trim().to_string();
        let mut currency = currency.trim().to_uppercase();
        let mut substituted = false;

        let mut samples = self.store.salary_samples(&location, &currency).await?;
        if samples.is_empty() {
            info!(location = %location, currency = %currency, "no salary data, using Remote figures");
            location = REMOTE_LOCATION.to_string();
            currency = self.default_currency.clone();
            substituted = true;
            samples = self.store.salary_samples(&location, &currency).await?;
        }

        let mins: Vec<i64> = samples.iter().map(|s| s.min).collect();
        let maxes: Vec<i64> = samples.iter().map(|s| s.max).collect();
        let chart_min = mins.iter().min().map_or(0, |m| (m - CHART_MARGIN).max(0));
        let chart_max = maxes.iter().max().map_or(0, |m| m + CHART_MARGIN);

        Ok(SalaryReport {
            location,
            currency,
            substituted,
            sample_count: samples.len(),
            min_salary: describe(&mins),
            max_salary: describe(&maxes),
            trend: monthly_trend(&samples),
            chart_min,
            chart_max,
        })
    }
}

/// Mean, sample standard deviation and R-8 percentiles. All zero when empty.
pub fn describe(values: &[i64]) -> SalaryStats {
    if values.is_empty() {
        return SalaryStats::default();
    }
    let mut sorted: Vec<f64> = values.iter().map(|v| *v as f64).collect();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let std_dev = if sorted.len() < 2 {
        0.0
    } else {
        (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    };

    SalaryStats {
        mean,
        std_dev,
        p10: quantile(&sorted, 0.10),
        p50: quantile(&sorted, 0.50),
        p90: quantile(&sorted, 0.90),
    }
}

// Hyndman and Fan type 8, median-unbiased.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len() as f64;
    let h = (n + 1.0 / 3.0) * p + 1.0 / 3.0;
    if h <= 1.0 {
        return sorted[0];
    }
    if h >= n {
        return sorted[sorted.len() - 1];
    }
    let lower = h.floor();
    let i = lower as usize - 1;
    sorted[i] + (h - lower) * (sorted[i + 1] - sorted[i])
}

/// Smallest value whose cumulative share reaches `p`, like `percentile_disc`.
fn percentile_disc(sorted: &[i64], p: f64) -> i64 {
    let rank = (p * sorted.len() as f64 - 1e-9).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

/// Discrete percentiles of the maximum salary per calendar month, oldest
/// month first.
pub fn monthly_trend(samples: &[SalarySample]) -> Vec<SalaryTrendPoint> {
    let mut months: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for sample in samples {
        months
            .entry(sample.created_at.format("%Y-%m-01").to_string())
            .or_default()
            .push(sample.max);
    }

    months
        .into_iter()
        .map(|(month, mut values)| {
            values.sort_unstable();
            SalaryTrendPoint {
                month,
                p10: percentile_disc(&values, 0.10),
                p25: percentile_disc(&values, 0.25),
                p50: percentile_disc(&values, 0.50),
                p75: percentile_disc(&values, 0.75),
                p90: percentile_disc(&values, 0.90),
            }
        })
        .collect()
}
