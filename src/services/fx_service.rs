use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::models::exchange_rate::ExchangeRate;

/// Multiplier used when no rate is stored for a currency pair.
pub const DEFAULT_MULTIPLIER: f64 = 1.0;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeRates: Send + Sync {
    /// Latest stored rate converting `base` into `target`, if any.
    async fn rate(&self, base: &str, target: &str) -> Result<Option<f64>>;

    async fn upsert(&self, rate: &ExchangeRate) -> Result<()>;

    async fn list(&self) -> Result<Vec<ExchangeRate>>;
}

/// Converts amounts from `base` into `target`. Same-currency conversions and
/// pairs without a stored rate use [`DEFAULT_MULTIPLIER`], so listings in
/// unsupported currencies are compared unconverted instead of dropped.
pub async fn conversion_multiplier(
    rates: &dyn ExchangeRates,
    base: &str,
    target: &str,
) -> Result<f64> {
    if base.eq_ignore_ascii_case(target) {
        return Ok(DEFAULT_MULTIPLIER);
    }
    let rate = rates
        .rate(&base.to_uppercase(), &target.to_uppercase())
        .await?;
    Ok(rate.unwrap_or(DEFAULT_MULTIPLIER))
}

#[derive(Clone)]
pub struct PgExchangeRates {
    pool: PgPool,
}

impl PgExchangeRates {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExchangeRates for PgExchangeRates {
    async fn rate(&self, base: &str, target: &str) -> Result<Option<f64>> {
        let value = sqlx::query_scalar::<_, f64>(
            "SELECT value FROM fx_rates WHERE base = $1 AND target = $2",
        )
        .bind(base)
        .bind(target)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn upsert(&self, rate: &ExchangeRate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fx_rates (base, target, value, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (base, target)
            DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&rate.base)
        .bind(&rate.target)
        .bind(rate.value)
        .bind(rate.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ExchangeRate>> {
        let rates = sqlx::query_as::<_, ExchangeRate>(
            "SELECT base, target, value, updated_at FROM fx_rates ORDER BY base, target",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rates)
    }
}

#[derive(Default)]
pub struct MemoryExchangeRates {
    rates: RwLock<HashMap<(String, String), ExchangeRate>>,
}

impl MemoryExchangeRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(self, base: &str, target: &str, value: f64) -> Self {
        if let Ok(mut rates) = self.rates.write() {
            rates.insert(
                (base.to_uppercase(), target.to_uppercase()),
                ExchangeRate {
                    base: base.to_uppercase(),
                    target: target.to_uppercase(),
                    value,
                    updated_at: Utc::now(),
                },
            );
        }
        self
    }
}

#[async_trait]
impl ExchangeRates for MemoryExchangeRates {
    async fn rate(&self, base: &str, target: &str) -> Result<Option<f64>> {
        let rates = self
            .rates
            .read()
            .map_err(|_| Error::Internal("exchange rate table poisoned".into()))?;
        Ok(rates
            .get(&(base.to_string(), target.to_string()))
            .map(|r| r.value))
    }

    async fn upsert(&self, rate: &ExchangeRate) -> Result<()> {
        let mut rates = self
            .rates
            .write()
            .map_err(|_| Error::Internal("exchange rate table poisoned".into()))?;
        rates.insert((rate.base.clone(), rate.target.clone()), rate.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ExchangeRate>> {
        let rates = self
            .rates
            .read()
            .map_err(|_| Error::Internal("exchange rate table poisoned".into()))?;
        let mut all: Vec<ExchangeRate> = rates.values().cloned().collect();
        all.sort_by(|a, b| (&a.base, &a.target).cmp(&(&b.base, &b.target)));
        Ok(all)
    }
}

#[derive(Debug, Deserialize)]
struct RatesQuery {
    #[serde(rename = "base_currency")]
    base: String,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    query: RatesQuery,
    #[serde(rename = "data")]
    rates: HashMap<String, serde_json::Value>,
}

/// Pulls the latest rates for every configured currency from the rates API
/// and stores each (base, target) pair.
#[derive(Clone)]
pub struct FxRefresher {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    currencies: Vec<String>,
    rates: Arc<dyn ExchangeRates>,
}

impl FxRefresher {
    pub fn new(
        client: Client,
        api_url: String,
        api_key: Option<String>,
        currencies: Vec<String>,
        rates: Arc<dyn ExchangeRates>,
    ) -> Self {
        Self {
            client,
            api_url,
            api_key,
            currencies,
            rates,
        }
    }

    /// Returns the number of pairs written. A failing base currency is logged
    /// and skipped.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<usize> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("FX_API_KEY not set, skipping exchange rate refresh");
            return Ok(0);
        };

        let mut written = 0;
        for base in &self.currencies {
            let response = match self.fetch(api_key, base).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(base = %base, error = %e, "unable to fetch exchange rates");
                    continue;
                }
            };
            let rates = match rates_from_response(base, &self.currencies, response, Utc::now()) {
                Ok(rates) => rates,
                Err(e) => {
                    warn!(base = %base, error = %e, "inconsistent exchange rate reply");
                    continue;
                }
            };
            for rate in rates {
                info!(base = %rate.base, target = %rate.target, value = rate.value, "updating fx rate pair");
                self.rates.upsert(&rate).await?;
                written += 1;
            }
        }
        Ok(written)
    }

    async fn fetch(&self, api_key: &str, base: &str) -> Result<RatesResponse> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("apikey", api_key), ("base_currency", base)])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<RatesResponse>().await?)
    }
}

fn rates_from_response(
    base: &str,
    currencies: &[String],
    response: RatesResponse,
    now: DateTime<Utc>,
) -> Result<Vec<ExchangeRate>> {
    if !response.query.base.eq_ignore_ascii_case(base) {
        return Err(Error::Internal(format!(
            "got base currency {} while requesting {}",
            response.query.base, base
        )));
    }

    let mut rates = Vec::new();
    for target in currencies.iter().filter(|t| !t.eq_ignore_ascii_case(base)) {
        match response.rates.get(target.as_str()).and_then(|v| v.as_f64()) {
            Some(value) => rates.push(ExchangeRate {
                base: base.to_uppercase(),
                target: target.to_uppercase(),
                value,
                updated_at: now,
            }),
            None => warn!(base = %base, target = %target, "could not find target currency"),
        }
    }
    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_rate_defaults_to_identity() {
        let mut rates = MockExchangeRates::new();
        rates
            .expect_rate()
            .withf(|base, target| base.eq_ignore_ascii_case("JPY") && target.eq_ignore_ascii_case("USD"))
            .times(1)
            .returning(|_, _| Ok(None));

        let multiplier = conversion_multiplier(&rates, "jpy", "usd").await.unwrap();
        assert_eq!(multiplier, DEFAULT_MULTIPLIER);
    }

    #[tokio::test]
    async fn same_currency_never_hits_the_table() {
        let mut rates = MockExchangeRates::new();
        rates.expect_rate().times(0);
        let multiplier = conversion_multiplier(&rates, "EUR", "eur").await.unwrap();
        assert_eq!(multiplier, 1.0);
    }

    #[tokio::test]
    async fn stored_rate_is_used() {
        let rates = MemoryExchangeRates::new().with_rate("EUR", "USD", 1.1);
        let multiplier = conversion_multiplier(&rates, "EUR", "USD").await.unwrap();
        assert!((multiplier - 1.1).abs() < f64::EPSILON);

        let upserted = ExchangeRate {
            base: "EUR".into(),
            target: "USD".into(),
            value: 1.2,
            updated_at: Utc::now(),
        };
        rates.upsert(&upserted).await.unwrap();
        assert_eq!(rates.rate("EUR", "USD").await.unwrap(), Some(1.2));
        assert_eq!(rates.list().await.unwrap().len(), 1);
    }

    #[test]
    fn response_pairs_skip_base_and_unknown_targets() {
        let response: RatesResponse = serde_json::from_value(serde_json::json!({
            "query": { "base_currency": "USD", "timestamp": 1 },
            "data": { "EUR": 0.91, "GBP": "n/a", "JPY": 150.2 }
        }))
        .unwrap();
        let currencies = vec!["USD".to_string(), "EUR".to_string(), "GBP".to_string()];

        let rates = rates_from_response("USD", &currencies, response, Utc::now()).unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].target, "EUR");
        assert_eq!(rates[0].value, 0.91);
    }

    #[test]
    fn response_for_other_base_is_rejected() {
        let response: RatesResponse = serde_json::from_value(serde_json::json!({
            "query": { "base_currency": "EUR" },
            "data": {}
        }))
        .unwrap();
        let err = rates_from_response("USD", &[], response, Utc::now()).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
