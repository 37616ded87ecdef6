use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jobs_per_page: i64,
    pub related_listings_limit: i64,
    pub available_currencies: Vec<String>,
    pub available_salary_bands: Vec<i64>,
    pub default_currency: String,
    pub fx_api_url: String,
    pub fx_api_key: Option<String>,
    pub fx_refresh_interval_secs: u64,
    pub link_check_interval_secs: u64,
    pub tier_check_interval_secs: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:8080".to_string(),
            database_url: String::new(),
            jobs_per_page: 10,
            related_listings_limit: 3,
            available_currencies: vec!["USD".to_string(), "EUR".to_string(), "GBP".to_string()],
            available_salary_bands: vec![10000, 20000, 40000, 60000, 80000, 100000, 150000, 200000],
            default_currency: "USD".to_string(),
            fx_api_url: "https://freecurrencyapi.net/api/v2/latest".to_string(),
            fx_api_key: None,
            fx_refresh_interval_secs: 6 * 60 * 60,
            link_check_interval_secs: 24 * 60 * 60,
            tier_check_interval_secs: 60 * 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jobs_per_page: positive(
                "JOBS_PER_PAGE",
                get_env_parse_or("JOBS_PER_PAGE", defaults.jobs_per_page)?,
            )?,
            related_listings_limit: positive(
                "RELATED_LISTINGS_LIMIT",
                get_env_parse_or("RELATED_LISTINGS_LIMIT", defaults.related_listings_limit)?,
            )?,
            available_currencies: match env::var("AVAILABLE_CURRENCIES") {
                Ok(raw) => parse_list(&raw, "AVAILABLE_CURRENCIES")?
                    .into_iter()
                    .map(|c: String| c.to_uppercase())
                    .collect(),
                Err(_) => defaults.available_currencies,
            },
            available_salary_bands: match env::var("AVAILABLE_SALARY_BANDS") {
                Ok(raw) => parse_list(&raw, "AVAILABLE_SALARY_BANDS")?,
                Err(_) => defaults.available_salary_bands,
            },
            default_currency: env::var("DEFAULT_CURRENCY")
                .map(|c| c.to_uppercase())
                .unwrap_or(defaults.default_currency),
            fx_api_url: env::var("FX_API_URL").unwrap_or(defaults.fx_api_url),
            fx_api_key: env::var("FX_API_KEY").ok(),
            fx_refresh_interval_secs: get_env_parse_or(
                "FX_REFRESH_INTERVAL_SECS",
                defaults.fx_refresh_interval_secs,
            )?,
            link_check_interval_secs: get_env_parse_or(
                "LINK_CHECK_INTERVAL_SECS",
                defaults.link_check_interval_secs,
            )?,
            tier_check_interval_secs: get_env_parse_or(
                "TIER_CHECK_INTERVAL_SECS",
                defaults.tier_check_interval_secs,
            )?,
        })
    }

    pub fn is_available_currency(&self, currency: &str) -> bool {
        self.available_currencies
            .iter()
            .any(|c| c.eq_ignore_ascii_case(currency))
    }

    pub fn is_available_salary_band(&self, salary: i64) -> bool {
        self.available_salary_bands.contains(&salary)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn positive(name: &str, value: i64) -> Result<i64> {
    if value <= 0 {
        return Err(Error::Config(format!(
            "{} must be greater than zero, got {}",
            name, value
        )));
    }
    Ok(value)
}

fn parse_list<T>(raw: &str, name: &str) -> Result<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse()
                .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
        })
        .collect()
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
