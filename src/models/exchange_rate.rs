use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ExchangeRate {
    pub base: String,
    pub target: String,
    pub value: f64,
    pub updated_at: DateTime<Utc>,
}

/// Three ASCII letters, e.g. `USD`.
pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}
