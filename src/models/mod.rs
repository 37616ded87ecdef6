pub mod exchange_rate;
pub mod listing;
pub mod search;
