use crate::error::{AppError, Result};

/// Main numbers are drawn from [1, MAIN_MAX]; a combination picks MAIN_PICKS of them.
pub const MAIN_MAX: u8 = 49;
pub const MAIN_PICKS: usize = 5;

/// Complementary number range is [1, COMPLEMENTARY_MAX].
pub const COMPLEMENTARY_MAX: u8 = 10;

/// Fixed batch size for concurrent multi-combination runs.
/// Each batch is evaluated on its own task; output order stays input order.
pub const BATCH_SIZE: usize = 10;

/// Default ticket price in euros, used for investment/ROI computation.
pub const DEFAULT_TICKET_PRICE: f64 = 2.20;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    /// Price of one grid, charged once per tested draw (TICKET_PRICE).
    pub ticket_price: f64,
    /// Optional JSON file overriding the built-in prize table (PRIZE_TABLE_PATH).
    pub prize_table_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            ticket_price: std::env::var("TICKET_PRICE")
                .unwrap_or_else(|_| DEFAULT_TICKET_PRICE.to_string())
                .parse::<f64>()
                .map_err(|_| AppError::Config("TICKET_PRICE must be a number".to_string()))?,
            prize_table_path: std::env::var("PRIZE_TABLE_PATH").ok().filter(|s| !s.is_empty()),
        })
    }
}
