use chrono_tz::Tz;
use std::time::Duration;

pub const DEFAULT_SOURCE_URL: &str = "https://www.bna.com.ar/Personas/PlazoFijo";
pub const DEFAULT_TABLE_SELECTOR: &str = "table";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; ScraperBot/1.0)";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Argentina::Buenos_Aires;
pub const DEFAULT_CAPACITY: u32 = 2000;

/// Where the rate table lives and which of its rows are kept.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub source_url: String,
    pub table_selector: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub accepted_currency: String,
    pub max_term_days: u32,
    pub min_cells: usize,
    pub term_cell: usize,
    pub currency_cell: usize,
    pub rate_cell: usize,
    pub timezone: Tz,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            table_selector: DEFAULT_TABLE_SELECTOR.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            accepted_currency: "PESOS".to_string(),
            max_term_days: 30,
            min_cells: 7,
            term_cell: 0,
            currency_cell: 1,
            rate_cell: 5,
            timezone: DEFAULT_TIMEZONE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Table prefix, so several logs can share one database file.
    pub name: String,
    pub database: String,
    pub capacity: u32,
    pub timezone: Tz,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            name: "rates".to_string(),
            database: "rates.db".to_string(),
            capacity: DEFAULT_CAPACITY,
            timezone: DEFAULT_TIMEZONE,
        }
    }
}
