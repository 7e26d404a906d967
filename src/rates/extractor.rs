use super::RateRecord;
use crate::{config::ExtractorConfig, utils, ExtractionError};
use chrono::{DateTime, FixedOffset};
use lazy_regex::regex;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use tracing::{debug, info};

const E: &str = "Invalid selector";
lazy_static! {
    static ref ROW: Selector = Selector::parse("tr").expect(E);
    static ref CELL: Selector = Selector::parse("td, th").expect(E);
}

/// Why a table row did not become a record. Rows are skipped, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSkip {
    TooFewCells(usize),
    MissingCell(usize),
    WrongCurrency(String),
    InvalidTerm(String),
    TermOutOfRange(u32),
}

impl fmt::Display for RowSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowSkip::TooFewCells(n) => write!(f, "only {} cells", n),
            RowSkip::MissingCell(i) => write!(f, "no cell at index {}", i),
            RowSkip::WrongCurrency(c) => write!(f, "currency {:?}", c),
            RowSkip::InvalidTerm(t) => write!(f, "term {:?} is not an integer", t),
            RowSkip::TermOutOfRange(t) => write!(f, "term {} out of range", t),
        }
    }
}

/// Parse a rate written with `.` thousands and `,` decimals, optionally
/// decorated with `$` or `%`. Anything unparseable is `0.0`, and so is a
/// negative quote.
pub fn parse_rate(raw: &str) -> f64 {
    if raw.trim_start().starts_with('-') {
        return 0.0;
    }
    let digits = regex!(r"[^0-9.,]").replace_all(raw, "");
    let normalized = digits.replace('.', "").replacen(',', ".", 1);
    normalized
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite())
        .unwrap_or(0.0)
}

fn cell_text(cell: ElementRef) -> String {
    let text = cell.text().collect::<String>();
    regex!(r"\s+").replace_all(&text, " ").trim().to_string()
}

fn raw_row(row: ElementRef) -> Vec<String> {
    row.select(&CELL).map(cell_text).collect()
}

#[derive(Debug)]
pub struct Extractor {
    config: ExtractorConfig,
    client: reqwest::Client,
    table: Selector,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Result<Extractor, ExtractionError> {
        let table = Selector::parse(&config.table_selector)
            .map_err(|e| ExtractionError::InvalidSelector(format!("{:?}", e)))?;
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Extractor {
            config,
            client,
            table,
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Fetch the source page and turn its rate table into records.
    pub async fn run(&self) -> Result<Vec<RateRecord>, ExtractionError> {
        let html = self.fetch().await?;
        let observed_at = utils::now_in(self.config.timezone);
        self.extract(&html, observed_at)
    }

    async fn fetch(&self) -> Result<String, ExtractionError> {
        debug!("Visit {}", self.config.source_url);
        let response = self
            .client
            .get(self.config.source_url.as_str())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    /// Extract records from an already fetched page, stamping every record
    /// with `observed_at`.
    pub fn extract(
        &self,
        html: &str,
        observed_at: DateTime<FixedOffset>,
    ) -> Result<Vec<RateRecord>, ExtractionError> {
        let doc = Html::parse_document(html);
        let table = doc
            .select(&self.table)
            .next()
            .ok_or(ExtractionError::TableNotFound)?;

        let mut skipped = 0;
        let mut records: Vec<RateRecord> = table
            .select(&ROW)
            .skip(1)
            .map(raw_row)
            .filter_map(|row| match self.parse_row(&row, observed_at) {
                Ok(record) => Some(record),
                Err(skip) => {
                    debug!("Skip row {:?}: {}", row, skip);
                    skipped += 1;
                    None
                }
            })
            .collect();

        records.sort_by_key(|r| r.observed_at);
        info!("Extracted {} records, skipped {} rows", records.len(), skipped);
        Ok(records)
    }

    pub fn parse_row(
        &self,
        row: &[String],
        observed_at: DateTime<FixedOffset>,
    ) -> Result<RateRecord, RowSkip> {
        let c = &self.config;
        if row.len() < c.min_cells {
            return Err(RowSkip::TooFewCells(row.len()));
        }

        let cell = |i: usize| {
            row.get(i)
                .map(|s| s.trim())
                .ok_or(RowSkip::MissingCell(i))
        };

        let currency = cell(c.currency_cell)?;
        if currency != c.accepted_currency {
            return Err(RowSkip::WrongCurrency(currency.to_string()));
        }

        let term = cell(c.term_cell)?;
        let term_days = Some(term)
            .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|t| t.parse::<u32>().ok())
            .ok_or_else(|| RowSkip::InvalidTerm(term.to_string()))?;
        if term_days == 0 || term_days > c.max_term_days {
            return Err(RowSkip::TermOutOfRange(term_days));
        }

        Ok(RateRecord {
            term_days,
            currency: currency.to_string(),
            rate: parse_rate(cell(c.rate_cell)?),
            observed_at,
        })
    }
}
