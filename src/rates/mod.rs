mod data;
mod extractor;

pub use data::SqliteHistory;
pub use extractor::{parse_rate, Extractor, RowSkip};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub term_days: u32,
    pub currency: String,
    pub rate: f64,
    pub observed_at: DateTime<FixedOffset>,
}

impl RateRecord {
    pub fn observed_on(&self, day: NaiveDate, tz: Tz) -> bool {
        self.observed_at.with_timezone(&tz).date_naive() == day
    }
}

impl fmt::Display for RateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} days  {:<6} {:>10.2}  {}",
            self.term_days,
            self.currency,
            self.rate,
            self.observed_at.to_rfc3339()
        )
    }
}

/// One completed extraction run, as stored in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeEvent {
    pub captured_at: DateTime<Utc>,
    pub records: Vec<RateRecord>,
}

impl ScrapeEvent {
    pub fn new(records: Vec<RateRecord>) -> Self {
        ScrapeEvent {
            captured_at: Utc::now(),
            records,
        }
    }

    /// Same event restricted to the records observed on `day`, or `None`
    /// when it has none.
    pub fn restricted_to(&self, day: NaiveDate, tz: Tz) -> Option<ScrapeEvent> {
        let records: Vec<RateRecord> = self
            .records
            .iter()
            .filter(|r| r.observed_on(day, tz))
            .cloned()
            .collect();
        if records.is_empty() {
            None
        } else {
            Some(ScrapeEvent {
                captured_at: self.captured_at,
                records,
            })
        }
    }
}

impl fmt::Display for ScrapeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Captured at     : {}", self.captured_at.to_rfc3339())?;
        writeln!(f, "Records         : {}", self.records.len())?;
        for r in &self.records {
            writeln!(f, "> {}", r)?;
        }

        Ok(())
    }
}
