use chrono::NaiveDate;
use chrono_tz::Tz;
use std::future::Future;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{info, warn};

pub mod config;
pub mod export;
pub mod rates;

mod data;
mod error;
mod memory;
mod utils;

pub use data::Table;
pub use error::{ExtractionError, HistoryError, PipelineError};
pub use memory::MemoryHistory;
pub use rates::{Extractor, RateRecord, ScrapeEvent, SqliteHistory};
pub use utils::{now_in, today_in};

/// Bounded, newest-first log of scrape events.
///
/// Writes report failures; reads degrade to empty results and log instead.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    fn timezone(&self) -> Tz;

    async fn append(&self, records: Vec<RateRecord>) -> Result<ScrapeEvent, HistoryError>;
    async fn list_events(&self, limit: u32) -> Vec<ScrapeEvent>;
    async fn delete_all(&self) -> Result<(), HistoryError>;
    async fn count(&self) -> u32;
    async fn is_available(&self) -> bool;

    async fn latest(&self) -> Option<ScrapeEvent> {
        self.list_events(1).await.into_iter().next()
    }

    async fn list_events_for_date(&self, day: NaiveDate) -> Vec<ScrapeEvent> {
        let tz = self.timezone();
        self.list_events(u32::MAX)
            .await
            .iter()
            .filter_map(|event| event.restricted_to(day, tz))
            .collect()
    }
}

/// One trigger: extract, then append on success. Nothing is retried here.
pub async fn scrape_and_store<S>(
    extractor: &Extractor,
    store: &S,
) -> Result<ScrapeEvent, PipelineError>
where
    S: HistoryStore + ?Sized,
{
    let records = match extractor.run().await {
        Ok(records) => records,
        Err(e) => {
            warn!("Scrape of {} failed: {}", extractor.config().source_url, e);
            return Err(e.into());
        }
    };

    match store.append(records).await {
        Ok(event) => {
            info!(
                "Stored event {} with {} records",
                event.captured_at.to_rfc3339(),
                event.records.len()
            );
            Ok(event)
        }
        Err(e) => {
            warn!("Append failed: {:?}", e);
            Err(e.into())
        }
    }
}

/// Trigger `scrape_and_store` every `period` until `shutdown` resolves.
/// The first run starts immediately. Returns the number of stored events.
pub async fn run_periodically<S, F>(
    extractor: &Extractor,
    store: &S,
    period: Duration,
    shutdown: F,
) -> u64
where
    S: HistoryStore + ?Sized,
    F: Future<Output = ()>,
{
    info!("Scraping {} every {:?}", extractor.config().source_url, period);

    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut stored = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if scrape_and_store(extractor, store).await.is_ok() {
                    stored += 1;
                }
            }
        }
    }

    info!("Stopped after storing {} events", stored);
    stored
}
