use crate::{
    config::HistoryConfig,
    rates::{RateRecord, ScrapeEvent},
    HistoryError, HistoryStore,
};
use chrono_tz::Tz;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// In-process history log with the same bound and ordering as the SQLite one.
/// Front of the deque is the newest event.
pub struct MemoryHistory {
    capacity: usize,
    timezone: Tz,
    events: Mutex<VecDeque<ScrapeEvent>>,
}

impl MemoryHistory {
    pub fn new(config: &HistoryConfig) -> Self {
        MemoryHistory {
            capacity: config.capacity as usize,
            timezone: config.timezone,
            events: Mutex::new(VecDeque::new()),
        }
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistory {
    fn timezone(&self) -> Tz {
        self.timezone
    }

    async fn append(&self, records: Vec<RateRecord>) -> Result<ScrapeEvent, HistoryError> {
        let event = ScrapeEvent::new(records);
        let mut events = self.events.lock().await;
        events.push_front(event.clone());
        events.truncate(self.capacity);
        Ok(event)
    }

    async fn list_events(&self, limit: u32) -> Vec<ScrapeEvent> {
        let events = self.events.lock().await;
        events.iter().take(limit as usize).cloned().collect()
    }

    async fn delete_all(&self) -> Result<(), HistoryError> {
        self.events.lock().await.clear();
        Ok(())
    }

    async fn count(&self) -> u32 {
        self.events.lock().await.len() as u32
    }

    async fn is_available(&self) -> bool {
        true
    }
}
