use super::{RateRecord, ScrapeEvent};
use crate::{config::HistoryConfig, utils, HistoryError, HistoryStore, Table};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::TryStreamExt;
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Scrape events, one row each, in arrival order of `id`.
pub struct EventTable {
    name: String,
    capacity: u32,
    pool: SqlitePool,
}

#[async_trait::async_trait]
impl Table for EventTable {
    type Record<'a> = (DateTime<Utc>, &'a str);

    fn get_name(&self) -> &str {
        self.name.as_str()
    }

    fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create(&self) -> Result<(), sqlx::Error> {
        if !utils::is_table_exists(self.get_pool(), &self.name).await? {
            let query = format!(
                r#"
                    CREATE TABLE {} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        captured_at DATETIME NOT NULL,
                        records TEXT NOT NULL
                    )
                "#,
                &self.name
            );
            sqlx::query(query.as_str()).execute(self.get_pool()).await?;
            debug!("Created {}", self.name);
        }
        Ok(())
    }

    /// Insert and trim to capacity in one transaction.
    async fn insert<'a>(&self, (captured_at, records): Self::Record<'a>) -> Result<(), sqlx::Error> {
        let mut tx = self.get_pool().begin().await?;

        let query = format!(
            "INSERT INTO {} (captured_at, records) VALUES (?, ?)",
            &self.name
        );
        sqlx::query(&query)
            .bind(captured_at)
            .bind(records)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "DELETE FROM {0} WHERE id NOT IN (SELECT id FROM {0} ORDER BY id DESC LIMIT ?)",
            &self.name
        );
        let evicted = sqlx::query(&query)
            .bind(i64::from(self.capacity))
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        if evicted > 0 {
            debug!("Evicted {} events from {}", evicted, self.name);
        }
        Ok(())
    }
}

impl EventTable {
    async fn newest(&self, limit: u32) -> Result<Vec<ScrapeEvent>, HistoryError> {
        let mut events = vec![];
        let query = format!(
            "SELECT captured_at, records FROM {} ORDER BY id DESC LIMIT ?",
            self.name
        );
        let mut rows = sqlx::query(&query)
            .bind(i64::from(limit))
            .fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            let captured_at: DateTime<Utc> = row.try_get("captured_at")?;
            let records: String = row.try_get("records")?;
            events.push(ScrapeEvent {
                captured_at,
                records: serde_json::from_str(&records)?,
            });
        }

        Ok(events)
    }
}

/// Bounded history log backed by SQLite.
pub struct SqliteHistory {
    pub name: String,
    events: EventTable,
    timezone: Tz,
    write_lock: Mutex<()>,
}

impl SqliteHistory {
    pub async fn new(config: &HistoryConfig) -> Result<SqliteHistory, HistoryError> {
        let opt = SqliteConnectOptions::new()
            .filename(&config.database)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opt).await?;
        Self::with_pool(pool, config).await
    }

    pub async fn with_pool(
        pool: SqlitePool,
        config: &HistoryConfig,
    ) -> Result<SqliteHistory, HistoryError> {
        let h = SqliteHistory {
            name: config.name.clone(),
            events: EventTable {
                name: format!("{}_events", config.name),
                capacity: config.capacity,
                pool,
            },
            timezone: config.timezone,
            write_lock: Mutex::new(()),
        };

        h.events.create().await?;

        Ok(h)
    }
}

#[async_trait::async_trait]
impl HistoryStore for SqliteHistory {
    fn timezone(&self) -> Tz {
        self.timezone
    }

    async fn append(&self, records: Vec<RateRecord>) -> Result<ScrapeEvent, HistoryError> {
        let event = ScrapeEvent::new(records);
        let payload = serde_json::to_string(&event.records)?;

        let _guard = self.write_lock.lock().await;
        self.events
            .insert((event.captured_at, payload.as_str()))
            .await?;
        Ok(event)
    }

    async fn list_events(&self, limit: u32) -> Vec<ScrapeEvent> {
        match self.events.newest(limit).await {
            Ok(events) => events,
            Err(e) => {
                warn!("Read from {} degraded: {:?}", self.events.name, e);
                vec![]
            }
        }
    }

    async fn delete_all(&self) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.events.clear().await?)
    }

    async fn count(&self) -> u32 {
        self.events.count().await.unwrap_or_else(|e| {
            warn!("Count on {} degraded: {:?}", self.events.name, e);
            0
        })
    }

    async fn is_available(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.events.pool)
            .await
            .is_ok()
    }
}
