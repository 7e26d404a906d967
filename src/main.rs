use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use rate_history::config::{self, ExtractorConfig, HistoryConfig};
use rate_history::{
    export, run_periodically, scrape_and_store, today_in, Extractor, HistoryStore, SqliteHistory,
};
use std::time::Duration;
use tracing::{info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "rate-history", about = "Scrape short-term rate quotes into a bounded history")]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    #[arg(long, env = "RATES_SOURCE_URL", default_value = config::DEFAULT_SOURCE_URL)]
    source_url: String,

    #[arg(long, env = "RATES_TABLE_SELECTOR", default_value = config::DEFAULT_TABLE_SELECTOR)]
    table_selector: String,

    #[arg(long, env = "RATES_USER_AGENT", default_value = config::DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Request timeout in seconds
    #[arg(long, env = "RATES_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    #[arg(long, env = "RATES_CURRENCY", default_value = "PESOS")]
    currency: String,

    #[arg(long, env = "RATES_MAX_TERM_DAYS", default_value_t = 30)]
    max_term_days: u32,
}

#[derive(Args, Debug)]
struct StoreArgs {
    #[arg(long, env = "RATES_DATABASE", default_value = "rates.db")]
    database: String,

    #[arg(long, env = "RATES_CAPACITY", default_value_t = config::DEFAULT_CAPACITY)]
    capacity: u32,

    /// IANA timezone the source quotes in
    #[arg(long, env = "RATES_TIMEZONE", default_value = "America/Argentina/Buenos_Aires")]
    timezone: Tz,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract once and append the result
    Scrape,
    /// Extract and append every interval until interrupted
    Watch {
        #[arg(long, env = "RATES_INTERVAL", default_value_t = 3600)]
        interval: u64,
    },
    /// Extract once and print the records without storing them
    TestScrape,
    /// Print the newest events
    History {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Print the events observed on one day (today by default)
    Day {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Write events as CSV to stdout
    Export {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Delete the whole history
    Clear {
        #[arg(long)]
        secret: String,
        #[arg(long, env = "RATES_ADMIN_SECRET", hide_env_values = true)]
        admin_secret: Option<String>,
    },
    /// Check that the store answers
    Health,
}

impl Cli {
    fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            source_url: self.source.source_url.clone(),
            table_selector: self.source.table_selector.clone(),
            user_agent: self.source.user_agent.clone(),
            timeout: Duration::from_secs(self.source.timeout),
            accepted_currency: self.source.currency.clone(),
            max_term_days: self.source.max_term_days,
            timezone: self.store.timezone,
            ..Default::default()
        }
    }

    fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            database: self.store.database.clone(),
            capacity: self.store.capacity,
            timezone: self.store.timezone,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info,sqlx=warn".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let cli = Cli::parse();

    if let Command::TestScrape = cli.command {
        let extractor = Extractor::new(cli.extractor_config())?;
        for r in extractor.run().await? {
            println!("{}", r);
        }
        return Ok(());
    }

    let store = SqliteHistory::new(&cli.history_config()).await?;

    match &cli.command {
        Command::Scrape => {
            let extractor = Extractor::new(cli.extractor_config())?;
            let event = scrape_and_store(&extractor, &store).await?;
            print!("{}", event);
        }
        Command::Watch { interval } => {
            let extractor = Extractor::new(cli.extractor_config())?;
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Cannot listen for ctrl-c: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            run_periodically(&extractor, &store, Duration::from_secs(*interval), shutdown).await;
        }
        Command::History { limit } => {
            for event in store.list_events(*limit).await {
                println!("{}", event);
            }
        }
        Command::Day { date } => {
            let day = date.unwrap_or_else(|| today_in(store.timezone()));
            for event in store.list_events_for_date(day).await {
                println!("{}", event);
            }
        }
        Command::Export { date, limit } => {
            let events = match date {
                Some(day) => store.list_events_for_date(*day).await,
                None => store.list_events(*limit).await,
            };
            print!("{}", export::to_csv(&events));
        }
        Command::Clear {
            secret,
            admin_secret,
        } => match admin_secret {
            Some(expected) if expected == secret => {
                store.delete_all().await?;
                info!("History cleared");
            }
            _ => {
                warn!("Refusing to clear history: secret mismatch");
                return Err("invalid secret".into());
            }
        },
        Command::Health => {
            let available = store.is_available().await;
            println!("{}", if available { "healthy" } else { "unavailable" });
            if !available {
                return Err("store unavailable".into());
            }
        }
        Command::TestScrape => {}
    }

    Ok(())
}
