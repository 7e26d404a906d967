use pretty_assertions::assert_eq;
use rate_history::config::{ExtractorConfig, HistoryConfig};
use rate_history::{
    run_periodically, scrape_and_store, ExtractionError, Extractor, HistoryStore, MemoryHistory,
    PipelineError, SqliteHistory,
};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve `body` with `status` to every connection, return the page url.
async fn serve(status: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}/Personas/PlazoFijo", addr)
}

fn fixture() -> String {
    std::fs::read_to_string("tests/htmls/rates.html").expect("Invalid file path")
}

fn extractor(source_url: String) -> Extractor {
    Extractor::new(ExtractorConfig {
        source_url,
        timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn fixture_end_to_end() {
    let db = "pipeline1.db";
    if Path::new(db).is_file() {
        std::fs::remove_file(db).unwrap();
    }

    let url = serve("200 OK", fixture()).await;
    let extractor = extractor(url);

    let records = extractor.run().await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(
        records.iter().map(|r| r.term_days).collect::<Vec<_>>(),
        vec![7, 14, 30]
    );
    assert_eq!(
        records.iter().map(|r| r.rate).collect::<Vec<_>>(),
        vec![38.5, 1234.56, 45.0]
    );
    assert!(records.iter().all(|r| r.currency == "PESOS"));

    let store = SqliteHistory::new(&HistoryConfig {
        database: db.to_string(),
        ..Default::default()
    })
    .await
    .unwrap();
    store.append(records.clone()).await.unwrap();

    let events = store.list_events(1).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].records, records);

    store.delete_all().await.unwrap();
    assert!(store.list_events(10).await.is_empty());

    std::fs::remove_file(db).unwrap();
}

#[tokio::test]
async fn trigger_appends_one_event() {
    let url = serve("200 OK", fixture()).await;
    let store = MemoryHistory::new(&HistoryConfig::default());

    let event = scrape_and_store(&extractor(url), &store).await.unwrap();
    assert_eq!(event.records.len(), 3);
    assert_eq!(store.list_events(10).await, vec![event]);
}

#[tokio::test]
async fn empty_run_still_records_event() {
    let page = fixture().replace("PESOS", "DOLARES");
    let url = serve("200 OK", page).await;
    let store = MemoryHistory::new(&HistoryConfig::default());

    let event = scrape_and_store(&extractor(url), &store).await.unwrap();
    assert!(event.records.is_empty());
    assert_eq!(store.count().await, 1);
}

#[tokio::test]
async fn http_error_is_fetch_failure() {
    let url = serve("503 Service Unavailable", fixture()).await;
    let store = MemoryHistory::new(&HistoryConfig::default());

    let res = scrape_and_store(&extractor(url), &store).await;
    assert!(matches!(
        res,
        Err(PipelineError::Extraction(ExtractionError::FetchFailed(_)))
    ));
    assert_eq!(store.count().await, 0);
}

#[tokio::test]
async fn connection_refused_is_fetch_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let res = extractor(format!("http://{}/", addr)).run().await;
    assert!(matches!(res, Err(ExtractionError::FetchFailed(_))));
}

#[tokio::test]
async fn changed_page_is_table_not_found() {
    let url = serve("200 OK", "<html><body><h1>Nuevo sitio</h1></body></html>".to_string()).await;
    let store = MemoryHistory::new(&HistoryConfig::default());

    let res = scrape_and_store(&extractor(url), &store).await;
    assert!(matches!(
        res,
        Err(PipelineError::Extraction(ExtractionError::TableNotFound))
    ));
    assert_eq!(store.count().await, 0);
}

#[tokio::test]
async fn periodic_runs_until_shutdown() {
    let url = serve("200 OK", fixture()).await;
    let store = MemoryHistory::new(&HistoryConfig::default());
    let extractor = extractor(url);

    let stored = run_periodically(
        &extractor,
        &store,
        Duration::from_millis(50),
        tokio::time::sleep(Duration::from_millis(300)),
    )
    .await;

    assert!(stored >= 1);
    assert_eq!(u64::from(store.count().await), stored);
}
