use std::time::Duration;

use catalog_crawler::{
    crawler::{CrawlerOptions, RunMode},
    engine::ExtractionConfig,
    fetcher::EngineFetcher,
    profile::SiteProfile,
    sink::CsvSink,
    Crawler,
};
use tokio::signal;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    println!("starting fake_catalog");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("debug"))
                .expect("telemetry: Creating EnvFilter"),
        )
        .init();

    let profile: SiteProfile = serde_json::from_value(serde_json::json!({
        "site_id": "fake",
        "domain_root": "https://example.com/",
        "categories": [
            {"name": "Laptop", "base_url": "https://example.com/laptop"},
            {"name": "Monitor", "base_url": "https://example.com/monitor"}
        ],
        "schema": {
            "name": "Product",
            "base_selector": ".item",
            "fields": [
                {"name": "name", "type": "text"},
                {"name": "price", "type": "text"},
                {"name": "url", "type": "text"}
            ]
        },
        "content_selector": "body",
        "price_strip_markers": ["Ex Tax:"]
    }))
    .expect("fake profile");

    let path = std::env::temp_dir().join("fake_catalog.csv");
    let mut sink = CsvSink::new(&path, profile.columns());
    let fetcher = EngineFetcher::new(fake_catalog::FakeEngine, ExtractionConfig::from(&profile));
    let options = CrawlerOptions {
        delay: Duration::from_millis(500),
        mode: RunMode::Trial,
        categories: catalog_crawler::crawler::CategorySelection::All,
        ..CrawlerOptions::default()
    };

    let summary = Crawler::new(options)
        .run(&profile, &fetcher, &mut sink, signal::ctrl_c())
        .await;
    println!(
        "{}: wrote {} records to {}",
        summary.stop_reason,
        summary.records_written,
        path.display()
    );
}

pub mod fake_catalog {
    use std::time::Duration;

    use async_trait::async_trait;
    use catalog_crawler::{
        engine::{CrawlEngine, CrawlOutcome, ExtractionConfig},
        error::EngineError,
    };

    /// Three pages per category; the second one returns a broken payload.
    #[derive(Debug)]
    pub struct FakeEngine;

    #[async_trait]
    impl CrawlEngine for FakeEngine {
        async fn open_session(&self, session_id: &str) -> Result<(), EngineError> {
            println!("opening session {}", session_id);
            Ok(())
        }

        async fn crawl(&self, url: &str, _config: &ExtractionConfig) -> CrawlOutcome {
            println!("crawling {}", url);
            tokio::time::sleep(Duration::from_millis(200)).await;
            let page: usize = url
                .rsplit('=')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(1);
            let payload = match page {
                2 => "[{\"name\": \"truncated".to_string(),
                1..=3 => {
                    let items: Vec<_> = (0..2)
                        .map(|i| {
                            serde_json::json!({
                                "name": format!("Item {page}-{i}"),
                                "price": format!("Ex Tax: {}.00", 100 * (i + 1)),
                                "url": format!("item/{page}-{i}"),
                            })
                        })
                        .collect();
                    serde_json::Value::Array(items).to_string()
                }
                _ => "[]".to_string(),
            };
            CrawlOutcome::extracted(200, payload)
        }

        async fn close_session(&self, session_id: &str) {
            println!("closing session {}", session_id);
        }
    }
}
