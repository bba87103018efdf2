use catalog_crawler::{
    config::parse_profile,
    crawler::StopReason,
    engine::{ExtractionConfig, HttpEngine, HttpEngineOptions},
    fetcher::EngineFetcher,
    sink::CsvSink,
    Crawler,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use tokio_util::sync::CancellationToken;

const PAGE_ONE: &str = r#"<html><body>
  <div class="main-content p-items-wrap">
    <div class="p-item-inner">
      <div class="p-item-img"><a href="/lenovo-x1"><img src="https://cdn.test/x1.png"></a></div>
      <h4 class="p-item-name"><a>Lenovo X1</a></h4>
      <ul class="short-description"><li>14 inch</li><li>16GB RAM</li></ul>
      <div class="p-item-price"><span>Ex Tax: 199,000</span></div>
    </div>
    <div class="p-item-inner">
      <div class="p-item-img"><a href="https://other.test/t14"><img src="t14.png"></a></div>
      <h4 class="p-item-name"><a>ThinkPad T14</a></h4>
      <div class="p-item-price"><span>150,000</span></div>
    </div>
  </div>
</body></html>"#;

const PAGE_EMPTY: &str = r#"<html><body><div class="main-content p-items-wrap"></div></body></html>"#;

/// Serves page 1 with two products, every other page empty, and `/broken`
/// with a 500.
async fn serve() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]);
            let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
            let (status, body) = if path.starts_with("/broken") {
                ("500 Internal Server Error", "")
            } else if path.ends_with("page=1") {
                ("200 OK", PAGE_ONE)
            } else {
                ("200 OK", PAGE_EMPTY)
            };
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    format!("http://{addr}")
}

fn profile_json(base: &str) -> String {
    format!(
        r#"{{
        "site_id": "startech",
        "domain_root": "https://www.startech.com.bd/",
        "categories": [
            {{"name": "Laptop", "base_url": "{base}/laptop-notebook"}},
            {{"name": "Broken", "base_url": "{base}/broken"}}
        ],
        "schema": {{
            "name": "Product",
            "base_selector": ".p-item-inner",
            "fields": [
                {{"name": "name", "selector": ".p-item-name a", "type": "text"}},
                {{"name": "image_url", "selector": ".p-item-img img", "type": "attribute", "attribute": "src"}},
                {{"name": "description", "selector": ".short-description li", "type": "list",
                  "fields": [{{"name": "feature", "type": "text"}}]}},
                {{"name": "price", "selector": ".p-item-price span", "type": "text"}},
                {{"name": "url", "selector": ".p-item-img a", "type": "attribute", "attribute": "href"}}
            ]
        }},
        "content_selector": ".main-content.p-items-wrap",
        "price_strip_markers": ["Ex Tax:"],
        "run": {{"test_file": "unused.csv", "skip_delay": true}}
    }}"#
    )
}

#[tokio::test]
async fn crawls_listing_over_http_into_csv() {
    let base = serve().await;
    let (profile, mut run) = parse_profile(&profile_json(&base)).unwrap();
    run.test_mode = true;
    let mut options = run.crawler_options().unwrap();
    options.max_pages = None;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("startech.csv");
    let mut sink = CsvSink::new(&path, profile.columns());
    let fetcher = EngineFetcher::new(
        HttpEngine::new(HttpEngineOptions::default()),
        ExtractionConfig::from(&profile),
    );

    let summary = Crawler::new(options)
        .run_with_token(&profile, &fetcher, &mut sink, CancellationToken::new())
        .await;

    assert_eq!(summary.stop_reason, StopReason::Exhausted);
    assert_eq!(summary.pages_crawled, 1);
    assert_eq!(summary.records_written, 2);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "category,name,image_url,description,price,url");
    assert_eq!(
        lines[1],
        "Laptop,Lenovo X1,https://cdn.test/x1.png,14 inch; 16GB RAM,\"199,000\",https://www.startech.com.bd/lenovo-x1"
    );
    assert_eq!(
        lines[2],
        "Laptop,ThinkPad T14,t14.png,,\"150,000\",https://other.test/t14"
    );
}

#[tokio::test]
async fn http_error_status_is_fatal() {
    let base = serve().await;
    let (profile, mut run) = parse_profile(&profile_json(&base)).unwrap();
    run.test_mode = true;
    let mut options = run.crawler_options().unwrap();
    options.categories = catalog_crawler::crawler::CategorySelection::Single(1);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("startech.csv");
    let mut sink = CsvSink::new(&path, profile.columns());
    let fetcher = EngineFetcher::new(HttpEngine::default(), ExtractionConfig::from(&profile));

    let summary = Crawler::new(options)
        .run_with_token(&profile, &fetcher, &mut sink, CancellationToken::new())
        .await;

    match summary.stop_reason {
        StopReason::EngineFailure(reason) => assert!(reason.contains("500"), "{reason}"),
        other => panic!("unexpected stop reason {other}"),
    }
    assert_eq!(summary.pages_crawled, 0);
    assert!(!path.exists());
}
