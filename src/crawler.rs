//! The pagination controller.
//!
//! One run walks the selected categories page by page: fetch, normalize,
//! persist, pause, repeat. It stops on an empty page (moving to the next
//! category when crawling all of them), on a fatal engine or sink error, on
//! cancellation or at the page limit. Whatever the exit, the fetcher session
//! is released once, buffered records are flushed and a summary is logged.

pub mod state;
pub mod statistics;

use std::{collections::HashSet, future::Future, io, time::Duration};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    fetcher::PageFetcher,
    normalize::normalize,
    profile::SiteProfile,
    record::{PageRequest, ProductRecord},
    shutdown::ShutdownListener,
    sink::{FlushPolicy, Sink},
};
pub use state::CrawlState;
pub use statistics::{CrawlSummary, StopReason};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Production,
    Trial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySelection {
    Single(usize),
    All,
}

impl Default for CategorySelection {
    fn default() -> Self {
        CategorySelection::Single(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    #[default]
    Off,
    /// Drop records whose URL was already written during this run.
    ByUrl,
}

pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_NOMINAL_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct CrawlerOptions {
    pub delay: Duration,
    /// Honoured only in [`RunMode::Trial`].
    pub skip_delay: bool,
    pub mode: RunMode,
    pub start_page: usize,
    pub categories: CategorySelection,
    pub flush: FlushPolicy,
    pub dedup: DedupPolicy,
    pub max_pages: Option<usize>,
    pub nominal_page_size: usize,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            skip_delay: false,
            mode: RunMode::Production,
            start_page: 1,
            categories: CategorySelection::default(),
            flush: FlushPolicy::default(),
            dedup: DedupPolicy::default(),
            max_pages: None,
            nominal_page_size: DEFAULT_NOMINAL_PAGE_SIZE,
        }
    }
}

pub struct Crawler {
    options: CrawlerOptions,
}

/// Mutable per-run data besides the counters.
struct RunBuffers {
    pending: Vec<ProductRecord>,
    seen_urls: HashSet<String>,
}

impl Crawler {
    pub fn new(options: CrawlerOptions) -> Self {
        Self { options }
    }

    /// Runs until the crawl stops or `shutdown` resolves, e.g.
    /// `tokio::signal::ctrl_c()`.
    pub async fn run<F, S, Sig>(
        &self,
        profile: &SiteProfile,
        fetcher: &F,
        sink: &mut S,
        shutdown: Sig,
    ) -> CrawlSummary
    where
        F: PageFetcher + ?Sized,
        S: Sink + ?Sized,
        Sig: Future<Output = io::Result<()>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let listener = ShutdownListener::spawn(shutdown, token.clone());
        let summary = self.run_with_token(profile, fetcher, sink, token).await;
        listener.stop().await;
        summary
    }

    pub async fn run_with_token<F, S>(
        &self,
        profile: &SiteProfile,
        fetcher: &F,
        sink: &mut S,
        token: CancellationToken,
    ) -> CrawlSummary
    where
        F: PageFetcher + ?Sized,
        S: Sink + ?Sized,
    {
        tracing::info!(
            "running fetcher '{}' on site '{}'",
            fetcher.name(),
            profile.site_id
        );
        let started_at = Utc::now();
        let starting_time = Instant::now();
        if self.options.mode == RunMode::Trial {
            tracing::info!("crawler: running in trial mode");
        } else if self.options.skip_delay {
            tracing::warn!("crawler: delay can only be skipped in trial mode, keeping it");
        }

        let (first_category, last_category) = match self.options.categories {
            CategorySelection::Single(index) => (index, index),
            CategorySelection::All => (0, profile.categories.len().saturating_sub(1)),
        };
        let mut state = CrawlState::new(first_category, self.options.start_page);
        if let Err(err) = profile.category(last_category) {
            tracing::error!("crawler: {err}");
            let summary = CrawlSummary::new(
                &state,
                StopReason::Misconfigured(err.to_string()),
                self.options.nominal_page_size,
                started_at,
                starting_time.elapsed(),
            );
            summary.write_to_log();
            return summary;
        }

        let mut buffers = RunBuffers {
            pending: Vec::new(),
            seen_urls: HashSet::new(),
        };
        let mut stop_reason = match fetcher.acquire().await {
            Ok(()) => {
                self.crawl_pages(
                    profile,
                    fetcher,
                    sink,
                    &mut state,
                    &mut buffers,
                    last_category,
                    &token,
                )
                .await
            }
            Err(err) => {
                tracing::error!("crawler: could not open session: {err}");
                StopReason::EngineFailure(err.to_string())
            }
        };
        fetcher.release().await;
        tracing::info!(reason = %stop_reason, "crawler: control loop exited");

        if self.options.flush == FlushPolicy::Buffered {
            match sink.write(&buffers.pending) {
                Ok(()) => state.records_persisted(buffers.pending.len()),
                Err(err) => {
                    tracing::error!(
                        lost = buffers.pending.len(),
                        "crawler: buffered flush failed: {err}"
                    );
                    if !stop_reason.is_fatal() {
                        stop_reason = StopReason::WriteFailure(err.to_string());
                    }
                }
            }
        }

        let summary = CrawlSummary::new(
            &state,
            stop_reason,
            self.options.nominal_page_size,
            started_at,
            starting_time.elapsed(),
        );
        summary.write_to_log();
        summary
    }

    fn delay(&self) -> Option<Duration> {
        let skip = self.options.skip_delay && self.options.mode == RunMode::Trial;
        (!skip).then_some(self.options.delay)
    }

    /// Skipped pages do not count towards the limit.
    fn limit_reached(&self, state: &CrawlState) -> bool {
        self.options
            .max_pages
            .is_some_and(|max| state.pages_crawled >= max)
    }

    fn dedup(
        &self,
        products: Vec<ProductRecord>,
        seen_urls: &mut HashSet<String>,
        state: &mut CrawlState,
    ) -> Vec<ProductRecord> {
        if self.options.dedup == DedupPolicy::Off {
            return products;
        }
        let before = products.len();
        let kept: Vec<ProductRecord> = products
            .into_iter()
            .filter(|product| product.url.is_empty() || seen_urls.insert(product.url.clone()))
            .collect();
        let dropped = before - kept.len();
        if dropped > 0 {
            tracing::debug!(dropped, "crawler: dropped already written urls");
            state.duplicates_dropped += dropped;
        }
        kept
    }

    #[allow(clippy::too_many_arguments)]
    async fn crawl_pages<F, S>(
        &self,
        profile: &SiteProfile,
        fetcher: &F,
        sink: &mut S,
        state: &mut CrawlState,
        buffers: &mut RunBuffers,
        last_category: usize,
        token: &CancellationToken,
    ) -> StopReason
    where
        F: PageFetcher + ?Sized,
        S: Sink + ?Sized,
    {
        let num_categories = profile.categories.len();
        loop {
            if token.is_cancelled() {
                return StopReason::Cancelled;
            }
            if self.limit_reached(state) {
                return StopReason::PageLimit;
            }

            let category = &profile.categories[state.current_category_index];
            let request = PageRequest {
                category: category.name.clone(),
                page_number: state.current_page_number,
                resolved_url: profile
                    .pagination
                    .page_url(&category.base_url, state.current_page_number),
            };
            tracing::info!(
                category = request.category,
                page = request.page_number,
                url = request.resolved_url,
                "crawling category {}/{}",
                state.current_category_index + 1,
                num_categories
            );

            let fetched = tokio::select! {
                biased;
                _ = token.cancelled() => return StopReason::Cancelled,
                fetched = fetcher.fetch(&request) => fetched,
            };
            let raw_records = match fetched {
                Ok(raw_records) if raw_records.is_empty() => {
                    tracing::info!(
                        category = request.category,
                        "no products found on page {}",
                        request.page_number
                    );
                    if state.current_category_index < last_category {
                        state.next_category();
                        continue;
                    }
                    return StopReason::Exhausted;
                }
                Ok(raw_records) => raw_records,
                Err(err) if err.is_page_local() => {
                    tracing::warn!(page = request.page_number, "skipping page: {err}");
                    state.page_skipped();
                    continue;
                }
                Err(err) => {
                    tracing::error!(page = request.page_number, "crawl failed: {err}");
                    return StopReason::EngineFailure(err.to_string());
                }
            };

            let products: Vec<ProductRecord> = raw_records
                .iter()
                .map(|raw| normalize(raw, &request.category, profile))
                .collect();
            let extracted = products.len();
            let products = self.dedup(products, &mut buffers.seen_urls, state);
            state.page_crawled();

            match self.options.flush {
                FlushPolicy::Streaming => {
                    if !products.is_empty() {
                        if let Err(err) = sink.write(&products) {
                            tracing::error!("crawler: {err}");
                            return StopReason::WriteFailure(err.to_string());
                        }
                        state.records_persisted(products.len());
                    }
                }
                FlushPolicy::Buffered => buffers.pending.extend(products),
            }
            tracing::info!(
                page = request.page_number,
                extracted,
                records_written = state.records_written,
                buffered = buffers.pending.len(),
                "page done"
            );

            if self.limit_reached(state) {
                return StopReason::PageLimit;
            }
            if let Some(delay) = self.delay() {
                tracing::info!("proceeding to next page after {:?}", delay);
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return StopReason::Cancelled,
                    _ = sleep(delay) => {}
                }
            }
        }
    }
}
