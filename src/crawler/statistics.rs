use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};

use super::state::CrawlState;

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every selected category returned an empty page.
    Exhausted,
    /// The configured page limit was reached.
    PageLimit,
    Cancelled,
    /// The run could not start, e.g. a category index outside the profile.
    Misconfigured(String),
    EngineFailure(String),
    WriteFailure(String),
}

impl StopReason {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StopReason::Misconfigured(_)
                | StopReason::EngineFailure(_)
                | StopReason::WriteFailure(_)
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => f.write_str("pagination exhausted"),
            StopReason::PageLimit => f.write_str("page limit reached"),
            StopReason::Cancelled => f.write_str("cancelled"),
            StopReason::Misconfigured(reason) => write!(f, "misconfigured: {reason}"),
            StopReason::EngineFailure(reason) => write!(f, "engine failure: {reason}"),
            StopReason::WriteFailure(reason) => write!(f, "write failure: {reason}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub pages_crawled: usize,
    pub pages_skipped: usize,
    pub records_written: usize,
    pub duplicates_dropped: usize,
    /// Lower bound on the records available, from the page count. The
    /// engine reports no total, so this is never authoritative.
    pub estimated_total: usize,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub running_time: Duration,
}

impl CrawlSummary {
    pub fn new(
        state: &CrawlState,
        stop_reason: StopReason,
        nominal_page_size: usize,
        started_at: DateTime<Utc>,
        running_time: Duration,
    ) -> Self {
        Self {
            pages_crawled: state.pages_crawled,
            pages_skipped: state.pages_skipped,
            records_written: state.records_written,
            duplicates_dropped: state.duplicates_dropped,
            estimated_total: estimate_total(state.pages_crawled, nominal_page_size),
            stop_reason,
            started_at,
            finished_at: Utc::now(),
            running_time,
        }
    }

    pub fn write_to_log(&self) {
        tracing::info!(
            pages_crawled = self.pages_crawled,
            pages_skipped = self.pages_skipped,
            records_written = self.records_written,
            duplicates_dropped = self.duplicates_dropped,
            estimated_total_lower_bound = self.estimated_total,
            stop_reason = %self.stop_reason,
            started_at = %self.started_at,
            finished_at = %self.finished_at,
            running_time = ?self.running_time,
            "statistics"
        );
        tracing::info!(
            "crawl complete: {} records written; estimate only: at least {} records were listed",
            self.records_written,
            self.estimated_total
        );
    }
}

/// `(pages_crawled - 1) * nominal_page_size`: every page but the last is
/// assumed full.
pub fn estimate_total(pages_crawled: usize, nominal_page_size: usize) -> usize {
    pages_crawled.saturating_sub(1) * nominal_page_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_assumes_all_but_last_page_full() {
        assert_eq!(estimate_total(0, 20), 0);
        assert_eq!(estimate_total(1, 20), 0);
        assert_eq!(estimate_total(5, 20), 80);
    }

    #[test]
    fn only_failures_are_fatal() {
        assert!(StopReason::EngineFailure("timeout".into()).is_fatal());
        assert!(StopReason::WriteFailure("denied".into()).is_fatal());
        assert!(!StopReason::Exhausted.is_fatal());
        assert!(!StopReason::Cancelled.is_fatal());
    }
}
