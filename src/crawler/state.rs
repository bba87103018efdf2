/// Position and counters of one run. Only the crawler mutates it and it is
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    pub current_category_index: usize,
    pub current_page_number: usize,
    pub pages_crawled: usize,
    pub pages_skipped: usize,
    pub records_written: usize,
    pub duplicates_dropped: usize,
}

impl CrawlState {
    pub fn new(category_index: usize, start_page: usize) -> Self {
        Self {
            current_category_index: category_index,
            current_page_number: start_page,
            pages_crawled: 0,
            pages_skipped: 0,
            records_written: 0,
            duplicates_dropped: 0,
        }
    }

    pub fn page_crawled(&mut self) {
        self.pages_crawled += 1;
        self.current_page_number += 1;
    }

    pub fn records_persisted(&mut self, records: usize) {
        self.records_written += records;
    }

    pub fn page_skipped(&mut self) {
        self.pages_skipped += 1;
        self.current_page_number += 1;
    }

    pub fn next_category(&mut self) {
        self.current_category_index += 1;
        self.current_page_number = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_follow_page_outcomes() {
        let mut state = CrawlState::new(0, 3);
        state.page_crawled();
        state.records_persisted(20);
        state.page_skipped();
        state.page_crawled();
        state.records_persisted(5);
        assert_eq!(state.current_page_number, 6);
        assert_eq!(state.pages_crawled, 2);
        assert_eq!(state.pages_skipped, 1);
        assert_eq!(state.records_written, 25);

        state.next_category();
        assert_eq!(state.current_category_index, 1);
        assert_eq!(state.current_page_number, 1);
        assert_eq!(state.records_written, 25);
    }
}
