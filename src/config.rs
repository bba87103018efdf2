//! Profile files and run settings.
//!
//! A profile file is a JSON [`SiteProfile`] with an optional `run` section:
//!
//! ```json
//! {
//!   "site_id": "startech",
//!   "domain_root": "https://www.startech.com.bd/",
//!   "categories": [{"name": "Laptop", "base_url": "https://www.startech.com.bd/laptop-notebook"}],
//!   "schema": {"name": "Product", "base_selector": ".p-item-inner", "fields": []},
//!   "content_selector": ".main-content",
//!   "run": {"delay_secs": 5, "main_file": "startech.csv", "categories": "all"}
//! }
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    crawler::{
        CategorySelection, CrawlerOptions, DedupPolicy, RunMode, DEFAULT_DELAY,
        DEFAULT_NOMINAL_PAGE_SIZE,
    },
    error::ConfigError,
    profile::SiteProfile,
    sink::{FlushPolicy, DEFAULT_LIST_SEPARATOR},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub delay_secs: f64,
    pub skip_delay: bool,
    pub main_file: PathBuf,
    pub test_file: PathBuf,
    /// Writes to `test_file` and stops after one page.
    pub test_mode: bool,
    pub start_page: usize,
    pub categories: CategorySelection,
    pub flush: FlushPolicy,
    pub dedup: DedupPolicy,
    pub nominal_page_size: usize,
    pub list_separator: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            delay_secs: DEFAULT_DELAY.as_secs_f64(),
            skip_delay: false,
            main_file: PathBuf::from("products.csv"),
            test_file: PathBuf::from("test_products.csv"),
            test_mode: false,
            start_page: 1,
            categories: CategorySelection::default(),
            flush: FlushPolicy::default(),
            dedup: DedupPolicy::default(),
            nominal_page_size: DEFAULT_NOMINAL_PAGE_SIZE,
            list_separator: DEFAULT_LIST_SEPARATOR.to_string(),
        }
    }
}

impl RunSettings {
    pub fn destination(&self) -> &Path {
        if self.test_mode {
            &self.test_file
        } else {
            &self.main_file
        }
    }

    pub fn crawler_options(&self) -> Result<CrawlerOptions, ConfigError> {
        let delay = Duration::try_from_secs_f64(self.delay_secs.max(0.0)).map_err(|err| {
            ConfigError::InvalidDelay {
                value: self.delay_secs,
                reason: err.to_string(),
            }
        })?;
        Ok(CrawlerOptions {
            delay,
            skip_delay: self.skip_delay,
            mode: if self.test_mode {
                RunMode::Trial
            } else {
                RunMode::Production
            },
            start_page: self.start_page.max(1),
            categories: self.categories,
            flush: self.flush,
            dedup: self.dedup,
            max_pages: self.test_mode.then_some(1),
            nominal_page_size: self.nominal_page_size,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ProfileFile {
    #[serde(flatten)]
    profile: SiteProfile,
    #[serde(default)]
    run: RunSettings,
}

pub fn parse_profile(json: &str) -> Result<(SiteProfile, RunSettings), ConfigError> {
    let ProfileFile { profile, run } = serde_json::from_str(json)?;
    profile.validate()?;
    if let CategorySelection::Single(index) = run.categories {
        profile.category(index)?;
    }
    run.crawler_options()?;
    Ok((profile, run))
}

pub fn load_profile(path: &Path) -> Result<(SiteProfile, RunSettings), ConfigError> {
    let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = parse_profile(&json)?;
    tracing::info!(
        site = loaded.0.site_id,
        categories = loaded.0.categories.len(),
        "loaded profile from '{}'",
        path.display()
    );
    Ok(loaded)
}
