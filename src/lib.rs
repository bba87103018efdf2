//! A library for crawling paginated product catalogs.
//!
//! A [`Crawler`] drives a [`PageFetcher`] through the category listings of a
//! [`SiteProfile`], normalizes what it extracts into [`ProductRecord`]s and
//! appends them to a [`Sink`].

pub mod config;
pub mod crawler;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod normalize;
pub mod profile;
pub mod record;
mod shutdown;
pub mod sink;

pub use crawler::{Crawler, CrawlerOptions};
pub use fetcher::PageFetcher;
pub use profile::SiteProfile;
pub use record::ProductRecord;
pub use sink::Sink;
