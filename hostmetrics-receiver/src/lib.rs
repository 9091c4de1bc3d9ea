//! Host metrics scraping engine.
//!
//! Periodically samples operating-system counters and turns them into
//! dimensioned metrics in a [`MetricsBatch`](hostmetrics_common::MetricsBatch).
//!
//! # Scrapers
//!
//! | Scraper | Metrics |
//! |---------|---------|
//! | cpu     | `system.cpu.time` |
//! | disk    | `system.disk.{io,operations,io_time,operation_time,weighted_io_time,merged,pending_operations}` |
//! | paging  | `system.paging.{usage,operations,faults}` |
//! | load    | `system.cpu.load_average.{1m,5m,15m}` |
//! | process | `process.cpu.time`, `process.memory.{physical,virtual}_usage` |
//!
//! Each scraper reads from a counter source trait ([`source`]) so the
//! platform reader can be swapped for a stub in tests. Disk and paging can
//! alternatively read from the [`perfcounters`] backend.

pub mod args;
pub mod config;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod perfcounters;
pub mod runner;
pub mod scraper;
pub mod scrapers;
pub mod source;

pub use args::ReceiverArgs;
pub use error::{PerfCounterError, ScrapeError, ScrapeErrors, ScraperError, SourceError};
pub use runner::ScrapeRunner;
pub use scraper::{ScrapeContext, Scraper};
