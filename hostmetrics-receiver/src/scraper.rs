//! Scraper lifecycle shared by every resource domain.

use hostmetrics_common::{MetricsBatch, Timestamp};
use tokio_util::sync::CancellationToken;

use crate::error::{ScrapeError, ScraperError};
use crate::source::BootTimeSource;

/// Per-call context handed to scrapers.
#[derive(Debug, Clone, Default)]
pub struct ScrapeContext {
    cancel: CancellationToken,
}

impl ScrapeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context observing an existing cancellation token.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// A scraper for one resource domain.
///
/// `start` is called once before the first `scrape`; `scrape` is then called
/// once per collection interval, never concurrently with itself.
pub trait Scraper: Send {
    /// Short domain name used in logs.
    fn name(&self) -> &'static str;

    /// Record the boot-time baseline and prepare any counter query.
    fn start(&mut self, ctx: &ScrapeContext) -> Result<(), ScraperError>;

    /// Append this interval's metrics to `batch`.
    fn scrape(&mut self, ctx: &ScrapeContext, batch: &mut MetricsBatch) -> Result<(), ScrapeError>;
}

/// Start timestamp of cumulative sums: the system boot time.
pub fn start_time<S: BootTimeSource + ?Sized>(source: &S) -> Result<Timestamp, ScraperError> {
    source
        .boot_time()
        .map(Timestamp::from_unix_secs)
        .map_err(ScraperError::BootTime)
}
