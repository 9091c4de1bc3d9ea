//! Serial scrape runner.

use hostmetrics_common::MetricsBatch;
use tracing::{debug, error, info, warn};

use crate::config::ScrapersConfig;
use crate::error::{ScrapeError, ScraperError};
use crate::scraper::{ScrapeContext, Scraper};
use crate::scrapers::{CpuScraper, DiskScraper, LoadScraper, PagingScraper, ProcessScraper};

/// Owns the enabled scrapers and drives them through their lifecycle.
///
/// Scrapers run one after another into a single batch per interval.
pub struct ScrapeRunner {
    scrapers: Vec<Box<dyn Scraper>>,
    ctx: ScrapeContext,
}

impl ScrapeRunner {
    pub fn new(ctx: ScrapeContext) -> Self {
        Self {
            scrapers: Vec::new(),
            ctx,
        }
    }

    /// Build every scraper with a section in `config`.
    ///
    /// Fails if a scraper cannot be constructed (e.g. an invalid filter pattern).
    pub fn from_config(config: &ScrapersConfig, ctx: ScrapeContext) -> Result<Self, ScraperError> {
        let mut runner = Self::new(ctx);

        if let Some(cpu) = &config.cpu {
            runner.add(Box::new(CpuScraper::new(cpu.clone())));
        }
        if let Some(disk) = &config.disk {
            runner.add(Box::new(DiskScraper::new(disk)?));
        }
        if let Some(paging) = &config.paging {
            runner.add(Box::new(PagingScraper::new(paging)));
        }
        if let Some(load) = &config.load {
            runner.add(Box::new(LoadScraper::new(load.clone())));
        }
        if let Some(process) = &config.process {
            runner.add(Box::new(ProcessScraper::new(process)?));
        }

        Ok(runner)
    }

    pub fn add(&mut self, scraper: Box<dyn Scraper>) {
        self.scrapers.push(scraper);
    }

    /// Start every scraper. Scrapers that fail to start are dropped.
    pub fn start_all(&mut self) -> Vec<(&'static str, ScraperError)> {
        let mut failures = Vec::new();
        let mut started = Vec::with_capacity(self.scrapers.len());

        for mut scraper in self.scrapers.drain(..) {
            match scraper.start(&self.ctx) {
                Ok(()) => {
                    info!(scraper = scraper.name(), "Scraper started");
                    started.push(scraper);
                }
                Err(e) => {
                    warn!(scraper = scraper.name(), error = %e, "Scraper failed to start, disabling");
                    failures.push((scraper.name(), e));
                }
            }
        }

        self.scrapers = started;
        failures
    }

    /// Run every scraper once into a new batch.
    ///
    /// Returns the batch plus the error of each scraper that failed fully or
    /// partially. Once the context is cancelled the remaining scrapers are skipped.
    pub fn scrape_all(&mut self) -> (MetricsBatch, Vec<(&'static str, ScrapeError)>) {
        let mut batch = MetricsBatch::new();
        let mut errors = Vec::new();

        for scraper in &mut self.scrapers {
            if self.ctx.is_cancelled() {
                debug!(scraper = scraper.name(), "Scrape cancelled, skipping");
                break;
            }
            match scraper.scrape(&self.ctx, &mut batch) {
                Ok(()) => {}
                Err(e @ ScrapeError::Partial { failed, .. }) => {
                    warn!(scraper = scraper.name(), failed, error = %e, "Partial scrape");
                    errors.push((scraper.name(), e));
                }
                Err(e) => {
                    error!(scraper = scraper.name(), error = %e, "Scrape failed");
                    errors.push((scraper.name(), e));
                }
            }
        }

        debug!(
            metrics = batch.metric_count(),
            data_points = batch.data_point_count(),
            errors = errors.len(),
            "Scrape complete"
        );

        (batch, errors)
    }

    pub fn len(&self) -> usize {
        self.scrapers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrapers.is_empty()
    }
}
