//! Load average scraper.

use hostmetrics_common::{MetricsBatch, Timestamp};

use crate::config::LoadConfig;
use crate::error::{ScrapeError, ScraperError};
use crate::metadata::{
    MetricDescriptor, SYSTEM_CPU_LOAD_AVERAGE_1M, SYSTEM_CPU_LOAD_AVERAGE_5M,
    SYSTEM_CPU_LOAD_AVERAGE_15M,
};
use crate::scraper::{ScrapeContext, Scraper};
use crate::source::{LoadSource, SysinfoSource};

/// Emits the 1, 5 and 15 minute load averages as gauges.
pub struct LoadScraper {
    config: LoadConfig,
    source: Box<dyn LoadSource>,
    started: bool,
}

impl LoadScraper {
    pub fn new(config: LoadConfig) -> Self {
        Self::with_source(config, Box::new(SysinfoSource::new()))
    }

    pub fn with_source(config: LoadConfig, source: Box<dyn LoadSource>) -> Self {
        Self {
            config,
            source,
            started: false,
        }
    }
}

impl Scraper for LoadScraper {
    fn name(&self) -> &'static str {
        "load"
    }

    // Gauges only; no boot-time baseline needed.
    fn start(&mut self, _ctx: &ScrapeContext) -> Result<(), ScraperError> {
        self.started = true;
        Ok(())
    }

    fn scrape(&mut self, _ctx: &ScrapeContext, batch: &mut MetricsBatch) -> Result<(), ScrapeError> {
        if !self.started {
            return Err(ScrapeError::NotStarted);
        }

        let now = Timestamp::now();
        let load = self.source.load_average().map_err(ScrapeError::fatal)?;

        let divisor = if self.config.cpu_average {
            self.source.cpu_count().max(1) as f64
        } else {
            1.0
        };

        let gauges: [(&MetricDescriptor, f64); 3] = [
            (&SYSTEM_CPU_LOAD_AVERAGE_1M, load.one),
            (&SYSTEM_CPU_LOAD_AVERAGE_5M, load.five),
            (&SYSTEM_CPU_LOAD_AVERAGE_15M, load.fifteen),
        ];
        for (descriptor, value) in gauges {
            let mut metric = descriptor.new_metric();
            metric
                .data_points
                .push(descriptor.data_point(now, now, value / divisor, &[]));
            batch.push_metric(metric);
        }

        Ok(())
    }
}
