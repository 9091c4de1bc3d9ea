//! CPU time scraper.

use hostmetrics_common::{Metric, MetricsBatch, Timestamp};
use tracing::trace;

use crate::config::CpuConfig;
use crate::error::{ScrapeError, ScraperError};
use crate::metadata::{SYSTEM_CPU_TIME, attributes, values};
use crate::scraper::{ScrapeContext, Scraper, start_time};
use crate::source::{CPU_TOTAL, CpuSource, CpuTimes, PlatformSource};

/// Emits `system.cpu.time` per CPU and state.
pub struct CpuScraper {
    config: CpuConfig,
    source: Box<dyn CpuSource>,
    start_time: Option<Timestamp>,
}

impl CpuScraper {
    pub fn new(config: CpuConfig) -> Self {
        Self::with_source(config, Box::new(PlatformSource::default()))
    }

    pub fn with_source(config: CpuConfig, source: Box<dyn CpuSource>) -> Self {
        Self {
            config,
            source,
            start_time: None,
        }
    }
}

impl Scraper for CpuScraper {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn start(&mut self, _ctx: &ScrapeContext) -> Result<(), ScraperError> {
        self.start_time = Some(start_time(self.source.as_ref())?);
        Ok(())
    }

    fn scrape(&mut self, _ctx: &ScrapeContext, batch: &mut MetricsBatch) -> Result<(), ScrapeError> {
        let start = self.start_time.ok_or(ScrapeError::NotStarted)?;
        let now = Timestamp::now();

        let times = self
            .source
            .cpu_times(self.config.per_cpu)
            .map_err(ScrapeError::fatal)?;
        trace!(cpus = times.len(), "Read CPU times");

        batch.push_metric(cpu_time_metric(start, now, &times));
        Ok(())
    }
}

/// Build `system.cpu.time` with one point per CPU and state.
///
/// The `cpu` attribute is omitted for the aggregate pseudo-CPU.
pub fn cpu_time_metric(start: Timestamp, now: Timestamp, times: &[CpuTimes]) -> Metric {
    let mut metric = SYSTEM_CPU_TIME.new_metric();

    for cpu in times {
        for (state, seconds) in [
            (values::STATE_USER, cpu.user),
            (values::STATE_SYSTEM, cpu.system),
            (values::STATE_WAIT, cpu.iowait),
        ] {
            let point = if cpu.cpu == CPU_TOTAL {
                SYSTEM_CPU_TIME.data_point(start, now, seconds, &[(attributes::STATE, state)])
            } else {
                SYSTEM_CPU_TIME.data_point(
                    start,
                    now,
                    seconds,
                    &[(attributes::CPU, cpu.cpu.as_str()), (attributes::STATE, state)],
                )
            };
            metric.data_points.push(point);
        }
    }

    metric
}
