//! Paging / swap scraper.
//!
//! Usage and activity are read independently; a failure in one group is
//! recorded as a partial error and the other group is still emitted.

use hostmetrics_common::{Metric, MetricsBatch, Timestamp};

use crate::config::{Backend, PagingConfig};
use crate::error::{PerfCounterError, ScrapeError, ScrapeErrors, ScraperError};
use crate::metadata::{
    SYSTEM_PAGING_FAULTS, SYSTEM_PAGING_OPERATIONS, SYSTEM_PAGING_USAGE, attributes, values,
};
use crate::perfcounters::{PerfCounterScraper, SourcePerfCounters, memory};
use crate::scraper::{ScrapeContext, Scraper, start_time};
use crate::source::{PageFileStats, PagingSource, PlatformSource, VmCounters};

/// Metrics in the usage group.
const USAGE_METRICS: usize = 1;

/// Emits `system.paging.usage`, `system.paging.operations` and, on the
/// direct reader, `system.paging.faults`.
pub struct PagingScraper {
    source: Box<dyn PagingSource>,
    /// Replaces the direct reader for the operations group when set.
    counters: Option<Box<dyn PerfCounterScraper>>,
    start_time: Option<Timestamp>,
}

impl PagingScraper {
    pub fn new(config: &PagingConfig) -> Self {
        let counters: Option<Box<dyn PerfCounterScraper>> = match config.backend {
            Backend::Auto | Backend::Direct => None,
            Backend::PerfCounters => Some(Box::new(SourcePerfCounters::new(
                PlatformSource::default(),
            ))),
        };

        Self::with_source(Box::new(PlatformSource::default()), counters)
    }

    pub fn with_source(
        source: Box<dyn PagingSource>,
        counters: Option<Box<dyn PerfCounterScraper>>,
    ) -> Self {
        Self {
            source,
            counters,
            start_time: None,
        }
    }

    fn scrape_usage(&self, batch: &mut MetricsBatch, errors: &mut ScrapeErrors) {
        let now = Timestamp::now();
        match self.source.page_files() {
            Ok(page_files) => batch.push_metric(usage_metric(now, &page_files)),
            Err(e) => errors.add_partial(USAGE_METRICS, e),
        }
    }

    fn scrape_operations(
        &mut self,
        start: Timestamp,
        batch: &mut MetricsBatch,
        errors: &mut ScrapeErrors,
    ) {
        let now = Timestamp::now();

        match self.counters.as_mut() {
            Some(counters) => match read_page_counters(counters.as_mut()) {
                Ok((reads, writes)) => {
                    batch.push_metric(perf_operations_metric(start, now, reads, writes))
                }
                Err(e) => errors.add_partial(1, e),
            },
            None => match self.source.vm_counters() {
                Ok(vm) => {
                    batch.push_metric(operations_metric(start, now, &vm));
                    batch.push_metric(faults_metric(start, now, &vm));
                }
                Err(e) => errors.add_partial(2, e),
            },
        }
    }
}

impl Scraper for PagingScraper {
    fn name(&self) -> &'static str {
        "paging"
    }

    fn start(&mut self, _ctx: &ScrapeContext) -> Result<(), ScraperError> {
        let start = start_time(self.source.as_ref())?;

        if let Some(counters) = self.counters.as_mut() {
            counters.initialize(memory::CATEGORY)?;
        }

        self.start_time = Some(start);
        Ok(())
    }

    fn scrape(&mut self, _ctx: &ScrapeContext, batch: &mut MetricsBatch) -> Result<(), ScrapeError> {
        let start = self.start_time.ok_or(ScrapeError::NotStarted)?;
        let mut errors = ScrapeErrors::new();

        self.scrape_usage(batch, &mut errors);
        self.scrape_operations(start, batch, &mut errors);

        errors.combine()
    }
}

fn read_page_counters(
    counters: &mut dyn PerfCounterScraper,
) -> Result<(i64, i64), PerfCounterError> {
    let values = counters
        .scrape()?
        .get_object(memory::CATEGORY)?
        .get_values(memory::COUNTERS)?;

    // Memory has a single instance
    let instance = values
        .into_iter()
        .next()
        .ok_or_else(|| PerfCounterError::ObjectNotFound(memory::CATEGORY.to_string()))?;
    let get = |name: &str| instance.values.get(name).copied().unwrap_or_default();

    Ok((
        get(memory::PAGE_READS_PER_SEC),
        get(memory::PAGE_WRITES_PER_SEC),
    ))
}

fn usage_metric(now: Timestamp, page_files: &[PageFileStats]) -> Metric {
    let mut metric = SYSTEM_PAGING_USAGE.new_metric();
    for page_file in page_files {
        for (state, bytes) in [
            (values::STATE_USED, page_file.used_bytes),
            (values::STATE_FREE, page_file.free_bytes),
        ] {
            metric.data_points.push(SYSTEM_PAGING_USAGE.data_point(
                now,
                now,
                saturate(bytes),
                &[
                    (attributes::DEVICE, page_file.device.as_str()),
                    (attributes::STATE, state),
                ],
            ));
        }
    }
    metric
}

fn operations_metric(start: Timestamp, now: Timestamp, vm: &VmCounters) -> Metric {
    let mut metric = SYSTEM_PAGING_OPERATIONS.new_metric();
    for (kind, page_in, page_out) in [
        (values::TYPE_MAJOR, vm.swap_in, vm.swap_out),
        (values::TYPE_MINOR, vm.page_in, vm.page_out),
    ] {
        for (direction, count) in [
            (values::DIRECTION_PAGE_IN, page_in),
            (values::DIRECTION_PAGE_OUT, page_out),
        ] {
            metric.data_points.push(SYSTEM_PAGING_OPERATIONS.data_point(
                start,
                now,
                saturate(count),
                &[(attributes::DIRECTION, direction), (attributes::TYPE, kind)],
            ));
        }
    }
    metric
}

fn perf_operations_metric(start: Timestamp, now: Timestamp, reads: i64, writes: i64) -> Metric {
    let mut metric = SYSTEM_PAGING_OPERATIONS.new_metric();
    for (direction, count) in [
        (values::DIRECTION_PAGE_IN, reads),
        (values::DIRECTION_PAGE_OUT, writes),
    ] {
        metric.data_points.push(SYSTEM_PAGING_OPERATIONS.data_point(
            start,
            now,
            count,
            &[
                (attributes::DIRECTION, direction),
                (attributes::TYPE, values::TYPE_MAJOR),
            ],
        ));
    }
    metric
}

fn faults_metric(start: Timestamp, now: Timestamp, vm: &VmCounters) -> Metric {
    let mut metric = SYSTEM_PAGING_FAULTS.new_metric();
    for (kind, count) in [
        (values::TYPE_MAJOR, vm.major_faults),
        (values::TYPE_MINOR, vm.minor_faults),
    ] {
        metric.data_points.push(SYSTEM_PAGING_FAULTS.data_point(
            start,
            now,
            saturate(count),
            &[(attributes::TYPE, kind)],
        ));
    }
    metric
}

fn saturate(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
