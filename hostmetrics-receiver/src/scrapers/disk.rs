//! Disk I/O scraper.
//!
//! Two backends produce the `system.disk.*` family:
//!
//! - **Direct**: cumulative per-device counters (7 metrics).
//! - **Performance counters**: the `LogicalDisk` category, where active time
//!   is derived from idle time and operation time from per-op averages
//!   (5 metrics).

use hostmetrics_common::{Metric, MetricsBatch, NumberValue, Timestamp};
use tracing::{debug, trace};

use crate::config::{Backend, DiskConfig};
use crate::error::{ScrapeError, ScraperError};
use crate::filter::DeviceFilter;
use crate::metadata::{
    MetricDescriptor, SYSTEM_DISK_IO, SYSTEM_DISK_IO_TIME, SYSTEM_DISK_MERGED,
    SYSTEM_DISK_OPERATION_TIME, SYSTEM_DISK_OPERATIONS, SYSTEM_DISK_PENDING_OPERATIONS,
    SYSTEM_DISK_WEIGHTED_IO_TIME, attributes, values,
};
use crate::perfcounters::{CounterValues, PerfCounterScraper, SourcePerfCounters, logical_disk};
use crate::scraper::{ScrapeContext, Scraper, start_time};
use crate::source::{BootTimeSource, DiskIoCounters, DiskSource, PlatformSource};

/// 100 ns ticks per second.
const TICKS_PER_SEC: f64 = 1e7;

const MS_PER_SEC: f64 = 1e3;

/// Where disk counters come from.
pub enum DiskBackend {
    Direct(Box<dyn DiskSource>),
    PerfCounters {
        clock: Box<dyn BootTimeSource>,
        counters: Box<dyn PerfCounterScraper>,
    },
}

impl DiskBackend {
    fn start_time(&self) -> Result<Timestamp, ScraperError> {
        match self {
            DiskBackend::Direct(source) => start_time(source.as_ref()),
            DiskBackend::PerfCounters { clock, .. } => start_time(clock.as_ref()),
        }
    }
}

/// Emits the `system.disk.*` metrics for every device passing the filter.
pub struct DiskScraper {
    filter: DeviceFilter,
    backend: DiskBackend,
    start_time: Option<Timestamp>,
}

impl DiskScraper {
    /// Build a scraper on the platform's counter source.
    ///
    /// Fails if the include/exclude patterns don't compile.
    pub fn new(config: &DiskConfig) -> Result<Self, ScraperError> {
        let filter = DeviceFilter::new(config.include.as_ref(), config.exclude.as_ref())?;

        let backend = match config.backend {
            Backend::Auto | Backend::Direct => {
                DiskBackend::Direct(Box::new(PlatformSource::default()))
            }
            Backend::PerfCounters => DiskBackend::PerfCounters {
                clock: Box::new(PlatformSource::default()),
                counters: Box::new(SourcePerfCounters::new(PlatformSource::default())),
            },
        };

        Ok(Self::with_backend(filter, backend))
    }

    pub fn with_backend(filter: DeviceFilter, backend: DiskBackend) -> Self {
        Self {
            filter,
            backend,
            start_time: None,
        }
    }

    fn scrape_direct(
        filter: &DeviceFilter,
        source: &dyn DiskSource,
        start: Timestamp,
        batch: &mut MetricsBatch,
    ) -> Result<(), ScrapeError> {
        let now = Timestamp::now();
        let counters = source.io_counters().map_err(ScrapeError::fatal)?;

        let devices: Vec<&DiskIoCounters> = counters
            .iter()
            .filter(|disk| filter.matches(&disk.name))
            .collect();
        trace!(
            read = counters.len(),
            kept = devices.len(),
            "Filtered disk devices"
        );
        if devices.is_empty() {
            return Ok(());
        }

        let ms = |v: u64| v as f64 / MS_PER_SEC;

        batch.push_metric(read_write_metric(
            &SYSTEM_DISK_IO,
            start,
            now,
            devices
                .iter()
                .map(|d| (d.name.as_str(), int(d.read_bytes), int(d.write_bytes))),
        ));
        batch.push_metric(read_write_metric(
            &SYSTEM_DISK_OPERATIONS,
            start,
            now,
            devices
                .iter()
                .map(|d| (d.name.as_str(), int(d.read_count), int(d.write_count))),
        ));
        batch.push_metric(device_metric(
            &SYSTEM_DISK_IO_TIME,
            start,
            now,
            devices
                .iter()
                .map(|d| (d.name.as_str(), NumberValue::Double(ms(d.io_time_ms)))),
        ));
        batch.push_metric(read_write_metric(
            &SYSTEM_DISK_OPERATION_TIME,
            start,
            now,
            devices.iter().map(|d| {
                (
                    d.name.as_str(),
                    NumberValue::Double(ms(d.read_time_ms)),
                    NumberValue::Double(ms(d.write_time_ms)),
                )
            }),
        ));
        batch.push_metric(device_metric(
            &SYSTEM_DISK_WEIGHTED_IO_TIME,
            start,
            now,
            devices
                .iter()
                .map(|d| (d.name.as_str(), NumberValue::Double(ms(d.weighted_io_time_ms)))),
        ));
        batch.push_metric(read_write_metric(
            &SYSTEM_DISK_MERGED,
            start,
            now,
            devices.iter().map(|d| {
                (
                    d.name.as_str(),
                    int(d.merged_read_count),
                    int(d.merged_write_count),
                )
            }),
        ));
        batch.push_metric(device_metric(
            &SYSTEM_DISK_PENDING_OPERATIONS,
            start,
            now,
            devices
                .iter()
                .map(|d| (d.name.as_str(), int(d.in_progress))),
        ));

        Ok(())
    }

    fn scrape_perf_counters(
        filter: &DeviceFilter,
        counters: &mut dyn PerfCounterScraper,
        start: Timestamp,
        batch: &mut MetricsBatch,
    ) -> Result<(), ScrapeError> {
        let now = Timestamp::now();

        let mut object = counters
            .scrape()
            .and_then(|mut collection| collection.get_object(logical_disk::CATEGORY))
            .map_err(ScrapeError::fatal)?;
        object.filter(filter.include(), filter.exclude(), true);

        let devices = object
            .get_values(logical_disk::COUNTERS)
            .map_err(ScrapeError::fatal)?;
        if devices.is_empty() {
            return Ok(());
        }

        let elapsed = now.seconds_since(start);
        let counter = |d: &CounterValues, name: &str| d.values.get(name).copied().unwrap_or_default();
        let avg_secs = |d: &CounterValues, name: &str| counter(d, name) as f64 / TICKS_PER_SEC;

        batch.push_metric(read_write_metric(
            &SYSTEM_DISK_IO,
            start,
            now,
            devices.iter().map(|d| {
                (
                    d.instance_name.as_str(),
                    NumberValue::Int(counter(d, logical_disk::READ_BYTES_PER_SEC)),
                    NumberValue::Int(counter(d, logical_disk::WRITE_BYTES_PER_SEC)),
                )
            }),
        ));
        batch.push_metric(read_write_metric(
            &SYSTEM_DISK_OPERATIONS,
            start,
            now,
            devices.iter().map(|d| {
                (
                    d.instance_name.as_str(),
                    NumberValue::Int(counter(d, logical_disk::READS_PER_SEC)),
                    NumberValue::Int(counter(d, logical_disk::WRITES_PER_SEC)),
                )
            }),
        ));
        batch.push_metric(device_metric(
            &SYSTEM_DISK_IO_TIME,
            start,
            now,
            devices.iter().map(|d| {
                let active = active_time_seconds(elapsed, counter(d, logical_disk::IDLE_TIME));
                (d.instance_name.as_str(), NumberValue::Double(active))
            }),
        ));
        batch.push_metric(read_write_metric(
            &SYSTEM_DISK_OPERATION_TIME,
            start,
            now,
            devices.iter().map(|d| {
                (
                    d.instance_name.as_str(),
                    NumberValue::Double(avg_secs(d, logical_disk::AVG_SEC_PER_READ)),
                    NumberValue::Double(avg_secs(d, logical_disk::AVG_SEC_PER_WRITE)),
                )
            }),
        ));
        batch.push_metric(device_metric(
            &SYSTEM_DISK_PENDING_OPERATIONS,
            start,
            now,
            devices.iter().map(|d| {
                (
                    d.instance_name.as_str(),
                    NumberValue::Int(counter(d, logical_disk::QUEUE_LENGTH)),
                )
            }),
        ));

        Ok(())
    }
}

impl Scraper for DiskScraper {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn start(&mut self, _ctx: &ScrapeContext) -> Result<(), ScraperError> {
        let start = self.backend.start_time()?;

        if let DiskBackend::PerfCounters { counters, .. } = &mut self.backend {
            counters.initialize(logical_disk::CATEGORY)?;
        }

        self.start_time = Some(start);
        Ok(())
    }

    fn scrape(&mut self, _ctx: &ScrapeContext, batch: &mut MetricsBatch) -> Result<(), ScrapeError> {
        let start = self.start_time.ok_or(ScrapeError::NotStarted)?;

        match &mut self.backend {
            DiskBackend::Direct(source) => {
                Self::scrape_direct(&self.filter, source.as_ref(), start, batch)
            }
            DiskBackend::PerfCounters { counters, .. } => {
                Self::scrape_perf_counters(&self.filter, counters.as_mut(), start, batch)
            }
        }
    }
}

/// Seconds a disk was active: time since boot minus idle time.
///
/// `idle_ticks` is in 100 ns units. Clamped at zero when the counters
/// report more idle time than has elapsed.
pub fn active_time_seconds(elapsed_secs: f64, idle_ticks: i64) -> f64 {
    let active = elapsed_secs - idle_ticks as f64 / TICKS_PER_SEC;
    if active < 0.0 {
        debug!(elapsed_secs, idle_ticks, "Disk idle time exceeds elapsed time");
        return 0.0;
    }
    active
}

fn int(value: u64) -> NumberValue {
    NumberValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
}

/// One point per device and direction, ordered (device, read), (device, write).
fn read_write_metric<'a>(
    descriptor: &MetricDescriptor,
    start: Timestamp,
    now: Timestamp,
    devices: impl Iterator<Item = (&'a str, NumberValue, NumberValue)>,
) -> Metric {
    let mut metric = descriptor.new_metric();
    for (device, read, write) in devices {
        for (direction, value) in [
            (values::DIRECTION_READ, read),
            (values::DIRECTION_WRITE, write),
        ] {
            metric.data_points.push(descriptor.data_point(
                start,
                now,
                value,
                &[
                    (attributes::DEVICE, device),
                    (attributes::DIRECTION, direction),
                ],
            ));
        }
    }
    metric
}

fn device_metric<'a>(
    descriptor: &MetricDescriptor,
    start: Timestamp,
    now: Timestamp,
    devices: impl Iterator<Item = (&'a str, NumberValue)>,
) -> Metric {
    let mut metric = descriptor.new_metric();
    for (device, value) in devices {
        metric.data_points.push(descriptor.data_point(
            start,
            now,
            value,
            &[(attributes::DEVICE, device)],
        ));
    }
    metric
}
