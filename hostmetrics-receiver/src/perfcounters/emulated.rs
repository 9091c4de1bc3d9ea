//! Performance counters synthesized from direct counter sources.
//!
//! Exposes the `LogicalDisk` and `Memory` categories in the same units the
//! disk and paging scrapers expect from a native counter subsystem: time
//! counters in 100 ns ticks, rates as raw cumulative counts.

use std::collections::HashMap;

use hostmetrics_common::Timestamp;
use tracing::debug;

use super::{
    InstanceData, PerfCounterScraper, PerfDataCollection, PerfDataObject, TOTAL_INSTANCE,
    logical_disk, memory,
};
use crate::error::PerfCounterError;
use crate::source::{DiskIoCounters, DiskSource, PagingSource};

/// 100 ns ticks per millisecond.
const TICKS_PER_MS: i64 = 10_000;

/// Counter query backed by a [`DiskSource`] + [`PagingSource`].
pub struct SourcePerfCounters<S> {
    source: S,
    category: Option<&'static str>,
}

impl<S: DiskSource + PagingSource> SourcePerfCounters<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            category: None,
        }
    }

    fn logical_disk(&self) -> Result<PerfDataObject, PerfCounterError> {
        let disks = self.source.io_counters()?;
        let uptime_ms = uptime_ms(self.source.boot_time()?);

        let mut total = DiskIoCounters::default();
        let mut instances = Vec::with_capacity(disks.len() + 1);
        for disk in &disks {
            accumulate(&mut total, disk);
            instances.push(disk_instance(&disk.name, disk, uptime_ms));
        }

        // The aggregate is idle for the devices' average idle time
        let device_count = disks.len().max(1) as u64;
        total.io_time_ms /= device_count;
        instances.push(disk_instance(TOTAL_INSTANCE, &total, uptime_ms));

        Ok(object(logical_disk::CATEGORY, logical_disk::COUNTERS, instances))
    }

    fn memory(&self) -> Result<PerfDataObject, PerfCounterError> {
        let vm = self.source.vm_counters()?;

        let instance = InstanceData {
            name: String::new(),
            counters: HashMap::from([
                (memory::PAGE_READS_PER_SEC.to_string(), saturate(vm.swap_in)),
                (memory::PAGE_WRITES_PER_SEC.to_string(), saturate(vm.swap_out)),
            ]),
        };

        Ok(object(memory::CATEGORY, memory::COUNTERS, vec![instance]))
    }

    fn read(&self, category: &str) -> Result<PerfDataObject, PerfCounterError> {
        match category {
            logical_disk::CATEGORY => self.logical_disk(),
            memory::CATEGORY => self.memory(),
            other => Err(PerfCounterError::UnknownCategory(other.to_string())),
        }
    }
}

impl<S: DiskSource + PagingSource> PerfCounterScraper for SourcePerfCounters<S> {
    fn initialize(&mut self, category: &str) -> Result<(), PerfCounterError> {
        let category = [logical_disk::CATEGORY, memory::CATEGORY]
            .into_iter()
            .find(|c| *c == category)
            .ok_or_else(|| PerfCounterError::UnknownCategory(category.to_string()))?;

        // Probe once so an unavailable subsystem fails here, not every interval
        self.read(category)?;
        debug!("Initialized performance counters for '{}'", category);

        self.category = Some(category);
        Ok(())
    }

    fn scrape(&mut self) -> Result<PerfDataCollection, PerfCounterError> {
        let category = self.category.ok_or(PerfCounterError::NotInitialized)?;

        let mut collection = PerfDataCollection::new();
        collection.insert(self.read(category)?);
        Ok(collection)
    }
}

fn object(name: &str, counters: &[&str], instances: Vec<InstanceData>) -> PerfDataObject {
    PerfDataObject {
        name: name.to_string(),
        counter_names: counters.iter().map(|c| c.to_string()).collect(),
        instances,
    }
}

fn disk_instance(name: &str, disk: &DiskIoCounters, uptime_ms: i64) -> InstanceData {
    let idle_ms = (uptime_ms - saturate(disk.io_time_ms)).max(0);

    let counters = [
        (logical_disk::READS_PER_SEC, saturate(disk.read_count)),
        (logical_disk::WRITES_PER_SEC, saturate(disk.write_count)),
        (logical_disk::READ_BYTES_PER_SEC, saturate(disk.read_bytes)),
        (logical_disk::WRITE_BYTES_PER_SEC, saturate(disk.write_bytes)),
        (logical_disk::IDLE_TIME, idle_ms.saturating_mul(TICKS_PER_MS)),
        (
            logical_disk::AVG_SEC_PER_READ,
            average_ticks(disk.read_time_ms, disk.read_count),
        ),
        (
            logical_disk::AVG_SEC_PER_WRITE,
            average_ticks(disk.write_time_ms, disk.write_count),
        ),
        (logical_disk::QUEUE_LENGTH, saturate(disk.in_progress)),
    ];

    InstanceData {
        name: name.to_string(),
        counters: counters
            .into_iter()
            .map(|(counter, value)| (counter.to_string(), value))
            .collect(),
    }
}

/// Average time per operation, in 100 ns ticks.
fn average_ticks(time_ms: u64, count: u64) -> i64 {
    if count == 0 {
        return 0;
    }
    saturate(time_ms).saturating_mul(TICKS_PER_MS) / saturate(count)
}

fn accumulate(total: &mut DiskIoCounters, disk: &DiskIoCounters) {
    total.read_count = total.read_count.saturating_add(disk.read_count);
    total.write_count = total.write_count.saturating_add(disk.write_count);
    total.read_bytes = total.read_bytes.saturating_add(disk.read_bytes);
    total.write_bytes = total.write_bytes.saturating_add(disk.write_bytes);
    total.read_time_ms = total.read_time_ms.saturating_add(disk.read_time_ms);
    total.write_time_ms = total.write_time_ms.saturating_add(disk.write_time_ms);
    total.io_time_ms = total.io_time_ms.saturating_add(disk.io_time_ms);
    total.in_progress = total.in_progress.saturating_add(disk.in_progress);
}

/// Milliseconds since boot, on the same clock the scrapers stamp points with.
fn uptime_ms(boot_secs: u64) -> i64 {
    let uptime = Timestamp::now().seconds_since(Timestamp::from_unix_secs(boot_secs));
    (uptime * 1000.0) as i64
}

fn saturate(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
