//! Performance-counter backend.
//!
//! Counters are grouped into named categories (objects). Each object holds
//! one set of named integer counters per instance, where an instance is a
//! device, a CPU, or the synthetic `_Total` aggregate.
//!
//! A [`PerfCounterScraper`] is initialized once for a category, then scraped
//! every interval to obtain a [`PerfDataCollection`].

mod emulated;

pub use emulated::SourcePerfCounters;

use std::collections::HashMap;

use crate::error::PerfCounterError;
use crate::filter::{FilterSet, passes};

/// Name of the aggregate instance.
pub const TOTAL_INSTANCE: &str = "_Total";

/// Logical disk category and its counters.
pub mod logical_disk {
    pub const CATEGORY: &str = "LogicalDisk";

    pub const READS_PER_SEC: &str = "Disk Reads/sec";
    pub const WRITES_PER_SEC: &str = "Disk Writes/sec";
    pub const READ_BYTES_PER_SEC: &str = "Disk Read Bytes/sec";
    pub const WRITE_BYTES_PER_SEC: &str = "Disk Write Bytes/sec";
    /// Idle time in 100 ns ticks.
    pub const IDLE_TIME: &str = "% Idle Time";
    /// Average time per read in 100 ns ticks.
    pub const AVG_SEC_PER_READ: &str = "Avg. Disk sec/Read";
    /// Average time per write in 100 ns ticks.
    pub const AVG_SEC_PER_WRITE: &str = "Avg. Disk sec/Write";
    pub const QUEUE_LENGTH: &str = "Current Disk Queue Length";

    pub const COUNTERS: &[&str] = &[
        READS_PER_SEC,
        WRITES_PER_SEC,
        READ_BYTES_PER_SEC,
        WRITE_BYTES_PER_SEC,
        IDLE_TIME,
        AVG_SEC_PER_READ,
        AVG_SEC_PER_WRITE,
        QUEUE_LENGTH,
    ];
}

/// Memory category and its counters.
pub mod memory {
    pub const CATEGORY: &str = "Memory";

    pub const PAGE_READS_PER_SEC: &str = "Page Reads/sec";
    pub const PAGE_WRITES_PER_SEC: &str = "Page Writes/sec";

    pub const COUNTERS: &[&str] = &[PAGE_READS_PER_SEC, PAGE_WRITES_PER_SEC];
}

/// Stateful performance-counter query handle.
pub trait PerfCounterScraper: Send {
    /// Prepare the query for `category`. Must be called once before [`scrape`](Self::scrape).
    fn initialize(&mut self, category: &str) -> Result<(), PerfCounterError>;

    /// Read the current value of every counter in the initialized category.
    fn scrape(&mut self) -> Result<PerfDataCollection, PerfCounterError>;
}

/// Counters of one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceData {
    pub name: String,
    pub counters: HashMap<String, i64>,
}

/// One category's counter schema plus its instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfDataObject {
    pub name: String,
    pub counter_names: Vec<String>,
    pub instances: Vec<InstanceData>,
}

/// Requested counter values of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterValues {
    pub instance_name: String,
    pub values: HashMap<String, i64>,
}

impl PerfDataObject {
    /// Drop instances rejected by the include/exclude sets.
    ///
    /// The aggregate instance is dropped only when `exclude_total` is set.
    pub fn filter(
        &mut self,
        include: Option<&FilterSet>,
        exclude: Option<&FilterSet>,
        exclude_total: bool,
    ) {
        self.instances.retain(|instance| {
            if instance.name == TOTAL_INSTANCE {
                return !exclude_total;
            }
            passes(include, exclude, &instance.name)
        });
    }

    /// Values of `names` for every remaining instance, in instance order.
    pub fn get_values(&self, names: &[&str]) -> Result<Vec<CounterValues>, PerfCounterError> {
        if let Some(missing) = names
            .iter()
            .find(|name| !self.counter_names.iter().any(|c| c == *name))
        {
            return Err(PerfCounterError::UnknownCounter {
                category: self.name.clone(),
                counter: missing.to_string(),
            });
        }

        Ok(self
            .instances
            .iter()
            .map(|instance| CounterValues {
                instance_name: instance.name.clone(),
                values: names
                    .iter()
                    .map(|name| {
                        let value = instance.counters.get(*name).copied().unwrap_or_default();
                        (name.to_string(), value)
                    })
                    .collect(),
            })
            .collect())
    }
}

/// Result of one counter query, keyed by category.
#[derive(Debug, Clone, Default)]
pub struct PerfDataCollection {
    objects: HashMap<String, PerfDataObject>,
}

impl PerfDataCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: PerfDataObject) {
        self.objects.insert(object.name.clone(), object);
    }

    /// Take the object for `category` out of the collection.
    pub fn get_object(&mut self, category: &str) -> Result<PerfDataObject, PerfCounterError> {
        self.objects
            .remove(category)
            .ok_or_else(|| PerfCounterError::ObjectNotFound(category.to_string()))
    }
}
