//! Raw OS counter sources.
//!
//! Scrapers never talk to the OS directly: each owns a boxed source
//! implementing the read traits below. Production code binds them to
//! [`PlatformSource`] (procfs on Linux, sysinfo elsewhere); tests bind them
//! to deterministic stubs.

#[cfg(target_os = "linux")]
mod linux;
mod portable;

#[cfg(target_os = "linux")]
pub use linux::{ProcfsSource, parse_swaps, vm_counters};
pub use portable::SysinfoSource;

use crate::error::SourceError;

/// Source used by scrapers built from configuration.
#[cfg(target_os = "linux")]
pub type PlatformSource = ProcfsSource;

/// Source used by scrapers built from configuration.
#[cfg(not(target_os = "linux"))]
pub type PlatformSource = SysinfoSource;

/// Instance name of the system-wide CPU aggregate.
pub const CPU_TOTAL: &str = "cpu-total";

/// Time spent by one CPU (or the aggregate) in each state, in seconds since boot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuTimes {
    pub cpu: String,
    pub user: f64,
    pub system: f64,
    pub iowait: f64,
}

/// Cumulative I/O counters of one block device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskIoCounters {
    pub name: String,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_count: u64,
    pub write_count: u64,
    pub merged_read_count: u64,
    pub merged_write_count: u64,
    pub read_time_ms: u64,
    pub write_time_ms: u64,
    pub io_time_ms: u64,
    pub weighted_io_time_ms: u64,
    /// Operations currently in flight.
    pub in_progress: u64,
}

/// Usage of one swap device or page file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFileStats {
    pub device: String,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

/// Cumulative virtual-memory activity counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmCounters {
    /// Pages swapped in.
    pub swap_in: u64,
    /// Pages swapped out.
    pub swap_out: u64,
    /// Pages paged in from disk.
    pub page_in: u64,
    /// Pages paged out to disk.
    pub page_out: u64,
    pub major_faults: u64,
    pub minor_faults: u64,
}

/// Load averages over 1, 5 and 15 minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// CPU time of one process, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessCpuTimes {
    pub user: f64,
    pub system: f64,
    pub iowait: f64,
}

/// Memory usage of one process, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessMemory {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
}

/// Reads the system boot time.
pub trait BootTimeSource: Send {
    /// Boot time in seconds since the Unix epoch.
    fn boot_time(&self) -> Result<u64, SourceError>;
}

/// Reads CPU time-in-state counters.
pub trait CpuSource: BootTimeSource {
    /// Per-CPU times, or a single [`CPU_TOTAL`] entry when `per_cpu` is false.
    fn cpu_times(&self, per_cpu: bool) -> Result<Vec<CpuTimes>, SourceError>;
}

/// Reads block device I/O counters.
pub trait DiskSource: BootTimeSource {
    /// Counters per device, in the order the OS reports them.
    fn io_counters(&self) -> Result<Vec<DiskIoCounters>, SourceError>;
}

/// Reads swap and paging counters.
pub trait PagingSource: BootTimeSource {
    fn page_files(&self) -> Result<Vec<PageFileStats>, SourceError>;
    fn vm_counters(&self) -> Result<VmCounters, SourceError>;
}

/// Enumerates processes.
pub trait ProcessSource: BootTimeSource {
    fn processes(&self) -> Result<Vec<Box<dyn ProcessHandle>>, SourceError>;
}

/// Handle on a single process. Every read may fail (the process may have
/// exited, or access may be denied).
pub trait ProcessHandle: Send {
    fn pid(&self) -> i32;
    fn name(&self) -> Result<String, SourceError>;
    fn exe(&self) -> Result<String, SourceError>;
    fn cmdline(&self) -> Result<Vec<String>, SourceError>;
    fn cpu_times(&self) -> Result<ProcessCpuTimes, SourceError>;
    fn memory(&self) -> Result<ProcessMemory, SourceError>;
}

/// Reads load averages.
pub trait LoadSource: Send {
    fn load_average(&self) -> Result<LoadAverage, SourceError>;

    /// Number of logical CPUs.
    fn cpu_count(&self) -> usize;
}
