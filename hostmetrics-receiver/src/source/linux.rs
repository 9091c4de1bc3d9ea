//! Linux counter source using procfs.
//!
//! Reads:
//! - CPU time breakdown from `/proc/stat`
//! - Block device I/O counters from `/proc/diskstats`
//! - Swap devices from `/proc/swaps` and paging activity from `/proc/vmstat`
//! - Per-process accounting from `/proc/<pid>/{stat,exe,cmdline}`

use std::collections::HashMap;

use procfs::CurrentSI;
use procfs::process::Process;
use tracing::trace;

use super::{
    BootTimeSource, CPU_TOTAL, CpuSource, CpuTimes, DiskIoCounters, DiskSource, PageFileStats,
    PagingSource, ProcessCpuTimes, ProcessHandle, ProcessMemory, ProcessSource, VmCounters,
};
use crate::error::SourceError;

/// Sector size used by `/proc/diskstats`, independent of the device.
const SECTOR_SIZE: u64 = 512;

/// `/proc/swaps` reports sizes in KiB.
const SWAPS_UNIT: u64 = 1024;

/// Counter source backed by `/proc`.
#[derive(Debug, Clone, Copy)]
pub struct ProcfsSource {
    ticks_per_second: u64,
    page_size: u64,
}

impl ProcfsSource {
    pub fn new() -> Self {
        Self {
            ticks_per_second: procfs::ticks_per_second(),
            page_size: procfs::page_size(),
        }
    }

    /// Convert clock ticks to seconds.
    fn ticks_to_secs(&self, ticks: u64) -> f64 {
        ticks as f64 / self.ticks_per_second as f64
    }

    fn cpu_times_from(&self, cpu: String, time: &procfs::CpuTime) -> CpuTimes {
        CpuTimes {
            cpu,
            user: self.ticks_to_secs(time.user),
            system: self.ticks_to_secs(time.system),
            iowait: self.ticks_to_secs(time.iowait.unwrap_or(0)),
        }
    }
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl BootTimeSource for ProcfsSource {
    fn boot_time(&self) -> Result<u64, SourceError> {
        Ok(procfs::boot_time_secs()?)
    }
}

impl CpuSource for ProcfsSource {
    fn cpu_times(&self, per_cpu: bool) -> Result<Vec<CpuTimes>, SourceError> {
        let stat = procfs::KernelStats::current()?;

        if !per_cpu {
            return Ok(vec![self.cpu_times_from(CPU_TOTAL.to_string(), &stat.total)]);
        }

        Ok(stat
            .cpu_time
            .iter()
            .enumerate()
            .map(|(i, cpu)| self.cpu_times_from(format!("cpu{}", i), cpu))
            .collect())
    }
}

impl DiskSource for ProcfsSource {
    fn io_counters(&self) -> Result<Vec<DiskIoCounters>, SourceError> {
        let diskstats = procfs::diskstats()?;

        Ok(diskstats
            .into_iter()
            .map(|disk| DiskIoCounters {
                read_bytes: disk.sectors_read * SECTOR_SIZE,
                write_bytes: disk.sectors_written * SECTOR_SIZE,
                read_count: disk.reads,
                write_count: disk.writes,
                merged_read_count: disk.merged,
                merged_write_count: disk.writes_merged,
                read_time_ms: disk.time_reading,
                write_time_ms: disk.time_writing,
                io_time_ms: disk.time_in_progress,
                weighted_io_time_ms: disk.weighted_time_in_progress,
                in_progress: disk.in_progress,
                name: disk.name,
            })
            .collect())
    }
}

impl PagingSource for ProcfsSource {
    fn page_files(&self) -> Result<Vec<PageFileStats>, SourceError> {
        let content = std::fs::read_to_string("/proc/swaps")?;
        parse_swaps(&content)
    }

    fn vm_counters(&self) -> Result<VmCounters, SourceError> {
        vm_counters(&procfs::vmstat()?)
    }
}

impl ProcessSource for ProcfsSource {
    fn processes(&self) -> Result<Vec<Box<dyn ProcessHandle>>, SourceError> {
        let mut handles: Vec<Box<dyn ProcessHandle>> = Vec::new();

        for process in procfs::process::all_processes()? {
            // Processes may exit between listing and opening
            match process {
                Ok(process) => handles.push(Box::new(ProcfsProcess {
                    process,
                    source: *self,
                })),
                Err(e) => trace!("Skipping vanished process: {}", e),
            }
        }

        Ok(handles)
    }
}

/// A process read through `/proc/<pid>`.
struct ProcfsProcess {
    process: Process,
    source: ProcfsSource,
}

impl ProcessHandle for ProcfsProcess {
    fn pid(&self) -> i32 {
        self.process.pid()
    }

    fn name(&self) -> Result<String, SourceError> {
        Ok(self.process.stat()?.comm)
    }

    fn exe(&self) -> Result<String, SourceError> {
        Ok(self.process.exe()?.to_string_lossy().into_owned())
    }

    fn cmdline(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.process.cmdline()?)
    }

    fn cpu_times(&self) -> Result<ProcessCpuTimes, SourceError> {
        let stat = self.process.stat()?;
        Ok(ProcessCpuTimes {
            user: self.source.ticks_to_secs(stat.utime),
            system: self.source.ticks_to_secs(stat.stime),
            iowait: self
                .source
                .ticks_to_secs(stat.delayacct_blkio_ticks.unwrap_or(0)),
        })
    }

    fn memory(&self) -> Result<ProcessMemory, SourceError> {
        let stat = self.process.stat()?;
        Ok(ProcessMemory {
            rss_bytes: stat.rss * self.source.page_size,
            virtual_bytes: stat.vsize,
        })
    }
}

/// Parse the contents of `/proc/swaps`.
///
/// ```text
/// Filename        Type        Size     Used    Priority
/// /dev/sda2       partition   8388604  1024    -2
/// ```
pub fn parse_swaps(content: &str) -> Result<Vec<PageFileStats>, SourceError> {
    let mut lines = content.lines();

    match lines.next() {
        Some(header) if header.starts_with("Filename") => {}
        _ => return Err(SourceError::parse("/proc/swaps", "missing header line")),
    }

    let mut stats = Vec::new();
    for line in lines.filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(SourceError::parse(
                "/proc/swaps",
                format!("expected at least 4 fields, got '{}'", line),
            ));
        }

        let size: u64 = fields[2]
            .parse()
            .map_err(|e| SourceError::parse("/proc/swaps", format!("size '{}': {}", fields[2], e)))?;
        let used: u64 = fields[3]
            .parse()
            .map_err(|e| SourceError::parse("/proc/swaps", format!("used '{}': {}", fields[3], e)))?;

        stats.push(PageFileStats {
            // Paths containing spaces are escaped as \040 by the kernel
            device: fields[0].replace("\\040", " "),
            used_bytes: used * SWAPS_UNIT,
            free_bytes: size.saturating_sub(used) * SWAPS_UNIT,
        });
    }

    Ok(stats)
}

/// Paging counters from the `/proc/vmstat` key/value map.
pub fn vm_counters(vmstat: &HashMap<String, i64>) -> Result<VmCounters, SourceError> {
    let value = |key: &str| {
        vmstat
            .get(key)
            .map(|v| u64::try_from(*v).unwrap_or_default())
    };

    // pgfault counts every fault, major ones included
    let faults = value("pgfault").ok_or_else(|| SourceError::parse("/proc/vmstat", "missing pgfault"))?;
    let major_faults = value("pgmajfault").unwrap_or_default();

    Ok(VmCounters {
        swap_in: value("pswpin").unwrap_or_default(),
        swap_out: value("pswpout").unwrap_or_default(),
        page_in: value("pgpgin").unwrap_or_default(),
        page_out: value("pgpgout").unwrap_or_default(),
        major_faults,
        minor_faults: faults.saturating_sub(major_faults),
    })
}
