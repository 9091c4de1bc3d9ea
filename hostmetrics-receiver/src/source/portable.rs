//! Cross-platform counter source using sysinfo.
//!
//! sysinfo exposes boot time, load averages, swap totals and per-process
//! memory everywhere. Counters it cannot provide report
//! [`SourceError::Unsupported`].

use sysinfo::System;

use super::{
    BootTimeSource, CpuSource, CpuTimes, DiskIoCounters, DiskSource, LoadAverage, LoadSource,
    PageFileStats, PagingSource, ProcessCpuTimes, ProcessHandle, ProcessMemory, ProcessSource,
    VmCounters,
};
use crate::error::SourceError;

/// Device name reported for the aggregate swap space.
const SWAP_DEVICE: &str = "swap";

/// Counter source backed by sysinfo.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoSource;

impl SysinfoSource {
    pub fn new() -> Self {
        Self
    }
}

impl BootTimeSource for SysinfoSource {
    fn boot_time(&self) -> Result<u64, SourceError> {
        match System::boot_time() {
            0 => Err(SourceError::Unsupported("boot time")),
            secs => Ok(secs),
        }
    }
}

impl CpuSource for SysinfoSource {
    fn cpu_times(&self, _per_cpu: bool) -> Result<Vec<CpuTimes>, SourceError> {
        Err(SourceError::Unsupported("CPU time counters"))
    }
}

impl DiskSource for SysinfoSource {
    fn io_counters(&self) -> Result<Vec<DiskIoCounters>, SourceError> {
        Err(SourceError::Unsupported("disk I/O counters"))
    }
}

impl PagingSource for SysinfoSource {
    fn page_files(&self) -> Result<Vec<PageFileStats>, SourceError> {
        let mut system = System::new();
        system.refresh_memory();

        let total = system.total_swap();
        if total == 0 {
            return Ok(Vec::new());
        }

        let used = system.used_swap();
        Ok(vec![PageFileStats {
            device: SWAP_DEVICE.to_string(),
            used_bytes: used,
            free_bytes: total.saturating_sub(used),
        }])
    }

    fn vm_counters(&self) -> Result<VmCounters, SourceError> {
        Err(SourceError::Unsupported("paging activity counters"))
    }
}

impl ProcessSource for SysinfoSource {
    fn processes(&self) -> Result<Vec<Box<dyn ProcessHandle>>, SourceError> {
        let mut system = System::new();
        system.refresh_all();

        Ok(system
            .processes()
            .values()
            .map(|proc| {
                Box::new(SysinfoProcess {
                    pid: proc.pid().as_u32() as i32,
                    name: proc.name().to_string_lossy().into_owned(),
                    exe: proc.exe().map(|p| p.to_string_lossy().into_owned()),
                    cmd: proc
                        .cmd()
                        .iter()
                        .map(|arg| arg.to_string_lossy().into_owned())
                        .collect(),
                    memory: ProcessMemory {
                        rss_bytes: proc.memory(),
                        virtual_bytes: proc.virtual_memory(),
                    },
                }) as Box<dyn ProcessHandle>
            })
            .collect())
    }
}

impl LoadSource for SysinfoSource {
    fn load_average(&self) -> Result<LoadAverage, SourceError> {
        let load = System::load_average();
        Ok(LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        })
    }

    fn cpu_count(&self) -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Snapshot of one process taken during a refresh.
struct SysinfoProcess {
    pid: i32,
    name: String,
    exe: Option<String>,
    cmd: Vec<String>,
    memory: ProcessMemory,
}

impl ProcessHandle for SysinfoProcess {
    fn pid(&self) -> i32 {
        self.pid
    }

    fn name(&self) -> Result<String, SourceError> {
        Ok(self.name.clone())
    }

    fn exe(&self) -> Result<String, SourceError> {
        self.exe
            .clone()
            .ok_or(SourceError::Unsupported("executable path"))
    }

    fn cmdline(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.cmd.clone())
    }

    fn cpu_times(&self) -> Result<ProcessCpuTimes, SourceError> {
        Err(SourceError::Unsupported("per-process CPU times"))
    }

    fn memory(&self) -> Result<ProcessMemory, SourceError> {
        Ok(self.memory)
    }
}
