//! Per-process scraper.
//!
//! Each process becomes its own resource in the batch, identified by pid,
//! executable and command line. Processes are read one by one; a process
//! that vanishes or denies access mid-scrape is recorded as a partial
//! failure and the rest are still reported.

use hostmetrics_common::{Metric, MetricsBatch, Resource, ResourceMetrics, Timestamp};
use tracing::{debug, trace};

use crate::config::ProcessConfig;
use crate::error::{ScrapeError, ScrapeErrors, ScraperError, SourceError};
use crate::filter::DeviceFilter;
use crate::metadata::{
    MetricDescriptor, PROCESS_CPU_TIME, PROCESS_MEMORY_PHYSICAL_USAGE,
    PROCESS_MEMORY_VIRTUAL_USAGE, attributes, resource, values,
};
use crate::scraper::{ScrapeContext, Scraper, start_time};
use crate::source::{PlatformSource, ProcessCpuTimes, ProcessHandle, ProcessMemory, ProcessSource};

/// Metrics emitted per process.
const PROCESS_METRICS: usize = 3;

/// Executable identity of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableMetadata {
    pub name: String,
    pub path: String,
}

/// Command a process was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    /// First token of the command line.
    pub command: String,
    /// Full argument vector, command included.
    pub args: Vec<String>,
}

impl CommandMetadata {
    /// `None` for processes without a command line (kernel threads, zombies).
    pub fn from_args(args: Vec<String>) -> Option<Self> {
        let command = args.first()?.clone();
        Some(Self { command, args })
    }
}

/// Identity of one process, exported as resource attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMetadata {
    pub pid: i32,
    pub executable: ExecutableMetadata,
    pub command: Option<CommandMetadata>,
}

impl ProcessMetadata {
    pub fn resource(&self) -> Resource {
        let mut process = Resource::default()
            .with_attribute(resource::PROCESS_PID, i64::from(self.pid))
            .with_attribute(
                resource::PROCESS_EXECUTABLE_NAME,
                self.executable.name.as_str(),
            )
            .with_attribute(
                resource::PROCESS_EXECUTABLE_PATH,
                self.executable.path.as_str(),
            );

        if let Some(command) = &self.command {
            process = process
                .with_attribute(resource::PROCESS_COMMAND, command.command.as_str())
                .with_attribute(resource::PROCESS_COMMAND_LINE, command.args.join(" "))
                .with_attribute(resource::PROCESS_COMMAND_ARGS, command.args.clone());
        }

        process
    }
}

/// Read the executable name and path of a process.
pub fn executable_metadata(handle: &dyn ProcessHandle) -> Result<ExecutableMetadata, SourceError> {
    Ok(ExecutableMetadata {
        name: handle.name()?,
        path: handle.exe()?,
    })
}

/// Emits `process.cpu.time` and the memory gauges for every process.
pub struct ProcessScraper {
    filter: DeviceFilter,
    mute_process_name_error: bool,
    source: Box<dyn ProcessSource>,
    start_time: Option<Timestamp>,
}

impl ProcessScraper {
    pub fn new(config: &ProcessConfig) -> Result<Self, ScraperError> {
        Self::with_source(config, Box::new(PlatformSource::default()))
    }

    pub fn with_source(
        config: &ProcessConfig,
        source: Box<dyn ProcessSource>,
    ) -> Result<Self, ScraperError> {
        Ok(Self {
            filter: DeviceFilter::new(config.include.as_ref(), config.exclude.as_ref())?,
            mute_process_name_error: config.mute_process_name_error,
            source,
            start_time: None,
        })
    }

    fn scrape_process(
        &self,
        handle: &dyn ProcessHandle,
        start: Timestamp,
        errors: &mut ScrapeErrors,
    ) -> Option<ResourceMetrics> {
        let pid = handle.pid();

        let executable = match executable_metadata(handle) {
            Ok(executable) => executable,
            Err(e) => {
                if !self.mute_process_name_error {
                    errors.add_partial(
                        PROCESS_METRICS,
                        format!("error reading process name for pid {}: {}", pid, e),
                    );
                }
                return None;
            }
        };

        if !self.filter.matches(&executable.name) {
            return None;
        }

        let command = match handle.cmdline() {
            Ok(args) => CommandMetadata::from_args(args),
            Err(e) => {
                errors.add_partial(
                    0,
                    format!(
                        "error reading command for process {:?} (pid {}): {}",
                        executable.name, pid, e
                    ),
                );
                None
            }
        };

        let metadata = ProcessMetadata {
            pid,
            executable,
            command,
        };
        let mut resource_metrics = ResourceMetrics::new(metadata.resource());
        let now = Timestamp::now();

        match handle.cpu_times() {
            Ok(times) => resource_metrics
                .metrics
                .push(cpu_time_metric(start, now, &times)),
            Err(e) => errors.add_partial(
                1,
                format!(
                    "error reading cpu times for process {:?} (pid {}): {}",
                    metadata.executable.name, pid, e
                ),
            ),
        }

        match handle.memory() {
            Ok(memory) => resource_metrics
                .metrics
                .extend(memory_metrics(start, now, &memory)),
            Err(e) => errors.add_partial(
                2,
                format!(
                    "error reading memory info for process {:?} (pid {}): {}",
                    metadata.executable.name, pid, e
                ),
            ),
        }

        (!resource_metrics.metrics.is_empty()).then_some(resource_metrics)
    }
}

impl Scraper for ProcessScraper {
    fn name(&self) -> &'static str {
        "process"
    }

    fn start(&mut self, _ctx: &ScrapeContext) -> Result<(), ScraperError> {
        self.start_time = Some(start_time(self.source.as_ref())?);
        Ok(())
    }

    fn scrape(&mut self, ctx: &ScrapeContext, batch: &mut MetricsBatch) -> Result<(), ScrapeError> {
        let start = self.start_time.ok_or(ScrapeError::NotStarted)?;

        let handles = self.source.processes().map_err(ScrapeError::fatal)?;
        trace!(processes = handles.len(), "Listed processes");

        let mut errors = ScrapeErrors::new();
        for (i, handle) in handles.iter().enumerate() {
            if ctx.is_cancelled() {
                debug!(
                    scraped = i,
                    total = handles.len(),
                    "Process scrape cancelled"
                );
                break;
            }

            if let Some(resource_metrics) = self.scrape_process(handle.as_ref(), start, &mut errors)
            {
                batch.push_resource(resource_metrics);
            }
        }

        errors.combine()
    }
}

fn cpu_time_metric(start: Timestamp, now: Timestamp, times: &ProcessCpuTimes) -> Metric {
    let mut metric = PROCESS_CPU_TIME.new_metric();
    for (state, seconds) in [
        (values::STATE_USER, times.user),
        (values::STATE_SYSTEM, times.system),
        (values::STATE_WAIT, times.iowait),
    ] {
        metric.data_points.push(PROCESS_CPU_TIME.data_point(
            start,
            now,
            seconds,
            &[(attributes::STATE, state)],
        ));
    }
    metric
}

fn memory_metrics(start: Timestamp, now: Timestamp, memory: &ProcessMemory) -> [Metric; 2] {
    let gauge = |descriptor: &MetricDescriptor, bytes: u64| {
        let mut metric = descriptor.new_metric();
        let value = i64::try_from(bytes).unwrap_or(i64::MAX);
        metric
            .data_points
            .push(descriptor.data_point(start, now, value, &[]));
        metric
    };

    [
        gauge(&PROCESS_MEMORY_PHYSICAL_USAGE, memory.rss_bytes),
        gauge(&PROCESS_MEMORY_VIRTUAL_USAGE, memory.virtual_bytes),
    ]
}
