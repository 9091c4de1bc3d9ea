//! End-to-end scraper behaviour against deterministic counter sources.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hostmetrics_common::{AttributeValue, MetricsBatch, NumberValue, Timestamp};
use hostmetrics_receiver::config::{CpuConfig, LoadConfig, ProcessConfig};
use hostmetrics_receiver::error::{PerfCounterError, ScrapeError, ScraperError, SourceError};
use hostmetrics_receiver::filter::{DeviceFilter, FilterConfig, MatchType};
use hostmetrics_receiver::metadata::{attributes, resource};
use hostmetrics_receiver::perfcounters::{
    InstanceData, PerfCounterScraper, PerfDataCollection, PerfDataObject, SourcePerfCounters,
    TOTAL_INSTANCE, logical_disk,
};
use hostmetrics_receiver::scrapers::{
    CpuScraper, DiskBackend, DiskScraper, LoadScraper, PagingScraper, ProcessScraper,
};
use hostmetrics_receiver::source::{
    BootTimeSource, CpuSource, CpuTimes, DiskIoCounters, DiskSource, LoadAverage, LoadSource,
    PageFileStats, PagingSource, ProcessCpuTimes, ProcessHandle, ProcessMemory, ProcessSource,
    VmCounters,
};
use hostmetrics_receiver::{ScrapeContext, ScrapeRunner, Scraper};

const BOOT_SECS: u64 = 1_700_000_000;

/// Counter source whose readings are set by the test.
#[derive(Clone, Default)]
struct StubSource {
    boot_time: Option<u64>,
    cpu: Option<Vec<CpuTimes>>,
    disks: Option<Vec<DiskIoCounters>>,
    page_files: Option<Vec<PageFileStats>>,
    vm: Option<VmCounters>,
}

impl StubSource {
    fn booted() -> Self {
        Self {
            boot_time: Some(BOOT_SECS),
            ..Default::default()
        }
    }
}

fn unavailable(what: &'static str) -> SourceError {
    SourceError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{} unavailable", what),
    ))
}

impl BootTimeSource for StubSource {
    fn boot_time(&self) -> Result<u64, SourceError> {
        self.boot_time.ok_or_else(|| unavailable("boot time"))
    }
}

impl CpuSource for StubSource {
    fn cpu_times(&self, _per_cpu: bool) -> Result<Vec<CpuTimes>, SourceError> {
        self.cpu.clone().ok_or_else(|| unavailable("/proc/stat"))
    }
}

impl DiskSource for StubSource {
    fn io_counters(&self) -> Result<Vec<DiskIoCounters>, SourceError> {
        self.disks.clone().ok_or_else(|| unavailable("/proc/diskstats"))
    }
}

impl PagingSource for StubSource {
    fn page_files(&self) -> Result<Vec<PageFileStats>, SourceError> {
        self.page_files.clone().ok_or_else(|| unavailable("/proc/swaps"))
    }

    fn vm_counters(&self) -> Result<VmCounters, SourceError> {
        self.vm.clone().ok_or_else(|| unavailable("/proc/vmstat"))
    }
}

fn started<S: Scraper>(mut scraper: S) -> S {
    scraper.start(&ScrapeContext::new()).unwrap();
    scraper
}

fn scrape(scraper: &mut dyn Scraper) -> (MetricsBatch, Result<(), ScrapeError>) {
    let mut batch = MetricsBatch::new();
    let result = scraper.scrape(&ScrapeContext::new(), &mut batch);
    (batch, result)
}

fn disk(name: &str, reads: u64, writes: u64) -> DiskIoCounters {
    DiskIoCounters {
        name: name.to_string(),
        read_count: reads,
        write_count: writes,
        ..Default::default()
    }
}

// CPU

#[test]
fn test_cpu_time_sums_within_interval() {
    let interval = 10.0;
    let source = StubSource {
        cpu: Some(vec![CpuTimes {
            cpu: "cpu0".to_string(),
            user: 4.5,
            system: 3.0,
            iowait: 1.5,
        }]),
        ..StubSource::booted()
    };
    let mut scraper = started(CpuScraper::with_source(CpuConfig::default(), Box::new(source)));

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();

    let metric = batch.find("system.cpu.time").unwrap();
    let total: f64 = metric
        .data_points
        .iter()
        .filter(|p| p.attribute(attributes::CPU) == Some("cpu0"))
        .map(|p| p.value.as_f64())
        .sum();
    assert!(total <= interval);
    assert_eq!(metric.data_points.len(), 3);

    let start = Timestamp::from_unix_secs(BOOT_SECS);
    assert!(metric.data_points.iter().all(|p| p.start_timestamp == Some(start)));
}

#[test]
fn test_cpu_read_failure_is_fatal() {
    let mut scraper = started(CpuScraper::with_source(
        CpuConfig::default(),
        Box::new(StubSource::booted()),
    ));

    let (batch, result) = scrape(&mut scraper);
    assert!(matches!(result, Err(ScrapeError::Fatal(_))));
    assert!(batch.is_empty());
}

#[test]
fn test_start_failure_on_boot_time() {
    let mut scraper = CpuScraper::with_source(CpuConfig::default(), Box::new(StubSource::default()));
    assert!(matches!(
        scraper.start(&ScrapeContext::new()),
        Err(ScraperError::BootTime(_))
    ));

    let (batch, result) = scrape(&mut scraper);
    assert_eq!(result, Err(ScrapeError::NotStarted));
    assert!(batch.is_empty());
}

#[test]
fn test_start_is_idempotent() {
    let source = StubSource {
        cpu: Some(vec![CpuTimes {
            cpu: "cpu-total".to_string(),
            user: 1.0,
            ..Default::default()
        }]),
        ..StubSource::booted()
    };
    let mut scraper = CpuScraper::with_source(CpuConfig { per_cpu: false }, Box::new(source));
    let ctx = ScrapeContext::new();

    scraper.start(&ctx).unwrap();
    let (first, _) = scrape(&mut scraper);
    scraper.start(&ctx).unwrap();
    let (second, _) = scrape(&mut scraper);

    let start_of = |batch: &MetricsBatch| {
        batch.find("system.cpu.time").unwrap().data_points[0].start_timestamp
    };
    assert_eq!(start_of(&first), start_of(&second));
    assert_eq!(start_of(&first), Some(Timestamp::from_unix_secs(BOOT_SECS)));
}

// Disk (direct)

#[test]
fn test_disk_operations_points() {
    let source = StubSource {
        disks: Some(vec![disk("sda", 5, 7), disk("sdb", 2, 1)]),
        ..StubSource::booted()
    };
    let mut scraper = started(DiskScraper::with_backend(
        DeviceFilter::allow_all(),
        DiskBackend::Direct(Box::new(source)),
    ));

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();
    assert_eq!(batch.metric_count(), 7);

    let metric = batch.find("system.disk.operations").unwrap();
    let points: Vec<_> = metric
        .data_points
        .iter()
        .map(|p| {
            (
                p.attribute(attributes::DEVICE).unwrap(),
                p.attribute(attributes::DIRECTION).unwrap(),
                p.value,
            )
        })
        .collect();
    assert_eq!(
        points,
        vec![
            ("sda", "read", NumberValue::Int(5)),
            ("sda", "write", NumberValue::Int(7)),
            ("sdb", "read", NumberValue::Int(2)),
            ("sdb", "write", NumberValue::Int(1)),
        ]
    );

    let first = &metric.data_points[0];
    assert!(metric.data_points.iter().all(|p| {
        p.timestamp == first.timestamp && p.start_timestamp == first.start_timestamp
    }));
}

#[test]
fn test_disk_include_exclude() {
    let source = StubSource {
        disks: Some(vec![disk("sda", 1, 1), disk("sdb", 1, 1), disk("sdc", 1, 1)]),
        ..StubSource::booted()
    };
    let filter = DeviceFilter::new(
        Some(&FilterConfig::new(&["sda"], MatchType::Strict)),
        Some(&FilterConfig::new(&["sdb"], MatchType::Strict)),
    )
    .unwrap();
    let mut scraper = started(DiskScraper::with_backend(
        filter,
        DiskBackend::Direct(Box::new(source)),
    ));

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();

    for metric in batch.metrics() {
        assert!(
            metric
                .data_points
                .iter()
                .all(|p| p.attribute(attributes::DEVICE) == Some("sda")),
            "{} has devices other than sda",
            metric.name
        );
    }
}

#[test]
fn test_disk_read_failure_is_fatal() {
    let mut scraper = started(DiskScraper::with_backend(
        DeviceFilter::allow_all(),
        DiskBackend::Direct(Box::new(StubSource::booted())),
    ));

    let (batch, result) = scrape(&mut scraper);
    assert!(matches!(result, Err(ScrapeError::Fatal(_))));
    assert!(batch.is_empty());
}

// Disk (performance counters)

/// Counter query returning fixed `LogicalDisk` instances.
struct StubCounters {
    instances: Vec<InstanceData>,
    counter_names: Vec<String>,
    initialized: Arc<Mutex<Vec<String>>>,
    fail_scrape: bool,
}

impl StubCounters {
    fn new(instances: Vec<InstanceData>) -> Self {
        Self {
            instances,
            counter_names: logical_disk::COUNTERS.iter().map(|c| c.to_string()).collect(),
            initialized: Arc::default(),
            fail_scrape: false,
        }
    }
}

impl PerfCounterScraper for StubCounters {
    fn initialize(&mut self, category: &str) -> Result<(), PerfCounterError> {
        if category != logical_disk::CATEGORY {
            return Err(PerfCounterError::UnknownCategory(category.to_string()));
        }
        self.initialized.lock().unwrap().push(category.to_string());
        Ok(())
    }

    fn scrape(&mut self) -> Result<PerfDataCollection, PerfCounterError> {
        if self.fail_scrape {
            return Err(PerfCounterError::Query(unavailable("PDH")));
        }

        let mut collection = PerfDataCollection::new();
        collection.insert(PerfDataObject {
            name: logical_disk::CATEGORY.to_string(),
            counter_names: self.counter_names.clone(),
            instances: self.instances.clone(),
        });
        Ok(collection)
    }
}

fn logical_disk_instance(name: &str, idle_ticks: i64) -> InstanceData {
    InstanceData {
        name: name.to_string(),
        counters: HashMap::from([
            (logical_disk::READS_PER_SEC.to_string(), 11),
            (logical_disk::WRITES_PER_SEC.to_string(), 22),
            (logical_disk::READ_BYTES_PER_SEC.to_string(), 4096),
            (logical_disk::WRITE_BYTES_PER_SEC.to_string(), 8192),
            (logical_disk::IDLE_TIME.to_string(), idle_ticks),
            (logical_disk::AVG_SEC_PER_READ.to_string(), 5_000_000),
            (logical_disk::AVG_SEC_PER_WRITE.to_string(), 20_000),
            (logical_disk::QUEUE_LENGTH.to_string(), 3),
        ]),
    }
}

fn perf_scraper(counters: StubCounters, filter: DeviceFilter, boot_secs: u64) -> DiskScraper {
    let clock = StubSource {
        boot_time: Some(boot_secs),
        ..Default::default()
    };
    DiskScraper::with_backend(
        filter,
        DiskBackend::PerfCounters {
            clock: Box::new(clock),
            counters: Box::new(counters),
        },
    )
}

#[test]
fn test_perf_counter_disk_metrics() {
    let counters = StubCounters::new(vec![
        logical_disk_instance("C:", 0),
        logical_disk_instance(TOTAL_INSTANCE, 0),
    ]);
    let initialized = counters.initialized.clone();
    let mut scraper = started(perf_scraper(counters, DeviceFilter::allow_all(), BOOT_SECS));
    assert_eq!(*initialized.lock().unwrap(), vec![logical_disk::CATEGORY]);

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();
    assert_eq!(batch.metric_count(), 5);
    assert!(batch.find("system.disk.merged").is_none());

    // Only real devices are reported, never the _Total aggregate
    let io = batch.find("system.disk.io").unwrap();
    assert_eq!(io.data_points.len(), 2);
    assert!(io.data_points.iter().all(|p| p.attribute(attributes::DEVICE) == Some("C:")));

    let op_time = batch.find("system.disk.operation_time").unwrap();
    assert_eq!(op_time.data_points[0].value, NumberValue::Double(0.5));
    assert_eq!(op_time.data_points[1].value, NumberValue::Double(0.002));

    let pending = batch.find("system.disk.pending_operations").unwrap();
    assert_eq!(pending.data_points[0].value, NumberValue::Int(3));
}

#[test]
fn test_source_perf_counters_report_devices_once() {
    let source = StubSource {
        disks: Some(vec![disk("sda", 5, 7), disk("sdb", 2, 1)]),
        ..StubSource::booted()
    };
    let mut scraper = started(DiskScraper::with_backend(
        DeviceFilter::allow_all(),
        DiskBackend::PerfCounters {
            clock: Box::new(source.clone()),
            counters: Box::new(SourcePerfCounters::new(source)),
        },
    ));

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();

    let ops = batch.find("system.disk.operations").unwrap();
    let points: Vec<_> = ops
        .data_points
        .iter()
        .map(|p| {
            (
                p.attribute(attributes::DEVICE).unwrap(),
                p.attribute(attributes::DIRECTION).unwrap(),
                p.value,
            )
        })
        .collect();
    assert_eq!(
        points,
        vec![
            ("sda", "read", NumberValue::Int(5)),
            ("sda", "write", NumberValue::Int(7)),
            ("sdb", "read", NumberValue::Int(2)),
            ("sdb", "write", NumberValue::Int(1)),
        ]
    );
}

#[test]
fn test_perf_counter_total_excluded_with_include_list() {
    let counters = StubCounters::new(vec![
        logical_disk_instance("C:", 0),
        logical_disk_instance(TOTAL_INSTANCE, 0),
    ]);
    let filter = DeviceFilter::new(Some(&FilterConfig::new(&["C:"], MatchType::Strict)), None).unwrap();
    let mut scraper = started(perf_scraper(counters, filter, BOOT_SECS));

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();

    let ops = batch.find("system.disk.operations").unwrap();
    assert_eq!(ops.data_points.len(), 2);
    assert!(ops.data_points.iter().all(|p| p.attribute(attributes::DEVICE) == Some("C:")));
}

#[test]
fn test_perf_counter_active_time() {
    // Booted 10 s ago with 4 s of idle time
    let boot = Timestamp::now().as_nanos() / 1_000_000_000 - 10;
    let counters = StubCounters::new(vec![logical_disk_instance("C:", 40_000_000)]);
    let mut scraper = started(perf_scraper(counters, DeviceFilter::allow_all(), boot));

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();

    let io_time = batch.find("system.disk.io_time").unwrap();
    let active = io_time.data_points[0].value.as_f64();
    // Whole-second boot time leaves up to 1 s of slack
    assert!((6.0..7.0).contains(&active), "active time {}", active);
}

#[test]
fn test_perf_counter_filter() {
    let counters = StubCounters::new(vec![
        logical_disk_instance("C:", 0),
        logical_disk_instance("D:", 0),
        logical_disk_instance("E:", 0),
    ]);
    let filter = DeviceFilter::new(
        Some(&FilterConfig::new(&["C:", "D:"], MatchType::Strict)),
        Some(&FilterConfig::new(&["D:"], MatchType::Strict)),
    )
    .unwrap();
    let mut scraper = started(perf_scraper(counters, filter, BOOT_SECS));

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();

    let ops = batch.find("system.disk.operations").unwrap();
    assert!(ops.data_points.iter().all(|p| p.attribute(attributes::DEVICE) == Some("C:")));
}

#[test]
fn test_perf_counter_unknown_counter_is_fatal() {
    let mut counters = StubCounters::new(vec![logical_disk_instance("C:", 0)]);
    counters.counter_names.retain(|c| c != logical_disk::QUEUE_LENGTH);
    let mut scraper = started(perf_scraper(counters, DeviceFilter::allow_all(), BOOT_SECS));

    let (batch, result) = scrape(&mut scraper);
    assert!(matches!(result, Err(ScrapeError::Fatal(ref m)) if m.contains("Current Disk Queue Length")));
    assert!(batch.is_empty());
}

#[test]
fn test_perf_counter_scrape_failure_is_fatal() {
    let mut counters = StubCounters::new(vec![logical_disk_instance("C:", 0)]);
    counters.fail_scrape = true;
    let mut scraper = started(perf_scraper(counters, DeviceFilter::allow_all(), BOOT_SECS));

    let (batch, result) = scrape(&mut scraper);
    assert!(matches!(result, Err(ScrapeError::Fatal(_))));
    assert!(batch.is_empty());
}

#[test]
fn test_perf_counter_initialize_failure() {
    struct Unavailable;

    impl PerfCounterScraper for Unavailable {
        fn initialize(&mut self, category: &str) -> Result<(), PerfCounterError> {
            Err(PerfCounterError::UnknownCategory(category.to_string()))
        }

        fn scrape(&mut self) -> Result<PerfDataCollection, PerfCounterError> {
            Err(PerfCounterError::NotInitialized)
        }
    }

    let mut scraper = DiskScraper::with_backend(
        DeviceFilter::allow_all(),
        DiskBackend::PerfCounters {
            clock: Box::new(StubSource::booted()),
            counters: Box::new(Unavailable),
        },
    );
    assert!(matches!(
        scraper.start(&ScrapeContext::new()),
        Err(ScraperError::PerfCounterInit(_))
    ));
}

// Paging

#[test]
fn test_paging_usage_failure_is_partial() {
    let source = StubSource {
        vm: Some(VmCounters {
            swap_in: 1,
            swap_out: 2,
            page_in: 3,
            page_out: 4,
            major_faults: 5,
            minor_faults: 6,
        }),
        ..StubSource::booted()
    };
    let mut scraper = started(PagingScraper::with_source(Box::new(source), None));

    let (batch, result) = scrape(&mut scraper);
    let err = result.unwrap_err();
    assert!(err.is_partial());
    assert_eq!(err.failed_count(), Some(1));

    assert!(batch.find("system.paging.usage").is_none());
    assert_eq!(
        batch.find("system.paging.operations").unwrap().data_points.len(),
        4
    );
    assert!(batch.find("system.paging.faults").is_some());
}

#[test]
fn test_paging_both_groups_fail() {
    let mut scraper = started(PagingScraper::with_source(
        Box::new(StubSource::booted()),
        None,
    ));

    let (batch, result) = scrape(&mut scraper);
    let err = result.unwrap_err();
    assert!(err.is_partial());
    assert_eq!(err.failed_count(), Some(3));
    assert!(batch.is_empty());
}

#[test]
fn test_paging_all_groups() {
    let source = StubSource {
        page_files: Some(vec![PageFileStats {
            device: "/dev/sda2".to_string(),
            used_bytes: 100,
            free_bytes: 900,
        }]),
        vm: Some(VmCounters::default()),
        ..StubSource::booted()
    };
    let mut scraper = started(PagingScraper::with_source(Box::new(source), None));

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();
    assert_eq!(batch.metric_count(), 3);
}

// Process

#[derive(Clone)]
struct StubProcess {
    pid: i32,
    name: Option<&'static str>,
    cpu: Option<ProcessCpuTimes>,
    memory: Option<ProcessMemory>,
}

impl ProcessHandle for StubProcess {
    fn pid(&self) -> i32 {
        self.pid
    }

    fn name(&self) -> Result<String, SourceError> {
        self.name
            .map(str::to_string)
            .ok_or_else(|| unavailable("comm"))
    }

    fn exe(&self) -> Result<String, SourceError> {
        Ok(format!("/usr/bin/{}", self.name.unwrap_or_default()))
    }

    fn cmdline(&self) -> Result<Vec<String>, SourceError> {
        Ok(vec![
            self.name.unwrap_or_default().to_string(),
            "--verbose".to_string(),
        ])
    }

    fn cpu_times(&self) -> Result<ProcessCpuTimes, SourceError> {
        self.cpu.ok_or_else(|| unavailable("stat"))
    }

    fn memory(&self) -> Result<ProcessMemory, SourceError> {
        self.memory.ok_or_else(|| unavailable("statm"))
    }
}

struct StubProcesses(Vec<StubProcess>);

impl BootTimeSource for StubProcesses {
    fn boot_time(&self) -> Result<u64, SourceError> {
        Ok(BOOT_SECS)
    }
}

impl ProcessSource for StubProcesses {
    fn processes(&self) -> Result<Vec<Box<dyn ProcessHandle>>, SourceError> {
        Ok(self
            .0
            .iter()
            .cloned()
            .map(|p| Box::new(p) as Box<dyn ProcessHandle>)
            .collect())
    }
}

fn process(pid: i32, name: &'static str) -> StubProcess {
    StubProcess {
        pid,
        name: Some(name),
        cpu: Some(ProcessCpuTimes {
            user: 1.0,
            system: 0.5,
            iowait: 0.0,
        }),
        memory: Some(ProcessMemory {
            rss_bytes: 4096,
            virtual_bytes: 8192,
        }),
    }
}

#[test]
fn test_process_resources() {
    let source = StubProcesses(vec![process(1, "init"), process(42, "nginx")]);
    let mut scraper =
        started(ProcessScraper::with_source(&ProcessConfig::default(), Box::new(source)).unwrap());

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();
    assert_eq!(batch.resource_metrics.len(), 2);

    let nginx = &batch.resource_metrics[1];
    assert_eq!(
        nginx.resource.attribute(resource::PROCESS_PID),
        Some(&AttributeValue::Int(42))
    );
    assert_eq!(
        nginx.resource.attribute(resource::PROCESS_EXECUTABLE_PATH),
        Some(&AttributeValue::Str("/usr/bin/nginx".to_string()))
    );
    assert_eq!(
        nginx.resource.attribute(resource::PROCESS_COMMAND),
        Some(&AttributeValue::Str("nginx".to_string()))
    );
    assert_eq!(nginx.metrics.len(), 3);

    // Process identity lives on the resource, not on data points
    for metric in &nginx.metrics {
        for point in &metric.data_points {
            assert!(point.attribute(resource::PROCESS_PID).is_none());
        }
    }
}

#[test]
fn test_process_partial_failures() {
    let mut no_cpu = process(2, "sshd");
    no_cpu.cpu = None;
    let mut no_name = process(3, "ghost");
    no_name.name = None;

    let source = StubProcesses(vec![process(1, "init"), no_cpu, no_name]);
    let mut scraper =
        started(ProcessScraper::with_source(&ProcessConfig::default(), Box::new(source)).unwrap());

    let (batch, result) = scrape(&mut scraper);
    let err = result.unwrap_err();
    // 1 for the missing cpu time, 3 for the unreadable process
    assert_eq!(err.failed_count(), Some(4));
    assert_eq!(batch.resource_metrics.len(), 2);
    assert_eq!(batch.resource_metrics[1].metrics.len(), 2);
}

#[test]
fn test_process_name_error_muted() {
    let mut no_name = process(3, "ghost");
    no_name.name = None;

    let config = ProcessConfig {
        mute_process_name_error: true,
        ..Default::default()
    };
    let source = StubProcesses(vec![process(1, "init"), no_name]);
    let mut scraper = started(ProcessScraper::with_source(&config, Box::new(source)).unwrap());

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();
    assert_eq!(batch.resource_metrics.len(), 1);
}

#[test]
fn test_process_filter_on_executable_name() {
    let config = ProcessConfig {
        include: Some(FilterConfig::new(&["ng*"], MatchType::Glob)),
        ..Default::default()
    };
    let source = StubProcesses(vec![process(1, "init"), process(42, "nginx")]);
    let mut scraper = started(ProcessScraper::with_source(&config, Box::new(source)).unwrap());

    let (batch, result) = scrape(&mut scraper);
    result.unwrap();
    assert_eq!(batch.resource_metrics.len(), 1);
}

#[test]
fn test_process_scrape_stops_when_cancelled() {
    let source = StubProcesses(vec![process(1, "init"), process(42, "nginx")]);
    let mut scraper =
        started(ProcessScraper::with_source(&ProcessConfig::default(), Box::new(source)).unwrap());

    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();
    let ctx = ScrapeContext::with_cancellation(token);

    let mut batch = MetricsBatch::new();
    scraper.scrape(&ctx, &mut batch).unwrap();
    assert!(batch.is_empty());
}

// Runner

struct FixedLoad;

impl LoadSource for FixedLoad {
    fn load_average(&self) -> Result<LoadAverage, SourceError> {
        Ok(LoadAverage {
            one: 0.5,
            five: 0.25,
            fifteen: 0.125,
        })
    }

    fn cpu_count(&self) -> usize {
        2
    }
}

#[test]
fn test_runner_collects_errors_per_scraper() {
    let mut runner = ScrapeRunner::new(ScrapeContext::new());
    runner.add(Box::new(LoadScraper::with_source(
        LoadConfig::default(),
        Box::new(FixedLoad),
    )));
    runner.add(Box::new(CpuScraper::with_source(
        CpuConfig::default(),
        Box::new(StubSource::booted()),
    )));
    runner.add(Box::new(PagingScraper::with_source(
        Box::new(StubSource::default()),
        None,
    )));

    let failures = runner.start_all();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "paging");
    assert_eq!(runner.len(), 2);

    let (batch, errors) = runner.scrape_all();
    assert_eq!(batch.metric_count(), 3);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "cpu");
    assert!(matches!(errors[0].1, ScrapeError::Fatal(_)));
}
