//! Static catalog of the metrics the scrapers emit.
//!
//! Each [`MetricDescriptor`] fixes a metric's name, unit, shape, value type
//! and the attribute keys its data points may carry.

use hostmetrics_common::{DataPoint, Metric, MetricShape, NumberValue, Timestamp};

use self::attributes::{CPU, DEVICE, DIRECTION, STATE, TYPE};

/// Data point attribute keys.
pub mod attributes {
    pub const CPU: &str = "cpu";
    pub const STATE: &str = "state";
    pub const DEVICE: &str = "device";
    pub const DIRECTION: &str = "direction";
    pub const TYPE: &str = "type";
}

/// Attribute values.
pub mod values {
    pub const STATE_USER: &str = "user";
    pub const STATE_SYSTEM: &str = "system";
    pub const STATE_WAIT: &str = "wait";
    pub const STATE_USED: &str = "used";
    pub const STATE_FREE: &str = "free";

    pub const DIRECTION_READ: &str = "read";
    pub const DIRECTION_WRITE: &str = "write";
    pub const DIRECTION_PAGE_IN: &str = "page_in";
    pub const DIRECTION_PAGE_OUT: &str = "page_out";

    pub const TYPE_MAJOR: &str = "major";
    pub const TYPE_MINOR: &str = "minor";
}

/// Resource attribute keys for per-process metrics.
pub mod resource {
    pub const PROCESS_PID: &str = "process.pid";
    pub const PROCESS_EXECUTABLE_NAME: &str = "process.executable.name";
    pub const PROCESS_EXECUTABLE_PATH: &str = "process.executable.path";
    pub const PROCESS_COMMAND: &str = "process.command";
    pub const PROCESS_COMMAND_LINE: &str = "process.command_line";
    pub const PROCESS_COMMAND_ARGS: &str = "process.command_args";
}

/// Numeric type of a metric's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Double,
}

/// Immutable catalog entry.
#[derive(Debug)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    pub shape: MetricShape,
    pub value_type: ValueType,
    pub attributes: &'static [&'static str],
}

impl MetricDescriptor {
    /// An empty metric carrying this descriptor's schema.
    pub fn new_metric(&self) -> Metric {
        Metric::new(self.name, self.description, self.unit, self.shape)
    }

    /// Build a data point for this metric.
    ///
    /// Sums get `start` as their start timestamp; gauges ignore it. Values
    /// are coerced to the descriptor's value type. Attribute keys must be
    /// declared by the descriptor (checked in debug builds).
    pub fn data_point(
        &self,
        start: Timestamp,
        now: Timestamp,
        value: impl Into<NumberValue>,
        attrs: &[(&'static str, &str)],
    ) -> DataPoint {
        let value = match (self.value_type, value.into()) {
            (ValueType::Int, NumberValue::Double(v)) => NumberValue::Int(v as i64),
            (ValueType::Double, NumberValue::Int(v)) => NumberValue::Double(v as f64),
            (_, v) => v,
        };

        let mut point = DataPoint::new(now, value);
        if self.shape.is_sum() {
            point = point.with_start(start);
        }
        for (key, value) in attrs {
            debug_assert!(
                self.attributes.contains(key),
                "attribute '{}' not declared for {}",
                key,
                self.name
            );
            point = point.with_attribute(*key, *value);
        }
        point
    }
}

const CUMULATIVE: MetricShape = MetricShape::Sum { monotonic: true };

pub static SYSTEM_CPU_TIME: MetricDescriptor = MetricDescriptor {
    name: "system.cpu.time",
    description: "Total CPU seconds broken down by different states.",
    unit: "s",
    shape: CUMULATIVE,
    value_type: ValueType::Double,
    attributes: &[CPU, STATE],
};

pub static SYSTEM_CPU_LOAD_AVERAGE_1M: MetricDescriptor = MetricDescriptor {
    name: "system.cpu.load_average.1m",
    description: "Average CPU Load over 1 minute.",
    unit: "1",
    shape: MetricShape::Gauge,
    value_type: ValueType::Double,
    attributes: &[],
};

pub static SYSTEM_CPU_LOAD_AVERAGE_5M: MetricDescriptor = MetricDescriptor {
    name: "system.cpu.load_average.5m",
    description: "Average CPU Load over 5 minutes.",
    unit: "1",
    shape: MetricShape::Gauge,
    value_type: ValueType::Double,
    attributes: &[],
};

pub static SYSTEM_CPU_LOAD_AVERAGE_15M: MetricDescriptor = MetricDescriptor {
    name: "system.cpu.load_average.15m",
    description: "Average CPU Load over 15 minutes.",
    unit: "1",
    shape: MetricShape::Gauge,
    value_type: ValueType::Double,
    attributes: &[],
};

pub static SYSTEM_DISK_IO: MetricDescriptor = MetricDescriptor {
    name: "system.disk.io",
    description: "Disk bytes transferred.",
    unit: "By",
    shape: CUMULATIVE,
    value_type: ValueType::Int,
    attributes: &[DEVICE, DIRECTION],
};

pub static SYSTEM_DISK_OPERATIONS: MetricDescriptor = MetricDescriptor {
    name: "system.disk.operations",
    description: "Disk operations count.",
    unit: "{operations}",
    shape: CUMULATIVE,
    value_type: ValueType::Int,
    attributes: &[DEVICE, DIRECTION],
};

pub static SYSTEM_DISK_IO_TIME: MetricDescriptor = MetricDescriptor {
    name: "system.disk.io_time",
    description: "Time disk spent activated. On Windows, this is calculated as the inverse of disk idle time.",
    unit: "s",
    shape: CUMULATIVE,
    value_type: ValueType::Double,
    attributes: &[DEVICE],
};

pub static SYSTEM_DISK_OPERATION_TIME: MetricDescriptor = MetricDescriptor {
    name: "system.disk.operation_time",
    description: "Time spent in disk operations.",
    unit: "s",
    shape: CUMULATIVE,
    value_type: ValueType::Double,
    attributes: &[DEVICE, DIRECTION],
};

pub static SYSTEM_DISK_WEIGHTED_IO_TIME: MetricDescriptor = MetricDescriptor {
    name: "system.disk.weighted_io_time",
    description: "Time disk spent activated multiplied by the queue length.",
    unit: "s",
    shape: CUMULATIVE,
    value_type: ValueType::Double,
    attributes: &[DEVICE],
};

pub static SYSTEM_DISK_MERGED: MetricDescriptor = MetricDescriptor {
    name: "system.disk.merged",
    description: "The number of disk reads merged into single physical disk access operations.",
    unit: "{operations}",
    shape: CUMULATIVE,
    value_type: ValueType::Int,
    attributes: &[DEVICE, DIRECTION],
};

pub static SYSTEM_DISK_PENDING_OPERATIONS: MetricDescriptor = MetricDescriptor {
    name: "system.disk.pending_operations",
    description: "The queue size of pending I/O operations.",
    unit: "{operations}",
    shape: MetricShape::Gauge,
    value_type: ValueType::Int,
    attributes: &[DEVICE],
};

pub static SYSTEM_PAGING_USAGE: MetricDescriptor = MetricDescriptor {
    name: "system.paging.usage",
    description: "Swap (unix) or pagefile (windows) usage.",
    unit: "By",
    shape: MetricShape::Gauge,
    value_type: ValueType::Int,
    attributes: &[DEVICE, STATE],
};

pub static SYSTEM_PAGING_OPERATIONS: MetricDescriptor = MetricDescriptor {
    name: "system.paging.operations",
    description: "The number of paging operations.",
    unit: "{operations}",
    shape: CUMULATIVE,
    value_type: ValueType::Int,
    attributes: &[DIRECTION, TYPE],
};

pub static SYSTEM_PAGING_FAULTS: MetricDescriptor = MetricDescriptor {
    name: "system.paging.faults",
    description: "The number of page faults.",
    unit: "{faults}",
    shape: CUMULATIVE,
    value_type: ValueType::Int,
    attributes: &[TYPE],
};

pub static PROCESS_CPU_TIME: MetricDescriptor = MetricDescriptor {
    name: "process.cpu.time",
    description: "Total CPU seconds broken down by different states.",
    unit: "s",
    shape: CUMULATIVE,
    value_type: ValueType::Double,
    attributes: &[STATE],
};

pub static PROCESS_MEMORY_PHYSICAL_USAGE: MetricDescriptor = MetricDescriptor {
    name: "process.memory.physical_usage",
    description: "The amount of physical memory in use.",
    unit: "By",
    shape: MetricShape::Gauge,
    value_type: ValueType::Int,
    attributes: &[],
};

pub static PROCESS_MEMORY_VIRTUAL_USAGE: MetricDescriptor = MetricDescriptor {
    name: "process.memory.virtual_usage",
    description: "Virtual memory size.",
    unit: "By",
    shape: MetricShape::Gauge,
    value_type: ValueType::Int,
    attributes: &[],
};
