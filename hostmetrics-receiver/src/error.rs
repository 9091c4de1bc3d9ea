//! Error types for scrapers and their counter sources.

use thiserror::Error;

/// Failure reading raw counters from the operating system.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("procfs error: {0}")]
    Proc(String),

    #[error("failed to parse {what}: {message}")]
    Parse { what: &'static str, message: String },

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

impl SourceError {
    pub fn parse(what: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            what,
            message: message.into(),
        }
    }
}

#[cfg(target_os = "linux")]
impl From<procfs::ProcError> for SourceError {
    fn from(err: procfs::ProcError) -> Self {
        Self::Proc(err.to_string())
    }
}

/// Failure of the performance-counter backend.
#[derive(Debug, Error)]
pub enum PerfCounterError {
    #[error("unknown performance counter category '{0}'")]
    UnknownCategory(String),

    #[error("performance counter query was not initialized")]
    NotInitialized,

    #[error("category '{0}' was not returned by the query")]
    ObjectNotFound(String),

    #[error("counter '{counter}' does not exist in category '{category}'")]
    UnknownCounter { category: String, counter: String },

    #[error("performance counter query failed: {0}")]
    Query(#[from] SourceError),
}

/// Errors that make a scraper unusable (construction or start).
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("error creating {kind} filters: {source}")]
    Filter {
        kind: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read boot time: {0}")]
    BootTime(#[source] SourceError),

    #[error("failed to initialize performance counters: {0}")]
    PerfCounterInit(#[from] PerfCounterError),
}

/// Outcome of a failed `scrape` call.
///
/// A fatal error means nothing was appended to the batch; a partial error
/// means some metrics were appended and `failed` more are known missing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("scraper has not been started")]
    NotStarted,

    #[error("{0}")]
    Fatal(String),

    #[error("{message} ({failed} metrics failed)")]
    Partial { failed: usize, message: String },
}

impl ScrapeError {
    pub fn fatal(err: impl std::fmt::Display) -> Self {
        Self::Fatal(err.to_string())
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial { .. })
    }

    /// Number of metrics known missing, for partial failures.
    pub fn failed_count(&self) -> Option<usize> {
        match self {
            Self::Partial { failed, .. } => Some(*failed),
            _ => None,
        }
    }
}

/// Accumulates partial failures over a single scrape.
#[derive(Debug, Default)]
pub struct ScrapeErrors {
    failed: usize,
    messages: Vec<String>,
}

impl ScrapeErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `failed` metrics could not be produced because of `err`.
    pub fn add_partial(&mut self, failed: usize, err: impl std::fmt::Display) {
        self.failed += failed;
        self.messages.push(err.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Combine the recorded failures into one result.
    pub fn combine(self) -> Result<(), ScrapeError> {
        if self.messages.is_empty() {
            return Ok(());
        }

        Err(ScrapeError::Partial {
            failed: self.failed,
            message: self.messages.join("; "),
        })
    }
}
