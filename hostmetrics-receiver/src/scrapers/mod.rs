//! Per-domain scrapers.

pub mod cpu;
pub mod disk;
pub mod load;
pub mod paging;
pub mod process;

pub use cpu::CpuScraper;
pub use disk::{DiskBackend, DiskScraper};
pub use load::LoadScraper;
pub use paging::PagingScraper;
pub use process::{ProcessMetadata, ProcessScraper};
