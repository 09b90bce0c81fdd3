//! `runsort` is an in-place external sort for files of fixed-width binary records.
//!
//! External sorting is a class of sorting algorithms that can handle massive amounts of data. External sorting
//! is required when the data being sorted do not fit into the main memory (RAM) of a computer and instead must be
//! resided in slower external memory, usually a hard disk drive. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! A file is a flat sequence of 8-byte records: a 4-byte opaque payload followed by a big-endian
//! IEEE-754 `f32` key. Sorting happens in two phases:
//!
//! * **Run generation:**
//!   replacement selection streams the input through a bounded heap and produces sorted runs that are
//!   on average twice as long as the heap.
//! * **Merge:**
//!   runs are merged in groups of a fixed fan-in, pass after pass, until a single run is left. Passes
//!   alternate between the input file and a temporary file, so no pass overwrites data it still reads.
//!
//! Memory use is bounded by the configured budget regardless of the input size: the heap slots and
//! block buffers are allocated once and reused by every phase.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use env_logger;
//! use log;
//!
//! use runsort::ExternalSorterBuilder;
//!
//! fn main() {
//!     env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();
//!
//!     let sorter = ExternalSorterBuilder::new()
//!         .with_block_size(8192)
//!         .with_fan_in(4)
//!         .with_memory_budget(128 * 1024)
//!         .with_tmp_dir(Path::new("./"))
//!         .build()
//!         .unwrap();
//!
//!     let summary = sorter.sort(Path::new("input.bin")).unwrap();
//!     println!("{} records sorted in {} merge passes", summary.records, summary.passes);
//! }
//! ```

pub mod arena;
pub mod block;
pub mod config;
pub mod dump;
pub mod generator;
pub mod heap;
pub mod merger;
pub mod record;
pub mod sort;

pub use block::BlockFile;
pub use config::SortConfig;
pub use generator::{RunCatalog, RunGenerator};
pub use heap::{HeapError, MinHeap};
pub use merger::RunMerger;
pub use record::{Record, RECORD_SIZE};
pub use sort::{ExternalSorter, ExternalSorterBuilder, Phase, SortError, SortSummary};
