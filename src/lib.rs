//! `ext-line-sort` is an external sort for line-oriented text files.
//!
//! External sorting is a class of sorting algorithms that can handle massive amounts of data. External sorting
//! is required when the data being sorted do not fit into the main memory (RAM) of a computer and instead must be
//! resided in slower external memory, usually a hard disk drive. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! Sorting is done in two passes:
//!
//! * **Segmentation:**
//!   the input file is split into segments limited by their total line length in bytes. Batches of segments
//!   are sorted in memory in parallel and written to temporary files.
//! * **Merging:**
//!   sorted segments are combined by a balanced binary merge tree. Each half of the segment list is merged
//!   concurrently, the two results are then joined by a streaming 2-way merge.
//!
//! Lines are compared byte-wise, duplicates and line content are preserved exactly. Temporary files are
//! removed as soon as they are merged and the destination file is only touched by the final rename.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use ext_line_sort::{LineSorter, LineSorterBuilder};
//!
//! fn main() {
//!     let sorter: LineSorter = LineSorterBuilder::new()
//!         .with_tmp_dir(Path::new("./"))
//!         .with_segment_size(50 * 1024 * 1024)
//!         .build()
//!         .unwrap();
//!
//!     sorter.sort(Path::new("input.txt"), Path::new("output.txt")).unwrap();
//! }
//! ```

pub mod buffer;
pub mod generator;
pub mod merger;
pub mod segment;
pub mod segmenter;
pub mod sort;

pub use buffer::{AppendResult, MemorySegment, SegmentBufferBuilder};
pub use generator::LineGenerator;
pub use merger::MergeTree;
pub use segment::{SegmentReader, SortedSegment};
pub use segmenter::{Segmenter, SortTask};
pub use sort::{LineSorter, LineSorterBuilder, Phase, SortError, DEFAULT_SEGMENT_SIZE};
