//! External line sorter.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log;

use crate::buffer::SegmentBufferBuilder;
use crate::merger::MergeTree;
use crate::segment::SortedSegment;
use crate::segmenter::Segmenter;

/// Default in-memory segment size in bytes (32 MiB).
pub const DEFAULT_SEGMENT_SIZE: u64 = 32 * 1024 * 1024;

const WORK_DIR_PREFIX: &str = ".ext-line-sort";

/// Sorting phase an I/O error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reading and splitting the input.
    Segmenting,
    /// Writing sorted segments.
    Sorting,
    /// Merging sorted segments.
    Merging,
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Segmenting => write!(f, "segmenting"),
            Phase::Sorting => write!(f, "sorting"),
            Phase::Merging => write!(f, "merging"),
        }
    }
}

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Input file does not exist or can't be opened.
    InputNotFound(PathBuf, io::Error),
    /// A single line exceeds the segment size limit. `len` is the number of line bytes read
    /// before the limit was hit.
    LineTooLarge { len: u64, limit: u64 },
    /// I/O error on input or temporary files.
    IO(Phase, io::Error),
    /// Sorted result could not be moved to the destination.
    CommitFailure(PathBuf, io::Error),
    /// Temporary directory creation error.
    TempDir(io::Error),
    /// Workers thread pool initialization error.
    ThreadPoolBuildError(rayon::ThreadPoolBuildError),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            SortError::InputNotFound(_, err) => err,
            SortError::LineTooLarge { .. } => return None,
            SortError::IO(_, err) => err,
            SortError::CommitFailure(_, err) => err,
            SortError::TempDir(err) => err,
            SortError::ThreadPoolBuildError(err) => err,
        })
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::InputNotFound(path, err) => write!(f, "input file {} not found: {}", path.display(), err),
            SortError::LineTooLarge { len, limit } => {
                write!(f, "line exceeds segment size limit of {} bytes ({} bytes read)", limit, len)
            }
            SortError::IO(phase, err) => write!(f, "I/O operation failed while {}: {}", phase, err),
            SortError::CommitFailure(path, err) => {
                write!(f, "sorted output not committed to {}: {}", path.display(), err)
            }
            SortError::TempDir(err) => write!(f, "temporary directory not created: {}", err),
            SortError::ThreadPoolBuildError(err) => write!(f, "thread pool initialization failed: {}", err),
        }
    }
}

/// Line sorter builder. Provides methods for [`LineSorter`] initialization.
#[derive(Clone, Default)]
pub struct LineSorterBuilder {
    /// Number of threads to be used to sort data in parallel.
    threads_number: Option<usize>,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// In-memory segment size limit in bytes.
    segment_size: Option<u64>,
    /// Segment file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl LineSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        LineSorterBuilder::default()
    }

    /// Builds a [`LineSorter`] instance using provided configuration.
    pub fn build(self) -> Result<LineSorter, SortError> {
        LineSorter::new(
            self.threads_number,
            self.tmp_dir.as_deref(),
            self.segment_size,
            self.rw_buf_size,
        )
    }

    /// Sets number of threads to be used to sort data in parallel.
    pub fn with_threads_number(mut self, threads_number: usize) -> LineSorterBuilder {
        self.threads_number = Some(threads_number);
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> LineSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets in-memory segment size limit in bytes.
    pub fn with_segment_size(mut self, segment_size: u64) -> LineSorterBuilder {
        self.segment_size = Some(segment_size);
        return self;
    }

    /// Sets segment file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> LineSorterBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }
}

/// External line sorter.
pub struct LineSorter {
    /// Sorting thread pool.
    thread_pool: rayon::ThreadPool,
    /// Directory temporary data is stored in.
    tmp_dir: PathBuf,
    /// Segment buffer builder.
    buffer_builder: SegmentBufferBuilder,
    /// Segment file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl LineSorter {
    /// Creates a new line sorter instance.
    ///
    /// # Arguments
    /// * `threads_number` - Number of threads to be used to sort data in parallel. If the parameter is [`None`]
    ///   threads number will be selected based on available CPU core number.
    /// * `tmp_path` - Directory to be used to store temporary data. If parameter is [`None`] the current
    ///   directory will be used.
    /// * `segment_size` - In-memory segment size limit in bytes, [`DEFAULT_SEGMENT_SIZE`] if [`None`].
    /// * `rw_buf_size` - Segment files read/write buffer size.
    pub fn new(
        threads_number: Option<usize>,
        tmp_path: Option<&Path>,
        segment_size: Option<u64>,
        rw_buf_size: Option<usize>,
    ) -> Result<Self, SortError> {
        return Ok(LineSorter {
            rw_buf_size,
            buffer_builder: SegmentBufferBuilder::new(segment_size.unwrap_or(DEFAULT_SEGMENT_SIZE)),
            thread_pool: Self::init_thread_pool(threads_number)?,
            tmp_dir: tmp_path.unwrap_or_else(|| Path::new(".")).to_path_buf(),
        });
    }

    fn init_thread_pool(threads_number: Option<usize>) -> Result<rayon::ThreadPool, SortError> {
        let mut thread_pool_builder = rayon::ThreadPoolBuilder::new();

        match threads_number {
            Some(threads_number) if threads_number > 0 => {
                log::info!("initializing thread-pool (threads: {})", threads_number);
                thread_pool_builder = thread_pool_builder.num_threads(threads_number);
            }
            _ => log::info!("initializing thread-pool (threads: default)"),
        }
        let thread_pool = thread_pool_builder
            .build()
            .map_err(|err| SortError::ThreadPoolBuildError(err))?;

        return Ok(thread_pool);
    }

    fn init_work_directory(&self) -> Result<tempfile::TempDir, SortError> {
        let work_dir = tempfile::Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .tempdir_in(&self.tmp_dir)
            .map_err(|err| SortError::TempDir(err))?;

        log::info!("using {} as a temporary directory", work_dir.path().display());

        return Ok(work_dir);
    }

    fn open_input(input: &Path) -> Result<fs::File, SortError> {
        let not_found = |err| SortError::InputNotFound(input.to_path_buf(), err);

        let input_file = fs::File::open(input).map_err(not_found)?;
        if !input_file.metadata().map_err(not_found)?.is_file() {
            return Err(not_found(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file")));
        }

        return Ok(input_file);
    }

    /// Returns the number of threads segments are sorted and merged by.
    pub fn threads_number(&self) -> usize {
        self.thread_pool.current_num_threads()
    }

    /// Returns the in-memory segment size limit in bytes.
    pub fn segment_size(&self) -> u64 {
        self.buffer_builder.budget()
    }

    /// Sorts lines of the `input` file and writes them to `output`, replacing it if it exists.
    /// The output file is only created once sorting has succeeded.
    ///
    /// # Arguments
    /// * `input` - File to be sorted
    /// * `output` - Destination of the sorted lines
    pub fn sort(&self, input: &Path, output: &Path) -> Result<(), SortError> {
        let input_file = Self::open_input(input)?;
        let input_reader = match self.rw_buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, input_file),
            None => io::BufReader::new(input_file),
        };

        let work_dir = self.init_work_directory()?;

        let sorted = self.thread_pool.install(|| -> Result<SortedSegment, SortError> {
            let segmenter = Segmenter::new(
                work_dir.path(),
                self.buffer_builder,
                self.threads_number(),
                self.rw_buf_size,
            );
            let segments = segmenter.split(input_reader)?;

            log::debug!("merging {} sorted segments ...", segments.len());
            MergeTree::new(work_dir.path(), self.rw_buf_size).merge_all(segments)
        })?;

        log::info!("saving sorted data to {}", output.display());
        sorted
            .persist(output)
            .map_err(|err| SortError::CommitFailure(output.to_path_buf(), err))?;

        if let Err(err) = work_dir.close() {
            log::warn!("temporary directory not removed: {}", err);
        }

        return Ok(());
    }
}
