//! Input segmentation and parallel segment sorting.

use std::io::prelude::*;
use std::mem;
use std::path::Path;

use log;
use rayon::prelude::*;

use crate::buffer::{AppendResult, MemorySegment, SegmentBufferBuilder};
use crate::segment::SortedSegment;
use crate::sort::{Phase, SortError};

/// Sorting of a single in-memory segment. The task owns the segment until it is run.
pub struct SortTask {
    segment: MemorySegment,
}

impl SortTask {
    pub fn new(segment: MemorySegment) -> Self {
        SortTask { segment }
    }

    /// Sorts the segment lines and writes them to a new [`SortedSegment`] in `dir`.
    pub fn run(mut self, dir: &Path, rw_buf_size: Option<usize>) -> Result<SortedSegment, SortError> {
        log::debug!(
            "sorting segment (lines: {}, bytes: {}) ...",
            self.segment.len(),
            self.segment.mem_size()
        );
        self.segment.par_sort_unstable();

        let sorted = SortedSegment::build(dir, self.segment.take_lines(), rw_buf_size)
            .map_err(|err| SortError::IO(Phase::Sorting, err))?;

        return Ok(sorted);
    }
}

/// Splits an input stream into byte-limited segments and sorts them in parallel batches.
///
/// Segments are collected into a batch of [`SortTask`]s. When the batch reaches the parallelism degree
/// or the input is exhausted the whole batch is sorted concurrently before more input is read,
/// so at most `parallelism` segments are held in memory at a time.
pub struct Segmenter<'a> {
    dir: &'a Path,
    buffer_builder: SegmentBufferBuilder,
    parallelism: usize,
    rw_buf_size: Option<usize>,
}

impl<'a> Segmenter<'a> {
    /// Creates a new segmenter.
    ///
    /// # Arguments
    /// * `dir` - Directory sorted segment files are created in
    /// * `buffer_builder` - Builder of byte-limited in-memory segments
    /// * `parallelism` - Number of segments sorted concurrently
    /// * `rw_buf_size` - Segment file write buffer size
    pub fn new(
        dir: &'a Path,
        buffer_builder: SegmentBufferBuilder,
        parallelism: usize,
        rw_buf_size: Option<usize>,
    ) -> Self {
        Segmenter {
            dir,
            buffer_builder,
            parallelism: parallelism.max(1),
            rw_buf_size,
        }
    }

    /// Reads `\n` delimited lines from the input and returns the sorted segments in input order.
    /// At least one segment is returned, an empty input results in a single empty segment.
    /// No more than the segment budget plus one byte is buffered for a single line.
    pub fn split(&self, mut input: impl BufRead) -> Result<Vec<SortedSegment>, SortError> {
        let mut sorted_segments = Vec::new();
        let mut tasks = Vec::with_capacity(self.parallelism);
        let mut segment = self.buffer_builder.build();

        while let Some(line) = self.read_line(&mut input)? {
            match segment.try_append(line) {
                AppendResult::Accepted => {}
                AppendResult::SegmentFull(line) => {
                    let full = mem::replace(&mut segment, self.buffer_builder.build());
                    tasks.push(SortTask::new(full));

                    if let AppendResult::SegmentFull(line) | AppendResult::LineTooLarge(line) =
                        segment.try_append(line)
                    {
                        return Err(self.line_too_large(line.len()));
                    }
                }
                AppendResult::LineTooLarge(line) => return Err(self.line_too_large(line.len())),
            }

            if tasks.len() >= self.parallelism {
                sorted_segments.extend(self.run_batch(&mut tasks)?);
            }
        }

        tasks.push(SortTask::new(segment));
        sorted_segments.extend(self.run_batch(&mut tasks)?);

        log::debug!("input segmentation done (segments: {})", sorted_segments.len());

        return Ok(sorted_segments);
    }

    /// Reads the next line without its delimiter, [`None`] at the end of input.
    /// Fails as soon as the line grows beyond the segment budget.
    fn read_line(&self, input: &mut impl BufRead) -> Result<Option<Vec<u8>>, SortError> {
        let limit = self.buffer_builder.budget();
        let mut line = Vec::new();

        let read = input
            .by_ref()
            .take(limit.saturating_add(1))
            .read_until(b'\n', &mut line)
            .map_err(|err| SortError::IO(Phase::Segmenting, err))?;

        if read == 0 {
            return Ok(None);
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        } else if line.len() as u64 > limit {
            return Err(self.line_too_large(line.len()));
        }

        return Ok(Some(line));
    }

    fn run_batch(&self, tasks: &mut Vec<SortTask>) -> Result<Vec<SortedSegment>, SortError> {
        log::debug!("sorting segment batch (segments: {})", tasks.len());

        mem::take(tasks)
            .into_par_iter()
            .map(|task| task.run(self.dir, self.rw_buf_size))
            .collect()
    }

    fn line_too_large(&self, len: usize) -> SortError {
        SortError::LineTooLarge {
            len: len as u64,
            limit: self.buffer_builder.budget(),
        }
    }
}
