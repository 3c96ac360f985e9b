//! Balanced binary merge tree.

use std::iter;
use std::path::Path;

use log;
use rayon;

use crate::segment::SortedSegment;
use crate::sort::{Phase, SortError};

/// Merges multiple sorted segments into a single one.
///
/// The segment list is split in two halves which are resolved concurrently, then the two results are
/// combined by a streaming 2-way merge. This gives *log*(*n*) merge levels where *n* is the number of
/// segments, each level reading and writing every line once.
pub struct MergeTree<'a> {
    dir: &'a Path,
    rw_buf_size: Option<usize>,
}

impl<'a> MergeTree<'a> {
    /// Creates a merge tree writing intermediate segments to `dir`.
    pub fn new(dir: &'a Path, rw_buf_size: Option<usize>) -> Self {
        MergeTree { dir, rw_buf_size }
    }

    /// Merges the segments into one. A single segment is returned as is.
    /// Must be called from a worker pool thread for the halves to run in parallel.
    pub fn merge_all(&self, mut segments: Vec<SortedSegment>) -> Result<SortedSegment, SortError> {
        if segments.len() <= 1 {
            return match segments.pop() {
                Some(segment) => Ok(segment),
                None => SortedSegment::build(self.dir, iter::empty(), self.rw_buf_size)
                    .map_err(|err| SortError::IO(Phase::Merging, err)),
            };
        }

        let right = segments.split_off(segments.len() / 2);
        let (left, right) = rayon::join(|| self.merge_all(segments), || self.merge_all(right));
        let (left, right) = (left?, right?);

        log::debug!(
            "merging segments {} and {}",
            left.path().display(),
            right.path().display()
        );

        SortedSegment::merge(self.dir, left, right, self.rw_buf_size)
            .map_err(|err| SortError::IO(Phase::Merging, err))
    }
}
