//! In-memory segment buffers.

use rayon;

/// Result of an attempt to add a line to a [`MemorySegment`].
/// A rejected line is handed back to the caller.
#[derive(Debug, PartialEq, Eq)]
pub enum AppendResult {
    /// The line was buffered.
    Accepted,
    /// The segment has no room left for the line.
    SegmentFull(Vec<u8>),
    /// The line alone exceeds the segment budget, no segment can ever hold it.
    LineTooLarge(Vec<u8>),
}

/// Segment buffer builder.
#[derive(Debug, Clone, Copy)]
pub struct SegmentBufferBuilder {
    budget: u64,
}

impl SegmentBufferBuilder {
    pub fn new(budget: u64) -> Self {
        SegmentBufferBuilder { budget }
    }

    /// Returns the per-segment byte budget.
    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Creates a new empty segment.
    pub fn build(&self) -> MemorySegment {
        MemorySegment::new(self.budget)
    }
}

/// Lines accumulated in read order, limited by their total byte length.
pub struct MemorySegment {
    budget: u64,
    current_size: u64,
    lines: Vec<Vec<u8>>,
}

impl MemorySegment {
    pub fn new(budget: u64) -> Self {
        MemorySegment {
            budget,
            current_size: 0,
            lines: Vec::new(),
        }
    }

    /// Appends a line if it fits the remaining budget.
    /// The segment is left untouched unless the line is accepted.
    pub fn try_append(&mut self, line: Vec<u8>) -> AppendResult {
        let line_size = line.len() as u64;
        if self.current_size + line_size > self.budget {
            return if self.current_size == 0 {
                AppendResult::LineTooLarge(line)
            } else {
                AppendResult::SegmentFull(line)
            };
        }

        self.current_size += line_size;
        self.lines.push(line);

        return AppendResult::Accepted;
    }

    /// Returns the total byte length of the buffered lines.
    pub fn mem_size(&self) -> u64 {
        self.current_size
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Hands the buffered lines over, consuming the segment.
    pub fn take_lines(self) -> Vec<Vec<u8>> {
        self.lines
    }
}

impl rayon::slice::ParallelSliceMut<Vec<u8>> for MemorySegment {
    fn as_parallel_slice_mut(&mut self) -> &mut [Vec<u8>] {
        self.lines.as_mut_slice()
    }
}
