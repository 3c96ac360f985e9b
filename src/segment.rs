//! Sorted segments stored on file system.

use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use log;
use tempfile;

const SEGMENT_PREFIX: &str = "segment";
const SEGMENT_SUFFIX: &str = ".sort";

/// Already sorted sequence of lines backed by a temporary file, one `\n` terminated line per record.
/// The file is removed when the segment is merged away or dropped, unless it has been persisted.
#[derive(Debug)]
pub struct SortedSegment {
    path: tempfile::TempPath,
}

impl SortedSegment {
    /// Writes already sorted lines to a new segment file created in `dir`.
    ///
    /// # Arguments
    /// * `dir` - Directory the segment file is created in
    /// * `lines` - Lines in non-decreasing order
    /// * `buf_size` - Segment file write buffer size
    pub fn build(
        dir: &Path,
        lines: impl IntoIterator<Item = Vec<u8>>,
        buf_size: Option<usize>,
    ) -> io::Result<Self> {
        let mut tmp_file = Self::create_tmp_file(dir)?;
        {
            let mut writer = new_writer(tmp_file.as_file_mut(), buf_size);
            for line in lines.into_iter() {
                write_line(&mut writer, &line)?;
            }
            writer.flush()?;
        }

        return Ok(SortedSegment {
            path: tmp_file.into_temp_path(),
        });
    }

    /// Merges two segments into a new one created in `dir`.
    /// Both input segments are consumed and their files removed whether the merge succeeds or not.
    pub fn merge(
        dir: &Path,
        lhs: SortedSegment,
        rhs: SortedSegment,
        buf_size: Option<usize>,
    ) -> io::Result<Self> {
        let result = Self::write_merged(dir, &lhs, &rhs, buf_size);

        lhs.dispose();
        rhs.dispose();

        return result;
    }

    fn write_merged(
        dir: &Path,
        lhs: &SortedSegment,
        rhs: &SortedSegment,
        buf_size: Option<usize>,
    ) -> io::Result<Self> {
        let mut lhs_reader = lhs.reader(buf_size)?;
        let mut rhs_reader = rhs.reader(buf_size)?;

        let mut tmp_file = Self::create_tmp_file(dir)?;
        {
            let mut writer = new_writer(tmp_file.as_file_mut(), buf_size);

            let mut left = lhs_reader.next().transpose()?;
            let mut right = rhs_reader.next().transpose()?;
            loop {
                match (left.take(), right.take()) {
                    (None, None) => break,
                    (Some(l), None) => {
                        write_line(&mut writer, &l)?;
                        left = lhs_reader.next().transpose()?;
                    }
                    (None, Some(r)) => {
                        write_line(&mut writer, &r)?;
                        right = rhs_reader.next().transpose()?;
                    }
                    (Some(l), Some(r)) => {
                        // equal lines are taken from the left side
                        if l <= r {
                            write_line(&mut writer, &l)?;
                            left = lhs_reader.next().transpose()?;
                            right = Some(r);
                        } else {
                            write_line(&mut writer, &r)?;
                            right = rhs_reader.next().transpose()?;
                            left = Some(l);
                        }
                    }
                }
            }
            writer.flush()?;
        }

        return Ok(SortedSegment {
            path: tmp_file.into_temp_path(),
        });
    }

    fn create_tmp_file(dir: &Path) -> io::Result<tempfile::NamedTempFile> {
        let tmp_file = tempfile::Builder::new()
            .prefix(SEGMENT_PREFIX)
            .suffix(SEGMENT_SUFFIX)
            .tempfile_in(dir)?;

        log::trace!("segment file {} created", tmp_file.path().display());

        return Ok(tmp_file);
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the segment for sequential line reading.
    pub fn reader(&self, buf_size: Option<usize>) -> io::Result<SegmentReader> {
        let file = fs::File::open(&self.path)?;
        let reader = match buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        return Ok(SegmentReader {
            lines: reader.split(b'\n'),
        });
    }

    /// Moves the segment file to `dest`, replacing an existing file.
    /// On failure the segment file is removed.
    pub fn persist(self, dest: &Path) -> io::Result<()> {
        self.path.persist(dest).map_err(|err| err.error)
    }

    fn dispose(self) {
        let path = self.path.to_path_buf();
        if let Err(err) = self.path.close() {
            log::warn!("segment file {} not removed: {}", path.display(), err);
        }
    }
}

/// Sequential line reader over a [`SortedSegment`]. Lines are returned without the trailing `\n`.
pub struct SegmentReader {
    lines: io::Split<io::BufReader<fs::File>>,
}

impl Iterator for SegmentReader {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next()
    }
}

fn new_writer(file: &mut fs::File, buf_size: Option<usize>) -> io::BufWriter<&mut fs::File> {
    match buf_size {
        Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
        None => io::BufWriter::new(file),
    }
}

fn write_line(writer: &mut impl Write, line: &[u8]) -> io::Result<()> {
    writer.write_all(line)?;
    writer.write_all(b"\n")
}
