//! Random line file generator used to produce sorting fixtures.

use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use rand::distributions::{Alphanumeric, Distribution};
use rand::Rng;

/// Generates lines of random alphanumeric characters.
/// Every generator owns its random number source.
pub struct LineGenerator<R: Rng> {
    rng: R,
    min_length: usize,
}

impl LineGenerator<rand::rngs::ThreadRng> {
    /// Creates a generator backed by the thread-local random number generator.
    pub fn new() -> Self {
        LineGenerator::with_rng(rand::thread_rng())
    }
}

impl<R: Rng> LineGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        LineGenerator { rng, min_length: 1 }
    }

    /// Sets the minimal line length (inclusive).
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        return self;
    }

    /// Writes `num_lines` lines with lengths uniformly chosen from `[min_length, max_line_len)`.
    pub fn write_lines(&mut self, writer: &mut impl Write, num_lines: u64, max_line_len: usize) -> io::Result<()> {
        if max_line_len <= self.min_length {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "max line length {} must be greater than min length {}",
                    max_line_len, self.min_length
                ),
            ));
        }

        let mut line = Vec::with_capacity(max_line_len + 1);
        for _ in 0..num_lines {
            let line_len = self.rng.gen_range(self.min_length..max_line_len);

            line.clear();
            line.extend(Alphanumeric.sample_iter(&mut self.rng).take(line_len));
            line.push(b'\n');
            writer.write_all(&line)?;
        }

        return Ok(());
    }

    /// Writes generated lines to the file at `path`, replacing it if it exists.
    pub fn generate(&mut self, path: &Path, num_lines: u64, max_line_len: usize) -> io::Result<()> {
        let mut writer = io::BufWriter::new(fs::File::create(path)?);
        self.write_lines(&mut writer, num_lines, max_line_len)?;
        writer.flush()
    }
}
