//! Raw line retrieval and comment stripping

use std::io::{self, BufRead};

/// Numbered line reader over any buffered source.
///
/// Lines are returned with their original endings intact so callers that
/// copy input can reproduce it byte for byte.
pub struct LineReader<R> {
    reader: R,
    linenum: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        LineReader { reader, linenum: 0 }
    }

    /// The next raw line and its 1-based number, or `None` at end of input
    ///
    /// # Errors
    /// Propagates read failures, including non-UTF-8 input.
    pub fn next_raw(&mut self) -> io::Result<Option<(usize, String)>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        self.linenum += 1;
        Ok(Some((self.linenum, line)))
    }
}

/// Strip a `#` comment (anywhere in the line) and surrounding whitespace
#[must_use]
pub fn clean(line: &str) -> &str {
    let data = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };
    data.trim()
}
