//! Fixed-capacity line reader over a byte stream.
//!
//! The reader owns one buffer for the whole parse. Lines and blocks are handed
//! out as `&str` views into that buffer, so they borrow the reader and must be
//! copied before the next read. When a line runs past the buffered data, the
//! unconsumed tail is moved to the start of the buffer and the rest of the
//! buffer is refilled from the source.

use std::io::{ErrorKind, Read};

use crate::error::ReadError;
use crate::line::indentation;

/// One physical line with its end-of-line marker removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLine<'a> {
    pub text: &'a str,
    /// 1-based line number.
    pub number: usize,
}

/// The lines returned by [`LineReader::read_block`], end-of-line markers included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    pub text: &'a str,
    pub lines: usize,
}

#[derive(Debug, Clone, Copy)]
enum Scan {
    /// Line content ends at `end`; the following line starts at `next`.
    Line { end: usize, next: usize },
    /// The end of the line has not been buffered yet.
    Incomplete,
}

pub struct LineReader<R> {
    source: R,
    buffer: Box<[u8]>,
    /// Start of the unconsumed data.
    cursor: usize,
    /// End of the valid data in `buffer`.
    filled: usize,
    source_done: bool,
    /// A byte read past a full buffer while checking for the end of input.
    /// The next refill writes it first.
    held: Option<u8>,
    line_number: usize,
}

impl<R: Read> LineReader<R> {
    /// Create a reader with a buffer of `capacity` bytes (at least one).
    pub fn new(source: R, capacity: usize) -> Self {
        Self {
            source,
            buffer: vec![0; capacity.max(1)].into_boxed_slice(),
            cursor: 0,
            filled: 0,
            source_done: false,
            held: None,
            line_number: 0,
        }
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// `true` once the source is drained and every buffered byte is consumed.
    pub fn is_exhausted(&self) -> bool {
        self.source_done && self.cursor >= self.filled
    }

    /// Read the next line, or `None` at the end of the input.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::LineTooLong`] when a single line does not fit
    /// into the buffer, and [`ReadError::Io`] when the source fails.
    pub fn read_line(&mut self) -> Result<Option<RawLine<'_>>, ReadError> {
        loop {
            if self.cursor >= self.filled {
                if self.source_done {
                    return Ok(None);
                }
                self.refill()?;
                continue;
            }

            match self.scan_line(self.cursor)? {
                Scan::Line { end, next } => return self.take_line(end, next).map(Some),
                Scan::Incomplete if self.cursor > 0 || self.filled < self.buffer.len() => {
                    self.refill()?;
                }
                Scan::Incomplete => {
                    // The buffer is full. At the end of input the line is complete.
                    if !self.has_more_input()? {
                        continue;
                    }
                    if self.buffer[self.filled - 1] == b'\r' {
                        // Only the end-of-line marker is cut off.
                        if self.held == Some(b'\n') {
                            self.held = None;
                        }
                        return self.take_line(self.filled - 1, self.filled).map(Some);
                    }
                    return Err(ReadError::LineTooLong {
                        line: self.line_number + 1,
                        capacity: self.buffer.len(),
                    });
                }
            }
        }
    }

    /// Read every following line that is indented deeper than `base_indent`.
    ///
    /// Blank lines never end the block. The block stops before the first
    /// non-blank line indented `base_indent` or less, or at the end of input.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::BlockTooLarge`] when the block does not fit into
    /// the buffer, and [`ReadError::Io`] when the source fails.
    pub fn read_block(&mut self, base_indent: usize) -> Result<Block<'_>, ReadError> {
        let first_line = self.line_number + 1;
        let mut pos = self.cursor;
        let mut lines = 0;

        loop {
            let scan = if pos < self.filled {
                self.scan_line(pos)?
            } else if self.source_done {
                break;
            } else {
                Scan::Incomplete
            };

            match scan {
                Scan::Line { end, next } => {
                    if indentation(&self.buffer[pos..end]).is_some_and(|i| i <= base_indent) {
                        break;
                    }
                    lines += 1;
                    pos = next;
                }
                Scan::Incomplete => {
                    // A partial line is enough to see that it ends the block.
                    if indentation(&self.buffer[pos..self.filled]).is_some_and(|i| i <= base_indent) {
                        break;
                    }
                    if self.cursor == 0 && self.filled == self.buffer.len() {
                        if !self.has_more_input()? {
                            continue;
                        }
                        return Err(ReadError::BlockTooLarge {
                            line: first_line,
                            capacity: self.buffer.len(),
                        });
                    }
                    let shift = self.refill()?;
                    pos = (pos - shift).max(self.cursor);
                }
            }
        }

        let start = self.cursor;
        self.cursor = pos;
        self.line_number += lines;
        let text = core::str::from_utf8(&self.buffer[start..pos])
            .map_err(|_| ReadError::InvalidUtf8 { line: first_line })?;
        Ok(Block { text, lines })
    }

    fn scan_line(&self, start: usize) -> Result<Scan, ReadError> {
        if start > self.filled {
            return Err(ReadError::ScanOutOfRange {
                index: start,
                length: self.filled,
            });
        }

        let data = &self.buffer[start..self.filled];
        let Some(offset) = data.iter().position(|&b| b == b'\r' || b == b'\n') else {
            return Ok(if self.source_done {
                Scan::Line {
                    end: self.filled,
                    next: self.filled,
                }
            } else {
                Scan::Incomplete
            });
        };

        let end = start + offset;
        if self.buffer[end] == b'\n' {
            return Ok(Scan::Line { end, next: end + 1 });
        }
        // CR: the matching LF may still be in the source.
        Ok(match self.buffer.get(end + 1..self.filled) {
            Some([b'\n', ..]) => Scan::Line { end, next: end + 2 },
            Some([_, ..]) => Scan::Line { end, next: end + 1 },
            _ if self.source_done => Scan::Line { end, next: end + 1 },
            _ => Scan::Incomplete,
        })
    }

    fn take_line(&mut self, end: usize, next: usize) -> Result<RawLine<'_>, ReadError> {
        self.line_number += 1;
        let number = self.line_number;
        let start = self.cursor;
        self.cursor = next;
        let text = core::str::from_utf8(&self.buffer[start..end])
            .map_err(|_| ReadError::InvalidUtf8 { line: number })?;
        Ok(RawLine { text, number })
    }

    /// Move the unconsumed data to the front of the buffer and fill the rest
    /// from the source. Returns how far the data moved.
    fn refill(&mut self) -> Result<usize, ReadError> {
        let shift = self.cursor;
        if shift > 0 {
            self.buffer.copy_within(shift..self.filled, 0);
            self.filled -= shift;
            self.cursor = 0;
        }

        if self.filled < self.buffer.len()
            && let Some(byte) = self.held.take()
        {
            self.buffer[self.filled] = byte;
            self.filled += 1;
        }

        while self.filled < self.buffer.len() && !self.source_done {
            match self.source.read(&mut self.buffer[self.filled..]) {
                Ok(0) => self.source_done = true,
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(
            kept = self.filled.saturating_sub(shift),
            filled = self.filled,
            capacity = self.buffer.len(),
            source_done = self.source_done,
            "refilled read buffer"
        );
        Ok(shift)
    }

    /// Read one byte past a full buffer to learn whether the source is drained.
    /// The byte is held for the next refill.
    fn has_more_input(&mut self) -> Result<bool, ReadError> {
        if self.held.is_some() {
            return Ok(true);
        }
        let mut slot = [0; 1];
        while !self.source_done {
            match self.source.read(&mut slot) {
                Ok(0) => self.source_done = true,
                Ok(_) => {
                    self.held = Some(slot[0]);
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(false)
    }
}

/// Iterator over the lines of a block, splitting on LF, CR LF and lone CR.
pub(crate) struct SplitLines<'a> {
    rest: &'a str,
}

pub(crate) fn split_lines(text: &str) -> SplitLines<'_> {
    SplitLines { rest: text }
}

impl<'a> Iterator for SplitLines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let Some(end) = self.rest.find(|c| c == '\r' || c == '\n') else {
            let line = self.rest;
            self.rest = "";
            return Some(line);
        };
        let line = &self.rest[..end];
        let eol = if self.rest[end..].starts_with("\r\n") { 2 } else { 1 };
        self.rest = &self.rest[end + eol..];
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_lines(input: &str, capacity: usize) -> Result<Vec<String>, ReadError> {
        let mut reader = LineReader::new(input.as_bytes(), capacity);
        let mut lines = Vec::new();
        while let Some(line) = reader.read_line()? {
            lines.push(line.text.to_string());
        }
        Ok(lines)
    }

    /// Hands out at most one byte per `read` call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match (self.0.split_first(), buf.first_mut()) {
                (Some((&b, rest)), Some(slot)) => {
                    *slot = b;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn reads_lf_crlf_and_cr_lines() -> anyhow::Result<()> {
        assert_eq!(collect_lines("a\nb\r\nc\rd", 64)?, ["a", "b", "c", "d"]);
        Ok(())
    }

    #[test]
    fn keeps_empty_lines() -> anyhow::Result<()> {
        assert_eq!(collect_lines("a\n\n\nb\n", 64)?, ["a", "", "", "b"]);
        Ok(())
    }

    #[test]
    fn empty_input_has_no_lines() -> anyhow::Result<()> {
        assert!(collect_lines("", 8)?.is_empty());
        Ok(())
    }

    #[test]
    fn counts_line_numbers() -> anyhow::Result<()> {
        let mut reader = LineReader::new("x\ny\n".as_bytes(), 8);
        assert_eq!(reader.read_line()?.map(|l| l.number), Some(1));
        assert_eq!(reader.read_line()?.map(|l| l.number), Some(2));
        assert!(reader.read_line()?.is_none());
        assert_eq!(reader.line_number(), 2);
        Ok(())
    }

    #[test]
    fn refills_across_buffer_boundary() -> anyhow::Result<()> {
        let input = "first: 1\nsecond: 2\nthird: 3\n";
        assert_eq!(
            collect_lines(input, 12)?,
            ["first: 1", "second: 2", "third: 3"]
        );
        Ok(())
    }

    #[test]
    fn refills_from_a_trickling_source() -> anyhow::Result<()> {
        let mut reader = LineReader::new(Trickle(b"alpha\r\nbeta\r\ngamma"), 8);
        let mut lines = Vec::new();
        while let Some(line) = reader.read_line()? {
            lines.push(line.text.to_string());
        }
        assert_eq!(lines, ["alpha", "beta", "gamma"]);
        Ok(())
    }

    #[test]
    fn crlf_split_by_refill_is_one_line_ending() -> anyhow::Result<()> {
        // "ab\r" ends the first fill; its LF arrives with the second.
        assert_eq!(collect_lines("x\nab\r\ncd\n", 5)?, ["x", "ab", "cd"]);
        Ok(())
    }

    #[test]
    fn crlf_split_when_line_fills_buffer() -> anyhow::Result<()> {
        assert_eq!(collect_lines("abc\r\ndef\r\n", 4)?, ["abc", "def"]);
        Ok(())
    }

    #[test]
    fn last_line_filling_buffer_without_newline() -> anyhow::Result<()> {
        assert_eq!(collect_lines("a: 1", 4)?, ["a: 1"]);
        assert_eq!(collect_lines("x: 1\nabcd: 12", 8)?, ["x: 1", "abcd: 12"]);

        let mut reader = LineReader::new(Trickle(b"a:"), 2);
        assert_eq!(reader.read_line()?.map(|l| l.text), Some("a:"));
        assert!(reader.read_line()?.is_none());
        assert!(reader.is_exhausted());
        Ok(())
    }

    #[test]
    fn lone_cr_filling_buffer_keeps_next_byte() -> anyhow::Result<()> {
        assert_eq!(collect_lines("abc\rdef\n", 4)?, ["abc", "def"]);
        Ok(())
    }

    #[test]
    fn line_longer_than_buffer_fails() {
        let err = collect_lines("short\nthis line is far too long\n", 10);
        assert!(matches!(
            err,
            Err(ReadError::LineTooLong {
                line: 2,
                capacity: 10
            })
        ));
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut reader = LineReader::new(&b"ok\n\xff\xfe\n"[..], 16);
        assert!(matches!(reader.read_line(), Ok(Some(_))));
        assert!(matches!(
            reader.read_line(),
            Err(ReadError::InvalidUtf8 { line: 2 })
        ));
    }

    #[test]
    fn exhausted_after_last_line() -> anyhow::Result<()> {
        let mut reader = LineReader::new("only".as_bytes(), 8);
        assert!(!reader.is_exhausted());
        assert_eq!(reader.read_line()?.map(|l| l.text), Some("only"));
        assert!(reader.is_exhausted());
        Ok(())
    }

    #[test]
    fn block_stops_at_dedent() -> anyhow::Result<()> {
        let mut reader = LineReader::new("key: |\n  one\n  two\nnext: 1\n".as_bytes(), 64);
        assert_eq!(reader.read_line()?.map(|l| l.text), Some("key: |"));
        let block = reader.read_block(0)?;
        assert_eq!(block.text, "  one\n  two\n");
        assert_eq!(block.lines, 2);
        assert_eq!(reader.read_line()?.map(|l| (l.text, l.number)), Some(("next: 1", 4)));
        Ok(())
    }

    #[test]
    fn block_keeps_blank_lines() -> anyhow::Result<()> {
        let mut reader = LineReader::new("  a\n\n   \n  b\n\nc\n".as_bytes(), 64);
        let block = reader.read_block(0)?;
        assert_eq!(block.text, "  a\n\n   \n  b\n\n");
        assert_eq!(block.lines, 5);
        Ok(())
    }

    #[test]
    fn block_runs_to_end_of_input() -> anyhow::Result<()> {
        let mut reader = LineReader::new("    a\n    b".as_bytes(), 64);
        let block = reader.read_block(2)?;
        assert_eq!(block.text, "    a\n    b");
        assert!(reader.is_exhausted());
        Ok(())
    }

    #[test]
    fn block_can_be_empty() -> anyhow::Result<()> {
        let mut reader = LineReader::new("a: 1\n".as_bytes(), 64);
        let block = reader.read_block(0)?;
        assert_eq!(block.text, "");
        assert_eq!(block.lines, 0);
        assert_eq!(reader.read_line()?.map(|l| l.text), Some("a: 1"));
        Ok(())
    }

    #[test]
    fn block_survives_refill() -> anyhow::Result<()> {
        let input = "text: |\n  line one\n  line two\nafter: 1\n";
        let mut reader = LineReader::new(input.as_bytes(), 24);
        assert_eq!(reader.read_line()?.map(|l| l.text), Some("text: |"));
        let block = reader.read_block(0)?;
        assert_eq!(block.text, "  line one\n  line two\n");
        assert_eq!(reader.read_line()?.map(|l| l.text), Some("after: 1"));
        Ok(())
    }

    #[test]
    fn block_ends_before_partially_buffered_line() -> anyhow::Result<()> {
        // The block takes 13 of 16 bytes; only "nex" of the next line is buffered.
        let mut reader = LineReader::new("  aaaa\n  bbb\nnext: value\n".as_bytes(), 16);
        let block = reader.read_block(0)?;
        assert_eq!(block.text, "  aaaa\n  bbb\n");
        assert_eq!(reader.read_line()?.map(|l| l.text), Some("next: value"));
        Ok(())
    }

    #[test]
    fn block_larger_than_buffer_fails() -> anyhow::Result<()> {
        let input = "t: |\n  aaaaaaaa\n  bbbbbbbb\n  cccccccc\n";
        let mut reader = LineReader::new(input.as_bytes(), 16);
        assert_eq!(reader.read_line()?.map(|l| l.text), Some("t: |"));
        assert!(matches!(
            reader.read_block(0),
            Err(ReadError::BlockTooLarge { line: 2, .. })
        ));
        Ok(())
    }

    #[test]
    fn block_filling_buffer_at_end_of_input() -> anyhow::Result<()> {
        let mut reader = LineReader::new("t: |\n  abcd".as_bytes(), 6);
        assert_eq!(reader.read_line()?.map(|l| l.text), Some("t: |"));
        let block = reader.read_block(0)?;
        assert_eq!(block.text, "  abcd");
        assert_eq!(block.lines, 1);
        assert!(reader.is_exhausted());
        Ok(())
    }

    #[test]
    fn block_crlf_split_by_refill() -> anyhow::Result<()> {
        // The first fill ends on the CR after "  cd"; its LF comes with the refill.
        let input = "t: |\r\n  ab\r\n  cd\r\nx: 1\r\n";
        let mut reader = LineReader::new(input.as_bytes(), 17);
        assert_eq!(reader.read_line()?.map(|l| l.text), Some("t: |"));
        let block = reader.read_block(0)?;
        assert_eq!(block.text, "  ab\r\n  cd\r\n");
        assert_eq!(block.lines, 2);
        assert_eq!(reader.read_line()?.map(|l| (l.text, l.number)), Some(("x: 1", 4)));
        assert!(reader.read_line()?.is_none());
        Ok(())
    }

    #[test]
    fn split_lines_handles_every_line_ending() {
        let lines: Vec<_> = split_lines("a\nb\r\nc\rd\n\n").collect();
        assert_eq!(lines, ["a", "b", "c", "d", ""]);
    }
}
