#![doc = include_str!("../README.md")]
#![allow(unused_assignments)] // thiserror/miette derive macros trigger false positives

extern crate alloc;

use std::io::{Read, Seek, SeekFrom};

mod block;
mod config;
pub mod error;
mod flatten;
mod line;
pub mod options;
mod reader;
mod scalar;
pub mod source;

pub use config::{ConfigKey, FlatConfig};
pub use error::{Error, ErrorKind, ParseError, ReadError};
pub use options::{EndOfLine, EndingLineBreaks, ParseOptions};
pub use source::{ConfigSource, FileSource, SourceError};

use reader::LineReader;

/// Flatten a document held in memory.
///
/// With `buffer-size = 0` the read buffer is sized to the text, up to 50 KiB.
///
/// # Errors
///
/// Returns [`ErrorKind::Reading`] errors when a line or block scalar does not
/// fit the read buffer, and [`ErrorKind::Parsing`] errors for malformed
/// structure.
#[tracing::instrument(skip_all, fields(len = text.len()))]
pub fn parse_str(text: &str, options: &ParseOptions) -> Result<FlatConfig, Error> {
    let capacity = options.buffer_capacity(u64::try_from(text.len()).ok());
    flatten::flatten(LineReader::new(text.as_bytes(), capacity), options)
}

/// Flatten a document from a stream of unknown length.
///
/// With `buffer-size = 0` the read buffer holds 10 KiB.
///
/// # Errors
///
/// See [`parse_str`]. Failures of the stream itself are reading errors.
#[tracing::instrument(skip_all)]
pub fn parse_reader(reader: impl Read, options: &ParseOptions) -> Result<FlatConfig, Error> {
    let capacity = options.buffer_capacity(None);
    flatten::flatten(LineReader::new(reader, capacity), options)
}

/// Flatten a document from a seekable stream, starting at its current
/// position. The remaining length sizes the read buffer like [`parse_str`].
///
/// # Errors
///
/// See [`parse_str`]. Failures of the stream itself are reading errors.
#[tracing::instrument(skip_all)]
pub fn parse_seekable(
    mut input: impl Read + Seek,
    options: &ParseOptions,
) -> Result<FlatConfig, Error> {
    let position = input.stream_position()?;
    let end = input.seek(SeekFrom::End(0))?;
    input.seek(SeekFrom::Start(position))?;

    let remaining = end.saturating_sub(position);
    let capacity = options.buffer_capacity(Some(remaining));
    tracing::debug!(remaining, capacity, "sized read buffer");
    flatten::flatten(LineReader::new(input, capacity), options)
}
