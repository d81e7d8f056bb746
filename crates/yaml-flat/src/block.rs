//! Literal (`|`) and folded (`>`) block scalars.

use std::io::Read;

use crate::error::ReadError;
use crate::line::indentation;
use crate::options::{EndingLineBreaks, ParseOptions};
use crate::reader::{LineReader, split_lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// `|` keeps every line break.
    Literal,
    /// `>` joins lines of equal indentation with a space.
    Folded,
}

/// Read the block that follows an introducer line indented by `base_indent`
/// and build its value.
pub fn read_block_scalar<R: Read>(
    reader: &mut LineReader<R>,
    base_indent: usize,
    style: BlockStyle,
    options: &ParseOptions,
) -> Result<String, ReadError> {
    let block = reader.read_block(base_indent)?;
    let eol = options.end_of_line.as_str();
    let mut value = String::with_capacity(block.text.len() + block.lines * eol.len());
    assemble(&mut value, block.text, style, eol);
    apply_ending(&mut value, options.ending_line_breaks);
    Ok(value)
}

fn assemble(out: &mut String, text: &str, style: BlockStyle, eol: &str) {
    let block_indent = split_lines(text)
        .find_map(|line| indentation(line.as_bytes()))
        .unwrap_or(0);
    // `out` is empty or ends with a line break.
    let mut at_break = true;

    for line in split_lines(text) {
        let Some(indent) = indentation(line.as_bytes()) else {
            out.push_str(eol);
            at_break = true;
            continue;
        };
        let content = line[indent.min(block_indent)..].trim_end();

        match style {
            BlockStyle::Literal => {
                out.push_str(content);
                out.push_str(eol);
            }
            BlockStyle::Folded if indent > block_indent => {
                if !at_break {
                    out.push_str(eol);
                }
                out.push_str(content);
                out.push_str(eol);
                at_break = true;
            }
            BlockStyle::Folded => {
                if !at_break {
                    out.push(' ');
                }
                out.push_str(content);
                at_break = false;
            }
        }
    }
}

fn apply_ending(value: &mut String, policy: EndingLineBreaks) {
    let body = value.trim_end_matches(['\r', '\n']).len();
    let keep = match policy {
        EndingLineBreaks::KeepAsIs => return,
        EndingLineBreaks::Trim => 0,
        EndingLineBreaks::Normalize => {
            let tail = &value[body..];
            if tail.starts_with("\r\n") {
                2
            } else {
                tail.len().min(1)
            }
        }
    };
    value.truncate(body + keep);
}
