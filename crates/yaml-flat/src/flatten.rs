//! The indentation-driven stack machine that turns classified lines into
//! flattened paths.

use alloc::borrow::Cow;
use std::io::Read;

use crate::block::read_block_scalar;
use crate::config::FlatConfig;
use crate::error::{Error, ParseError};
use crate::line::{LineKind, classify};
use crate::options::ParseOptions;
use crate::reader::LineReader;
use crate::scalar::{Resolved, resolve, resolve_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Mapping,
    Sequence,
    Scalar,
}

/// A line whose key and value were copied out of the read buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedNode {
    kind: NodeKind,
    indent: usize,
    item_indent: usize,
    key: String,
    /// `None` when the line has no inline value and opens a nested node.
    value: Option<String>,
    line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextKind {
    Mapping,
    Sequence,
}

/// An open node waiting for children on deeper lines.
#[derive(Debug, Clone)]
struct ActiveContext {
    kind: ContextKind,
    indent: usize,
    path: String,
    /// Index of the last sequence entry written under this node.
    current_index: Option<usize>,
}

impl ActiveContext {
    /// Path children attach to: the node path, plus the current entry index
    /// once the node holds sequence entries.
    fn path(&self, delimiter: &str) -> Cow<'_, str> {
        match self.current_index {
            Some(index) => Cow::Owned(format!("{}{delimiter}{index}", self.path)),
            None => Cow::Borrowed(&self.path),
        }
    }

    fn next_index(&mut self) -> usize {
        let index = self.current_index.map_or(0, |i| i + 1);
        self.current_index = Some(index);
        index
    }
}

struct Flattener<'o> {
    options: &'o ParseOptions,
    stack: Vec<ActiveContext>,
    config: FlatConfig,
}

impl<'o> Flattener<'o> {
    fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            stack: Vec::with_capacity(10),
            config: FlatConfig::new(),
        }
    }

    fn join(&self, parent: &str, segment: &str) -> String {
        let delimiter = &self.options.key_delimiter;
        let mut path = String::with_capacity(parent.len() + delimiter.len() + segment.len());
        path.push_str(parent);
        path.push_str(delimiter);
        path.push_str(segment);
        path
    }

    fn child_path(&self, key: &str) -> String {
        match self.stack.last() {
            Some(parent) => self.join(&parent.path(&self.options.key_delimiter), key),
            None => key.to_string(),
        }
    }

    fn write(&mut self, path: String, value: String) {
        tracing::trace!(%path, "entry");
        self.config.insert(path, Some(value));
    }

    fn process(&mut self, node: ResolvedNode) -> Result<(), ParseError> {
        match node.kind {
            NodeKind::Mapping => {
                self.mapping(node);
                Ok(())
            }
            NodeKind::Sequence => self.sequence(node),
            NodeKind::Scalar => Err(ParseError::UnexpectedScalar { line: node.line }),
        }
    }

    fn mapping(&mut self, node: ResolvedNode) {
        // Siblings and empty headers at the same indentation are closed.
        while self.stack.last().is_some_and(|c| c.indent >= node.indent) {
            self.stack.pop();
        }

        let path = self.child_path(&node.key);
        match node.value {
            Some(value) => self.write(path, value),
            None => self.stack.push(ActiveContext {
                kind: ContextKind::Mapping,
                indent: node.indent,
                path,
                current_index: None,
            }),
        }
    }

    fn sequence(&mut self, node: ResolvedNode) -> Result<(), ParseError> {
        // `key:` followed by `- item` at the same indentation keeps the key open.
        while self.stack.last().is_some_and(|c| {
            c.indent > node.indent || (c.indent == node.indent && c.kind == ContextKind::Sequence)
        }) {
            self.stack.pop();
        }

        let options = self.options;
        let Some(parent) = self.stack.last_mut() else {
            return Err(ParseError::OrphanSequence { line: node.line });
        };
        parent.next_index();
        let item_path = parent.path(&options.key_delimiter).into_owned();

        match (node.key.is_empty(), node.value) {
            (true, Some(value)) => self.write(item_path, value),
            (true, None) => self.stack.push(ActiveContext {
                kind: ContextKind::Sequence,
                indent: node.indent,
                path: item_path,
                current_index: None,
            }),
            (false, Some(value)) => {
                let path = self.join(&item_path, &node.key);
                self.write(path, value);
            }
            (false, None) => {
                let path = self.join(&item_path, &node.key);
                self.stack.push(ActiveContext {
                    kind: ContextKind::Mapping,
                    indent: node.item_indent,
                    path,
                    current_index: None,
                });
            }
        }
        Ok(())
    }
}

/// Read the next line that carries a node, skipping blank and comment lines.
/// Block scalars are read to their end before returning.
fn read_node<R: Read>(
    reader: &mut LineReader<R>,
    options: &ParseOptions,
) -> Result<Option<ResolvedNode>, Error> {
    loop {
        if reader.is_exhausted() {
            return Ok(None);
        }
        let Some(raw) = reader.read_line()? else {
            return Ok(None);
        };
        let line_number = raw.number;
        let line = classify(raw.text);
        let kind = match line.kind {
            LineKind::Empty | LineKind::Comment => continue,
            LineKind::Mapping => NodeKind::Mapping,
            LineKind::Sequence => NodeKind::Sequence,
            LineKind::Scalar => NodeKind::Scalar,
        };
        let indent = line.indent.unwrap_or_default();
        let item_indent = line.item_indent;
        // A block under `- key: |` belongs to the mapping inside the entry.
        let block_base = if line.key.is_empty() { indent } else { item_indent };
        let key = resolve_key(line.key, line_number)?;

        let value = match resolve(line.value, line_number)? {
            Resolved::Empty => None,
            Resolved::Text(text) => Some(text),
            Resolved::Block(style) => {
                Some(read_block_scalar(reader, block_base, style, options)?)
            }
        };

        return Ok(Some(ResolvedNode {
            kind,
            indent,
            item_indent,
            key,
            value,
            line: line_number,
        }));
    }
}

/// Flatten the whole document behind `reader`.
pub fn flatten<R: Read>(
    mut reader: LineReader<R>,
    options: &ParseOptions,
) -> Result<FlatConfig, Error> {
    let mut flattener = Flattener::new(options);
    while let Some(node) = read_node(&mut reader, options)? {
        flattener.process(node)?;
    }

    tracing::debug!(
        entries = flattener.config.len(),
        lines = reader.line_number(),
        "flattened document"
    );
    Ok(flattener.config)
}
