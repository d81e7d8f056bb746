//! Line classification: indentation, comments and the `key: value` split.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Nothing but spaces and tabs.
    Empty,
    Comment,
    /// `key: value` or `key:`
    Mapping,
    /// `- value`, `- key: value`, `- key:` or a lone `-`
    Sequence,
    /// Text without a key or a sequence marker.
    Scalar,
}

/// One raw line split into its parts. Every span borrows the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedLine<'a> {
    pub kind: LineKind,
    /// Width of the leading whitespace, `None` for empty lines.
    pub indent: Option<usize>,
    /// Column where the entry content starts: past the `- ` marker for
    /// sequence entries, the indentation otherwise.
    pub item_indent: usize,
    pub key: &'a str,
    /// Raw value span, untrimmed and with comments still attached.
    pub value: &'a str,
}

impl ClassifiedLine<'_> {
    const fn blank(kind: LineKind, indent: Option<usize>) -> Self {
        Self {
            kind,
            indent,
            item_indent: 0,
            key: "",
            value: "",
        }
    }
}

/// Count the leading spaces and tabs, or `None` if the line has no other content.
pub fn indentation(line: &[u8]) -> Option<usize> {
    line.iter().position(|&b| b != b' ' && b != b'\t')
}

pub fn classify(line: &str) -> ClassifiedLine<'_> {
    let Some(indent) = indentation(line.as_bytes()) else {
        return ClassifiedLine::blank(LineKind::Empty, None);
    };
    let content = &line[indent..];

    if content.starts_with('#') {
        return ClassifiedLine::blank(LineKind::Comment, Some(indent));
    }

    if let Some(item) = strip_sequence_marker(content) {
        let trimmed = item.trim_start_matches([' ', '\t']);
        let item_indent = indent + (content.len() - trimmed.len());
        let (key, value) = match split_entry(trimmed) {
            Some((key, value)) => (key.trim_end(), value),
            None => ("", trimmed),
        };
        return ClassifiedLine {
            kind: LineKind::Sequence,
            indent: Some(indent),
            item_indent,
            key,
            value,
        };
    }

    let (kind, key, value) = match split_entry(content) {
        Some((key, value)) => (LineKind::Mapping, key.trim_end(), value),
        None => (LineKind::Scalar, "", content),
    };
    ClassifiedLine {
        kind,
        indent: Some(indent),
        item_indent: indent,
        key,
        value,
    }
}

/// The text after a leading `-` that is followed by whitespace or nothing.
fn strip_sequence_marker(content: &str) -> Option<&str> {
    let rest = content.strip_prefix('-')?;
    match rest.as_bytes().first() {
        None | Some(b' ' | b'\t') => Some(rest),
        _ => None,
    }
}

/// Split `key: value` at the first colon that sits outside quotes and is
/// followed by whitespace or ends the line. A comment ends the search.
fn split_entry(span: &str) -> Option<(&str, &str)> {
    let bytes = span.as_bytes();
    let mut quote = None;

    for (i, &b) in bytes.iter().enumerate() {
        let after_space = i == 0 || matches!(bytes[i - 1], b' ' | b'\t');
        match quote {
            Some(q) => {
                if b == q && bytes[i - 1] != b'\\' {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' if after_space => quote = Some(b),
                b'#' if after_space => return None,
                b':' if bytes.get(i + 1).is_none_or(|n| matches!(n, b' ' | b'\t')) => {
                    let key = &span[..i];
                    return (!key.trim().is_empty()).then_some((key, &span[i + 1..]));
                }
                _ => {}
            },
        }
    }
    None
}
