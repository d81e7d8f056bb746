use crate::block::BlockStyle;
use crate::error::ParseError;

/// What a value span turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// No value on the line: the entry opens a nested node.
    Empty,
    Text(String),
    /// A block scalar introducer; the content follows on the next lines.
    Block(BlockStyle),
}

/// Resolve the raw value span of line `line`.
///
/// Quoted values end at their closing quote and ignore the rest of the line.
/// Plain values lose a trailing comment and surrounding whitespace.
pub fn resolve(value: &str, line: usize) -> Result<Resolved, ParseError> {
    let value = value.trim();
    if let Some(quote @ ('"' | '\'')) = value.chars().next() {
        return unquote(value, quote, line).map(Resolved::Text);
    }

    let value = strip_comment(value).trim_end();
    Ok(match value.chars().next() {
        None => Resolved::Empty,
        Some('|') => Resolved::Block(BlockStyle::Literal),
        Some('>') => Resolved::Block(BlockStyle::Folded),
        Some(_) => Resolved::Text(value.to_string()),
    })
}

/// A mapping key with its surrounding quotes removed, if it has any.
pub fn resolve_key(key: &str, line: usize) -> Result<String, ParseError> {
    let key = key.trim();
    match key.chars().next() {
        Some(quote @ ('"' | '\'')) => unquote(key, quote, line),
        _ => Ok(key.to_string()),
    }
}

/// Cut `value` at a `#` that starts the value or follows whitespace.
pub fn strip_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    bytes
        .iter()
        .enumerate()
        .find(|&(i, &b)| b == b'#' && (i == 0 || matches!(bytes[i - 1], b' ' | b'\t')))
        .map_or(value, |(i, _)| &value[..i])
}

/// Take the text between `quote` at the start of `value` and its closing
/// counterpart, collapsing `\<quote>` escapes.
fn unquote(value: &str, quote: char, line: usize) -> Result<String, ParseError> {
    let body = &value[quote.len_utf8()..];
    let mut escapes = 0;
    let mut previous = None;
    let mut end = None;

    for (i, c) in body.char_indices() {
        if c == quote {
            if previous == Some('\\') {
                escapes += 1;
            } else {
                end = Some(i);
                break;
            }
        }
        previous = Some(c);
    }

    let Some(end) = end else {
        return Err(ParseError::UnterminatedQuote { line, quote });
    };
    let inner = &body[..end];
    if escapes == 0 {
        return Ok(inner.to_string());
    }

    let mut unescaped = String::with_capacity(inner.len() - escapes);
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&quote) {
            continue;
        }
        unescaped.push(c);
    }
    Ok(unescaped)
}
