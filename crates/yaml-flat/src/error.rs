use miette::Diagnostic;
use thiserror::Error;

/// The two failure classes a parse can end with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The buffer could not hold the input, or the input stream failed.
    Reading,
    /// The document is structurally malformed.
    Parsing,
}

/// Buffer-management failures raised by the line reader.
///
/// These almost always mean the configured buffer is too small for the
/// document, or the input is not something the reader can scan.
#[derive(Debug, Error, Diagnostic)]
pub enum ReadError {
    #[error("line {line} does not fit into the {capacity}-byte read buffer")]
    #[diagnostic(
        code(yaml_flat::read::line_too_long),
        help("increase `buffer-size` above the length of the longest line")
    )]
    LineTooLong { line: usize, capacity: usize },

    #[error("block scalar starting at line {line} does not fit into the {capacity}-byte read buffer")]
    #[diagnostic(
        code(yaml_flat::read::block_too_large),
        help("increase `buffer-size` above the length of the longest block scalar")
    )]
    BlockTooLarge { line: usize, capacity: usize },

    #[error("scan index {index} is outside the buffered data (length {length})")]
    #[diagnostic(code(yaml_flat::read::scan_out_of_range))]
    ScanOutOfRange { index: usize, length: usize },

    #[error("line {line} is not valid UTF-8")]
    #[diagnostic(code(yaml_flat::read::invalid_utf8))]
    InvalidUtf8 { line: usize },

    #[error("failed to read input: {source}")]
    #[diagnostic(code(yaml_flat::read::io))]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Structural failures raised while flattening.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("missing closing {quote} quote at line {line}")]
    #[diagnostic(code(yaml_flat::parse::unterminated_quote))]
    UnterminatedQuote { line: usize, quote: char },

    #[error("the sequence entry at line {line} must have a parent node")]
    #[diagnostic(
        code(yaml_flat::parse::orphan_sequence),
        help("top-level sequences cannot be flattened; nest the sequence under a key")
    )]
    OrphanSequence { line: usize },

    #[error("unexpected scalar at line {line}: every value must belong to a key or a sequence entry")]
    #[diagnostic(code(yaml_flat::parse::unexpected_scalar))]
    UnexpectedScalar { line: usize },
}

/// Error returned by every parse entry point.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Read(_) => ErrorKind::Reading,
            Error::Parse(_) => ErrorKind::Parsing,
        }
    }

    /// Line the failure was detected on, when the variant tracks one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Read(
                ReadError::LineTooLong { line, .. }
                | ReadError::BlockTooLarge { line, .. }
                | ReadError::InvalidUtf8 { line },
            )
            | Error::Parse(
                ParseError::UnterminatedQuote { line, .. }
                | ParseError::OrphanSequence { line }
                | ParseError::UnexpectedScalar { line },
            ) => Some(*line),
            Error::Read(ReadError::ScanOutOfRange { .. } | ReadError::Io { .. }) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Read(ReadError::Io { source })
    }
}
