//! Loading a flattened configuration from a file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::config::FlatConfig;
use crate::error::Error;
use crate::options::ParseOptions;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("configuration file {} was not found", .path.display())]
    #[diagnostic(
        code(yaml_flat::source::not_found),
        help("create the file, or mark the source as optional")
    )]
    NotFound { path: PathBuf },

    #[error("failed to open {}: {source}", .path.display())]
    #[diagnostic(code(yaml_flat::source::io))]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to load {}", .path.display())]
    #[diagnostic(code(yaml_flat::source::load))]
    Load {
        path: PathBuf,
        #[source]
        #[diagnostic_source]
        source: Error,
    },
}

/// Something a host configuration system can pull flattened entries from.
pub trait ConfigSource {
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or is not a valid document.
    fn load(&self) -> Result<FlatConfig, SourceError>;
}

/// A YAML file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
    /// A missing file yields an empty configuration instead of an error.
    pub optional: bool,
    pub options: ParseOptions,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            optional: false,
            options: ParseOptions::default(),
        }
    }

    #[must_use]
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SourceError {
        SourceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ConfigSource for FileSource {
    #[tracing::instrument(skip_all, fields(path = %self.path.display(), optional = self.optional))]
    fn load(&self) -> Result<FlatConfig, SourceError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.optional => {
                tracing::debug!("optional configuration file is missing");
                return Ok(FlatConfig::new());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let start = skip_bom(&mut file).map_err(|e| self.io_error(e))?;
        file.seek(SeekFrom::Start(start))
            .map_err(|e| self.io_error(e))?;

        let config = crate::parse_seekable(file, &self.options).map_err(|source| {
            SourceError::Load {
                path: self.path.clone(),
                source,
            }
        })?;
        tracing::info!(entries = config.len(), "loaded configuration file");
        Ok(config)
    }
}

/// Offset of the document content: past a UTF-8 byte-order mark if present.
fn skip_bom(file: &mut impl Read) -> io::Result<u64> {
    let mut head = [0; 3];
    match file.read_exact(&mut head) {
        Ok(()) if head == UTF8_BOM => Ok(3),
        Ok(()) => Ok(0),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
        Err(e) => Err(e),
    }
}
