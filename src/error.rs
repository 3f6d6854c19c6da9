//! Error types for epub-model operations.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while opening a book or reading its components.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A document required to build the model is missing an element the
    /// pipeline depends on (rootfile, manifest, spine, metadata).
    #[error("Invalid EPUB structure: {0}")]
    Structural(String),

    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),

    #[error("Failed to read archive entry {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Reading {name} timed out after {after:?}")]
    Timeout { name: String, after: Duration },
}

impl Error {
    pub(crate) fn read(name: impl Into<String>, source: io::Error) -> Self {
        Error::Read {
            name: name.into(),
            source,
        }
    }

    /// True for failures caused by the book's structure rather than by I/O.
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Structural(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
