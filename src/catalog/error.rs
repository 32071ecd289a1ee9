//! Errors raised while loading or saving catalogs.

use std::path::PathBuf;

use thiserror::Error;

use super::quote::QuoteError;
use crate::fsutil::FsError;

/// Defines errors that may occur while loading or saving catalogs
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be read
    #[error("Failed to read catalog {}: {source}", path.display())]
    Read {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The catalog file could not be written
    #[error("Failed to write catalog {}: {source}", path.display())]
    Write {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Fewer than two blank-line separated chunks
    #[error("Bad format (or perhaps CR/LF) in {}", .0.display())]
    BadFormat(PathBuf),
    /// A quoted value could not be unquoted
    #[error("Parsing chunk from {}: {source}", path.display())]
    Unquote {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: QuoteError,
    },
    /// No header pseudo-record
    #[error("File {} missing root record", .0.display())]
    MissingHeader(PathBuf),
    /// A locale catalog without a `Language:` header
    #[error("File {} missing Language: header", .0.display())]
    MissingLanguage(PathBuf),
    /// The locale directory could not be listed
    #[error("Failed to list catalogs: {0}")]
    List(#[from] FsError),
}
