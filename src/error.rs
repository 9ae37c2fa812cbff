//! Error types for the nolimitpdf library.
//!
//! The error classes mirror how far a failure is allowed to spread:
//!
//! * [`ValidationError`] — user input rejected at the boundary (wrong file
//!   type, too few files). Surfaced as a warning; never reaches an assembler.
//!
//! * [`AssemblyError`] — a whole-collection build failed (undecodable file,
//!   unparsable PDF, serialisation failure). All-or-nothing: no partial
//!   document is ever produced, but the collection is left intact for retry.
//!
//! * [`ThumbnailError`] — a single preview could not be rendered. Isolated to
//!   that one item; it is cached as the item's error indicator and never
//!   propagates to the collection.
//!
//! * [`NolimitError`] — fatal errors returned by the library's top-level
//!   entry points (I/O, configuration, preferences).

use crate::record::FileId;
use std::path::PathBuf;
use thiserror::Error;

/// Input rejected before it entered the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more files in a batch did not match the accepted type.
    #[error("{rejected} file(s) rejected: expected {expected} (first: '{first}')")]
    UnsupportedType {
        rejected: usize,
        expected: &'static str,
        first: String,
    },

    /// The operation needs more files than the collection holds.
    #[error("At least {required} file(s) are required, got {actual}")]
    TooFewFiles { required: usize, actual: usize },
}

/// A build over the whole collection failed; no output was produced.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A single input could not be decoded as the expected format.
    #[error("File {index} ('{name}') could not be read: {detail}")]
    Decode {
        /// 1-indexed position in the snapshot being assembled.
        index: usize,
        name: String,
        detail: String,
    },

    /// Page placement or serialisation failed.
    #[error("PDF assembly failed: {detail}")]
    Pdf { detail: String },

    /// A worker task panicked or was cancelled.
    #[error("Internal assembly error: {0}")]
    Internal(String),
}

impl AssemblyError {
    /// `true` when the failure is attributable to one input file.
    pub fn is_decode(&self) -> bool {
        matches!(self, AssemblyError::Decode { .. })
    }
}

/// A preview for one record could not be produced.
///
/// `Clone` so that a failed render can be cached and handed to every caller
/// that asks for the same id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThumbnailError {
    /// The file bytes could not be interpreted.
    #[error("Preview for {id} failed: {detail}")]
    Decode { id: FileId, detail: String },

    /// The rendering backend (pdfium) is unavailable.
    #[error(
        "Preview backend unavailable: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    Backend(String),

    /// The record was removed while its preview was being rendered.
    #[error("Preview for {id} discarded: record was removed")]
    Evicted { id: FileId },

    /// Unsupported MIME type for previews.
    #[error("No preview renderer for '{mime}'")]
    Unsupported { mime: String },

    #[error("Internal preview error: {0}")]
    Internal(String),
}

/// All fatal errors returned by the nolimitpdf library.
#[derive(Debug, Error)]
pub enum NolimitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Preferences file could not be read or written.
    #[error("Preferences error at '{path}': {detail}")]
    Preferences { path: PathBuf, detail: String },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_files_display() {
        let e = ValidationError::TooFewFiles {
            required: 2,
            actual: 1,
        };
        let msg = e.to_string();
        assert!(msg.contains("2"), "got: {msg}");
        assert!(msg.contains("got 1"), "got: {msg}");
    }

    #[test]
    fn decode_error_display_names_file() {
        let e = AssemblyError::Decode {
            index: 2,
            name: "broken.jpg".into(),
            detail: "invalid marker".into(),
        };
        assert!(e.is_decode());
        assert!(e.to_string().contains("broken.jpg"));
        assert!(e.to_string().contains("File 2"));
    }

    #[test]
    fn validation_converts_into_fatal() {
        let e: NolimitError = ValidationError::TooFewFiles {
            required: 2,
            actual: 0,
        }
        .into();
        assert!(matches!(e, NolimitError::Validation(_)));
    }

    #[test]
    fn backend_error_has_hint() {
        let e = ThumbnailError::Backend("not found".into());
        assert!(e.to_string().contains("PDFIUM_LIB_PATH"));
    }
}
