//! Output sinks: where a finished document is offered to the user.

use crate::assemble::AssembledDocument;
use crate::convert::write_document;
use crate::error::NolimitError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Accepts a finished document under its suggested file name.
pub trait OutputSink: Send + Sync {
    /// Persist or offer `doc`. Returns where it ended up.
    fn save(
        &self,
        doc: &AssembledDocument,
    ) -> impl Future<Output = Result<PathBuf, NolimitError>> + Send;
}

/// Writes documents into a directory.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for DirectorySink {
    async fn save(&self, doc: &AssembledDocument) -> Result<PathBuf, NolimitError> {
        let path = self.dir.join(doc.filename);
        write_document(doc, &path).await?;
        info!("Saved {} ({} bytes)", path.display(), doc.bytes.len());
        Ok(path)
    }
}

/// Keeps saved documents in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<AssembledDocument>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<AssembledDocument> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OutputSink for MemorySink {
    async fn save(&self, doc: &AssembledDocument) -> Result<PathBuf, NolimitError> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(doc.clone());
        Ok(PathBuf::from(doc.filename))
    }
}
