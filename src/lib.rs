//! # nolimitpdf
//!
//! Turn images into a PDF and merge PDFs into one, with reorderable file
//! lists and cached previews. Everything runs locally; no file ever leaves
//! the process.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Intake    sniff MIME type, reject what the feature does not accept
//!  ├─ 2. Collect   ordered, reorderable list of identified records
//!  ├─ 3. Preview   one cached thumbnail per record (pdfium / image)
//!  ├─ 4. Assemble  image → A4 page, or PDF pages → one document (lopdf)
//!  └─ 5. Output    converted.pdf / merged.pdf, then clear the list
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nolimitpdf::{merge_pdfs, write_document, AssemblyConfig};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let inputs = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
//!     let doc = merge_pdfs(&inputs, &AssemblyConfig::default()).await?;
//!     write_document(&doc, doc.filename).await?;
//!     eprintln!("{} pages", doc.page_count);
//!     Ok(())
//! }
//! ```
//!
//! For the interactive flow (add, reorder, preview, build, clear) use
//! [`Pipeline`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `nolimitpdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! nolimitpdf = { version = "0.3", default-features = false }
//! ```
//!
//! Previews of PDFs need the pdfium shared library at runtime. Set
//! `PDFIUM_LIB_PATH` or install it system-wide; image previews and all
//! document assembly work without it.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod collection;
pub mod config;
pub mod convert;
pub mod error;
pub mod i18n;
pub mod intake;
pub mod notify;
pub mod orchestrator;
pub mod output;
pub mod prefs;
pub mod progress;
pub mod record;
pub mod resource;
pub mod thumbnail;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::{
    AssembledDocument, Assembler, Feature, ImagePdfAssembler, PdfMergeAssembler, PDF_MIME,
};
pub use assemble::layout::{PageGeometry, Placement};
pub use collection::OrderedCollection;
pub use config::{AssemblyConfig, AssemblyConfigBuilder};
pub use convert::{images_to_pdf, merge_pdfs, write_document};
pub use error::{AssemblyError, NolimitError, ThumbnailError, ValidationError};
pub use i18n::Language;
pub use notify::{Level, Notification, Notifier, RecordingNotifier};
pub use orchestrator::{AddReport, ConvertOutcome, EditOutcome, Phase, Pipeline};
pub use output::{DirectorySink, MemorySink, OutputSink};
pub use prefs::{Preferences, Theme};
pub use progress::{AssemblyProgress, NoopProgress, ProgressHandle};
pub use record::{FileId, FileRecord, RawFile};
pub use resource::{HandleLedger, ResourceHandle};
pub use thumbnail::{Thumbnail, ThumbnailCache, ThumbnailRenderer};
