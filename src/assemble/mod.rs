//! Document assemblers: ordered file records → one PDF byte stream.
//!
//! Each submodule implements one piece of the build:
//!
//! ```text
//! records ──▶ normalize ──▶ layout ──▶ image_pdf ──▶ bytes
//! records ─────────────────────────▶ merge ──────▶ bytes
//! ```
//!
//! 1. [`normalize`] — decode an image and re-encode it as something PDF can
//!    embed (lossless RGB + soft mask for PNG, JPEG over white otherwise)
//! 2. [`layout`]    — fixed page geometry and fit-to-page placement
//! 3. [`image_pdf`] — one page per image, in collection order
//! 4. [`merge`]     — concatenate every page of every input PDF
//!
//! Both assemblers work on a snapshot of the collection and are
//! all-or-nothing: the first unreadable input aborts the build and no bytes
//! are returned.

pub mod image_pdf;
pub mod layout;
pub mod merge;
pub mod normalize;

use crate::error::{AssemblyError, ValidationError};
use crate::progress::ProgressHandle;
use crate::record::{FileRecord, RawFile};
use lopdf::{dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::future::Future;

pub use image_pdf::ImagePdfAssembler;
pub use merge::PdfMergeAssembler;

/// MIME type of every assembled document.
pub const PDF_MIME: &str = "application/pdf";

/// The two user-facing features, with their acceptance rules and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    ImageToPdf,
    PdfMerge,
}

impl Feature {
    /// Whether a raw file is accepted into this feature's collection.
    pub fn accepts(self, file: &RawFile) -> bool {
        match self {
            Feature::ImageToPdf => file.mime_type().starts_with("image/"),
            Feature::PdfMerge => file.mime_type() == PDF_MIME,
        }
    }

    /// Human-readable accepted type, for validation messages.
    pub fn accepted_label(self) -> &'static str {
        match self {
            Feature::ImageToPdf => "image/*",
            Feature::PdfMerge => PDF_MIME,
        }
    }

    /// Minimum number of records a build needs.
    pub fn min_records(self) -> usize {
        match self {
            Feature::ImageToPdf => 1,
            Feature::PdfMerge => 2,
        }
    }

    /// File name offered for the assembled document.
    pub fn default_filename(self) -> &'static str {
        match self {
            Feature::ImageToPdf => "converted.pdf",
            Feature::PdfMerge => "merged.pdf",
        }
    }

    /// Check the collection size against [`Feature::min_records`].
    pub fn check_count(self, actual: usize) -> Result<(), ValidationError> {
        let required = self.min_records();
        if actual < required {
            return Err(ValidationError::TooFewFiles { required, actual });
        }
        Ok(())
    }

    /// Message keys used for this feature's notifications.
    pub fn messages(self) -> FeatureMessages {
        match self {
            Feature::ImageToPdf => FeatureMessages {
                wrong_type: "toastWarnTypeImage",
                empty: "toastWarnAddImages",
                too_few: "toastWarnAddImages",
                success: "toastSuccessPdfConversion",
                failure: "toastErrorPdfConversion",
            },
            Feature::PdfMerge => FeatureMessages {
                wrong_type: "toastWarnTypePdf",
                empty: "toastWarnAddPdfs",
                too_few: "toastErrorMergeMinFiles",
                success: "toastSuccessPdfMerge",
                failure: "toastErrorMerge",
            },
        }
    }
}

/// Translation keys for a feature's user-facing notifications.
#[derive(Debug, Clone, Copy)]
pub struct FeatureMessages {
    pub wrong_type: &'static str,
    pub empty: &'static str,
    pub too_few: &'static str,
    pub success: &'static str,
    pub failure: &'static str,
}

/// A finished, serialised document.
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub filename: &'static str,
}

/// Turns an ordered snapshot of records into one PDF.
pub trait Assembler: Send + Sync {
    fn feature(&self) -> Feature;

    /// Build the document. Output page order follows `records` exactly.
    fn assemble(
        &self,
        records: &[FileRecord],
        progress: &ProgressHandle,
    ) -> impl Future<Output = Result<AssembledDocument, AssemblyError>> + Send;
}

/// Error text for a lopdf failure.
pub(crate) fn pdf_error(e: impl std::fmt::Display) -> AssemblyError {
    AssemblyError::Pdf {
        detail: e.to_string(),
    }
}

/// Write the page tree root and catalog, optionally compress, and serialise.
///
/// `pages_id` must have been reserved with `new_object_id` and every page in
/// `kids` must already point at it through `/Parent`.
pub(crate) fn finish_document(
    mut doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    compress: bool,
) -> Result<Vec<u8>, AssemblyError> {
    let count = kids.len() as i64;
    let kids: Vec<Object> = kids.into_iter().map(Object::Reference).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if compress {
        doc.compress();
    }

    let mut buf = Vec::new();
    doc.save_to(&mut buf).map_err(pdf_error)?;
    Ok(buf)
}
