//! One-shot entry points: files on disk in, one assembled PDF out.
//!
//! These skip the interactive [`Pipeline`](crate::orchestrator::Pipeline)
//! (no previews, no notifications, no busy flag) and are what library users
//! usually want. Validation and assembly failures surface as
//! [`NolimitError`].

use crate::assemble::{AssembledDocument, Assembler, ImagePdfAssembler, PdfMergeAssembler};
use crate::config::AssemblyConfig;
use crate::error::{NolimitError, ValidationError};
use crate::intake;
use crate::progress::ProgressHandle;
use crate::record::FileRecord;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Convert images to a single PDF, one page per image, in the given order.
///
/// # Example
/// ```rust,no_run
/// use nolimitpdf::{images_to_pdf, AssemblyConfig};
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let inputs = vec![PathBuf::from("scan-1.jpg"), PathBuf::from("scan-2.png")];
///     let doc = images_to_pdf(&inputs, &AssemblyConfig::default()).await?;
///     std::fs::write(doc.filename, &doc.bytes)?;
///     Ok(())
/// }
/// ```
pub async fn images_to_pdf(
    inputs: &[PathBuf],
    config: &AssemblyConfig,
) -> Result<AssembledDocument, NolimitError> {
    let assembler = ImagePdfAssembler::new(config.clone());
    run(&assembler, inputs, &crate::progress::noop()).await
}

/// Merge PDFs into one, keeping every page of every input in order.
pub async fn merge_pdfs(
    inputs: &[PathBuf],
    config: &AssemblyConfig,
) -> Result<AssembledDocument, NolimitError> {
    let assembler = PdfMergeAssembler::new(config.clone());
    run(&assembler, inputs, &crate::progress::noop()).await
}

/// Read, validate and assemble with any assembler.
pub async fn run<A: Assembler>(
    assembler: &A,
    inputs: &[PathBuf],
    progress: &ProgressHandle,
) -> Result<AssembledDocument, NolimitError> {
    let feature = assembler.feature();
    let (files, rejected): (Vec<_>, Vec<_>) = intake::read_files(inputs)
        .await?
        .into_iter()
        .partition(|f| feature.accepts(f));

    if let Some(first) = rejected.first() {
        let skipped = ValidationError::UnsupportedType {
            rejected: rejected.len(),
            expected: feature.accepted_label(),
            first: first.name().to_string(),
        };
        warn!("Skipping input: {}", skipped);
    }
    feature.check_count(files.len())?;

    let records: Vec<FileRecord> = files.into_iter().map(FileRecord::new).collect();
    let doc = assembler.assemble(&records, progress).await?;
    info!(
        "{:?}: {} input(s) → {} page(s)",
        feature,
        records.len(),
        doc.page_count
    );
    Ok(doc)
}

/// Write a finished document to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_document(doc: &AssembledDocument, path: impl AsRef<Path>) -> Result<(), NolimitError> {
    let path = path.as_ref();
    let write_failed = |source: std::io::Error| NolimitError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &doc.bytes)
        .await
        .map_err(write_failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    #[tokio::test]
    async fn wrong_type_files_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let notes = tmp.path().join("notes.txt");
        std::fs::write(&notes, b"hello").unwrap();
        let inputs = vec![
            write_png(tmp.path(), "a.png"),
            notes,
            write_png(tmp.path(), "b.png"),
        ];

        let doc = images_to_pdf(&inputs, &AssemblyConfig::default()).await.unwrap();
        assert_eq!(doc.page_count, 2);
    }

    #[tokio::test]
    async fn only_wrong_type_files_is_too_few() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let err = merge_pdfs(&[path.clone(), path], &AssemblyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NolimitError::Validation(ValidationError::TooFewFiles { required: 2, actual: 0 })
        ));
    }

    #[tokio::test]
    async fn no_images_is_too_few() {
        let err = images_to_pdf(&[], &AssemblyConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            NolimitError::Validation(ValidationError::TooFewFiles { required: 1, actual: 0 })
        ));
    }

    #[tokio::test]
    async fn write_document_is_atomic() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = AssembledDocument {
            bytes: b"%PDF-1.5".to_vec(),
            page_count: 0,
            filename: "converted.pdf",
        };
        let path = tmp.path().join("sub").join("out.pdf");
        write_document(&doc, &path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5");
        assert!(!path.with_extension("pdf.tmp").exists());
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = AssembledDocument {
            bytes: b"%PDF-1.5".to_vec(),
            page_count: 0,
            filename: "converted.pdf",
        };
        // A non-empty directory cannot be replaced by a file.
        let path = tmp.path().join("out.pdf");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let err = write_document(&doc, &path).await.unwrap_err();
        assert!(matches!(err, NolimitError::OutputWriteFailed { .. }));
        assert!(!path.with_extension("pdf.tmp").exists());
        assert!(path.join("keep").exists());
    }
}
