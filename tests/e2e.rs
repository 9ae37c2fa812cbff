//! End-to-end tests: files on disk → pipeline → PDF on disk.
//!
//! Inputs are generated on the fly (lopdf for PDFs, `image` for pictures),
//! so no fixtures or pdfium library are needed.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use nolimitpdf::{
    images_to_pdf, merge_pdfs, write_document, AssemblyConfig, ConvertOutcome, DirectorySink,
    EditOutcome, NolimitError, Pipeline, RawFile, RecordingNotifier, ValidationError,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn uncompressed() -> AssemblyConfig {
    AssemblyConfig::builder().compress(false).build().unwrap()
}

/// A PDF with one page per label; each page shows its label.
fn labelled_pdf(labels: &[String]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let mut kids = Vec::new();
    for label in labels {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(label.as_str())]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
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
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn image_bytes(w: u32, h: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 40, 40])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn page_texts(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned())
        .collect()
}

/// `cm` operands of every page, in page order.
fn page_matrices(bytes: &[u8]) -> Vec<[f32; 6]> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            let content = doc.get_and_decode_page_content(id).unwrap();
            let cm = content
                .operations
                .iter()
                .find(|op| op.operator == "cm")
                .expect("page draws its image with cm");
            let mut m = [0f32; 6];
            for (slot, operand) in m.iter_mut().zip(&cm.operands) {
                *slot = operand.as_float().unwrap();
            }
            m
        })
        .collect()
}

// ── Merge ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_keeps_file_then_page_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut inputs = Vec::new();
    for (name, pages) in [("a", 3), ("b", 1), ("c", 2)] {
        let labels: Vec<String> = (1..=pages).map(|p| format!("{name}{p}")).collect();
        inputs.push(write(dir.path(), &format!("{name}.pdf"), &labelled_pdf(&labels)));
    }

    let doc = assert_ok!(merge_pdfs(&inputs, &uncompressed()).await);
    assert_eq!(doc.page_count, 6);
    assert_eq!(doc.filename, "merged.pdf");

    let texts = page_texts(&doc.bytes);
    let expected = ["a1", "a2", "a3", "b1", "c1", "c2"];
    assert_eq!(texts.len(), expected.len());
    for (text, label) in texts.iter().zip(expected) {
        assert!(text.contains(label), "expected {label} in {text}");
    }
}

#[tokio::test]
async fn single_file_merge_is_refused_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "only.pdf", &labelled_pdf(&["x".into()]));
    let out_dir = dir.path().join("out");

    let err = assert_err!(merge_pdfs(&[input.clone()], &uncompressed()).await);
    assert!(matches!(
        err,
        NolimitError::Validation(ValidationError::TooFewFiles { required: 2, actual: 1 })
    ));

    let notifier = Arc::new(RecordingNotifier::new());
    let pipeline = Pipeline::pdf_merge(uncompressed(), DirectorySink::new(&out_dir))
        .with_notifier(notifier.clone());
    pipeline.add_files([nolimitpdf::intake::read_file(&input).await.unwrap()]);
    let outcome = pipeline.convert().await;
    assert!(matches!(outcome, ConvertOutcome::Invalid(_)));
    assert_eq!(notifier.keys(), vec!["toastErrorMergeMinFiles"]);
    assert_eq!(pipeline.len(), 1);
    assert!(!out_dir.join("merged.pdf").exists());
}

// ── Image conversion ─────────────────────────────────────────────────────────

#[tokio::test]
async fn images_are_fit_and_centred_on_a4() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![
        write(dir.path(), "wide.jpg", &image_bytes(800, 600, ImageFormat::Jpeg)),
        write(dir.path(), "tall.png", &image_bytes(600, 800, ImageFormat::Png)),
    ];

    let doc = assert_ok!(images_to_pdf(&inputs, &uncompressed()).await);
    assert_eq!(doc.page_count, 2);
    assert_eq!(doc.filename, "converted.pdf");

    let pt = 72.0f32 / 25.4;
    let (page_w, page_h) = (210.0 * pt, 297.0 * pt);
    let m = page_matrices(&doc.bytes);

    // 800 × 600: width-bound, full page width, centred vertically.
    let scale = (210.0f32 / 800.0).min(297.0 / 600.0);
    let h = 600.0 * scale * pt;
    assert!((m[0][0] - page_w).abs() < 0.05);
    assert!((m[0][3] - h).abs() < 0.05);
    assert!(m[0][4].abs() < 0.05);
    assert!((m[0][5] - (page_h - h) / 2.0).abs() < 0.05);

    // 600 × 800: width-bound as well on A4, centred vertically.
    let scale = (210.0f32 / 600.0).min(297.0 / 800.0);
    let (w, h) = (600.0 * scale * pt, 800.0 * scale * pt);
    assert!((m[1][0] - w).abs() < 0.05);
    assert!((m[1][3] - h).abs() < 0.05);
    assert!((m[1][4] - (page_w - w) / 2.0).abs() < 0.05);
    assert!((m[1][5] - (page_h - h) / 2.0).abs() < 0.05);
}

#[tokio::test]
async fn undecodable_image_aborts_the_whole_build() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let notifier = Arc::new(RecordingNotifier::new());
    let pipeline = Pipeline::image_to_pdf(uncompressed(), DirectorySink::new(&out_dir))
        .with_notifier(notifier.clone());

    let report = pipeline.add_files([
        RawFile::new("a.png", "image/png", image_bytes(4, 4, ImageFormat::Png)),
        RawFile::new("broken.png", "image/png", b"definitely not a png".to_vec()),
        RawFile::new("c.png", "image/png", image_bytes(4, 4, ImageFormat::Png)),
    ]);
    assert_eq!(report.accepted.len(), 3);

    let outcome = pipeline.convert().await;
    match outcome {
        ConvertOutcome::Failed(NolimitError::Assembly(e)) => {
            assert!(e.is_decode());
            assert!(e.to_string().contains("broken.png"));
        }
        other => panic!("expected a decode failure, got {other:?}"),
    }
    assert_eq!(notifier.keys(), vec!["toastErrorPdfConversion"]);
    assert!(!out_dir.join("converted.pdf").exists());
    assert_eq!(pipeline.len(), 3, "collection is kept for a retry");
    assert_eq!(pipeline.assembler().ledger().live(), 0);
}

#[tokio::test]
async fn pipeline_saves_converted_pdf_and_clears() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = Arc::new(RecordingNotifier::new());
    let pipeline = Pipeline::image_to_pdf(AssemblyConfig::default(), DirectorySink::new(dir.path()))
        .with_notifier(notifier.clone());

    let report = pipeline.add_files([
        RawFile::new("one.png", "image/png", image_bytes(10, 20, ImageFormat::Png)),
        RawFile::new("notes.pdf", "application/pdf", labelled_pdf(&["n".into()])),
        RawFile::new("two.jpg", "image/jpeg", image_bytes(20, 10, ImageFormat::Jpeg)),
    ]);
    assert_eq!(report.accepted.len(), 2);
    assert_eq!(report.rejected, 1);

    let ids = pipeline.ids();
    assert_eq!(pipeline.reorder(ids[1], ids[0]), EditOutcome::Applied);

    let outcome = pipeline.convert().await;
    let ConvertOutcome::Saved { path, page_count } = outcome else {
        panic!("expected a saved document, got {outcome:?}");
    };
    assert_eq!(path, dir.path().join("converted.pdf"));
    assert_eq!(page_count, 2);
    assert!(pipeline.is_empty());
    assert!(pipeline.cache().is_empty());
    assert_eq!(
        notifier.keys(),
        vec!["toastWarnTypeImage", "toastSuccessPdfConversion"]
    );

    let written = std::fs::read(&path).unwrap();
    let doc = Document::load_mem(&written).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}

#[tokio::test]
async fn write_document_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![write(dir.path(), "p.png", &image_bytes(5, 5, ImageFormat::Png))];
    let doc = assert_ok!(images_to_pdf(&inputs, &AssemblyConfig::default()).await);

    let target = dir.path().join("converted.pdf");
    std::fs::write(&target, b"stale").unwrap();
    assert_ok!(write_document(&doc, &target).await);
    assert_eq!(std::fs::read(&target).unwrap(), doc.bytes);
}

// ── Previews ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn previews_survive_reorder_without_rerendering() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::image_to_pdf(AssemblyConfig::default(), DirectorySink::new(dir.path()));
    let report = pipeline.add_files([
        RawFile::new("a.png", "image/png", image_bytes(30, 20, ImageFormat::Png)),
        RawFile::new("b.png", "image/png", image_bytes(20, 30, ImageFormat::Png)),
    ]);
    let (a, b) = (report.accepted[0], report.accepted[1]);

    for id in [a, b] {
        let thumb = pipeline.thumbnail(id).await.unwrap().unwrap();
        assert_eq!(thumb.id(), id);
    }
    assert_eq!(pipeline.cache().render_count(), 2);

    assert_eq!(pipeline.reorder(b, a), EditOutcome::Applied);
    assert_eq!(pipeline.ids(), vec![b, a]);
    for id in [a, b] {
        assert!(pipeline.thumbnail(id).await.unwrap().is_ok());
    }
    assert_eq!(pipeline.cache().render_count(), 2);
}

#[tokio::test]
async fn removed_then_readded_file_renders_again() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::image_to_pdf(AssemblyConfig::default(), DirectorySink::new(dir.path()));
    let file = RawFile::new("a.png", "image/png", image_bytes(16, 16, ImageFormat::Png));

    let first = pipeline.add_files([file.clone()]).accepted[0];
    let thumb = pipeline.thumbnail(first).await.unwrap().unwrap();
    assert_eq!(pipeline.cache().ledger().live(), 1);

    assert_eq!(pipeline.remove(first), EditOutcome::Applied);
    assert!(thumb.is_released());
    assert_eq!(pipeline.cache().ledger().live(), 0);
    assert!(pipeline.thumbnail(first).await.is_none());

    let second = pipeline.add_files([file]).accepted[0];
    assert_ne!(first, second);
    assert!(pipeline.thumbnail(second).await.unwrap().is_ok());
    assert_eq!(pipeline.cache().render_count(), 2);
    assert_eq!(pipeline.cache().ledger().live(), 1);

    pipeline.reset();
    assert_eq!(pipeline.cache().ledger().live(), 0);
}
