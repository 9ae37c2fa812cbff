//! Image → PDF: one fixed-size page per image, fit-to-page and centred.
//!
//! Decoding is CPU-bound and runs on the blocking pool. Up to
//! `decode_concurrency` decodes may be in flight, but results are consumed
//! strictly in input order (`buffered`, not `buffer_unordered`), so page `n`
//! always shows record `n`.

use super::layout::{PageGeometry, Placement};
use super::normalize::{self, EncodedImage, NormalizedImage};
use super::{finish_document, pdf_error, AssembledDocument, Assembler, Feature};
use crate::config::AssemblyConfig;
use crate::error::AssemblyError;
use crate::progress::ProgressHandle;
use crate::record::{FileId, FileRecord, RawFile};
use crate::resource::HandleLedger;
use futures::stream::{self, StreamExt};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Name under which each page references its image.
const IMAGE_RESOURCE: &str = "Im0";

/// Builds `converted.pdf` from an ordered list of image records.
pub struct ImagePdfAssembler {
    config: AssemblyConfig,
    ledger: Arc<HandleLedger>,
}

impl ImagePdfAssembler {
    pub fn new(config: AssemblyConfig) -> Self {
        Self {
            config,
            ledger: HandleLedger::new(),
        }
    }

    /// Ledger of the transient per-record read handles.
    pub fn ledger(&self) -> &Arc<HandleLedger> {
        &self.ledger
    }

    async fn build(
        &self,
        records: &[FileRecord],
        progress: &ProgressHandle,
    ) -> Result<AssembledDocument, AssemblyError> {
        let total = records.len();
        if total == 0 {
            return Err(AssemblyError::Pdf {
                detail: "no images to assemble".into(),
            });
        }
        let start = Instant::now();
        let quality = self.config.jpeg_quality;

        let jobs: Vec<(usize, FileId, RawFile, String)> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (i + 1, r.id(), r.file().clone(), r.display_name().to_string()))
            .collect();
        let ledger = Arc::clone(&self.ledger);
        let cb = Arc::clone(progress);
        // Set on the first failure; queued decodes that have not started yet are skipped.
        let aborted = Arc::new(AtomicBool::new(false));
        let skip = Arc::clone(&aborted);

        let decodes = stream::iter(jobs.into_iter().map(move |(index, id, file, name)| {
            let ledger = Arc::clone(&ledger);
            let skip = Arc::clone(&skip);
            if !skip.load(Ordering::SeqCst) {
                cb.on_record_start(index, total, &name);
            }
            async move {
                if skip.load(Ordering::SeqCst) {
                    return Err(AssemblyError::Internal(format!("Decode of '{name}' skipped")));
                }
                let joined = tokio::task::spawn_blocking(move || {
                    let handle = ledger.acquire(id);
                    let out = normalize::normalize(file.bytes(), file.mime_type(), quality);
                    handle.release();
                    out
                })
                .await;
                match joined {
                    Ok(Ok(image)) => Ok(image),
                    Ok(Err(e)) => Err(AssemblyError::Decode {
                        index,
                        name,
                        detail: e.to_string(),
                    }),
                    Err(e) => Err(AssemblyError::Internal(format!("Decode task failed: {e}"))),
                }
            }
        }))
        .buffered(self.config.decode_concurrency);
        let mut decodes = std::pin::pin!(decodes);

        let mut doc = ImageDocument::new(self.config.page);
        let mut index = 0;
        while let Some(decoded) = decodes.next().await {
            index += 1;
            let placed = decoded.and_then(|image| doc.add_page(&image).map(|()| image));
            match placed {
                Ok(image) => {
                    debug!("Placed image {}/{} ({}x{})", index, total, image.width, image.height);
                    progress.on_record_complete(index, total);
                }
                Err(e) => {
                    // Decodes already on the blocking pool hold read handles;
                    // wait for them so every handle is released before returning.
                    aborted.store(true, Ordering::SeqCst);
                    while decodes.next().await.is_some() {}
                    return Err(e);
                }
            }
        }

        let page_count = doc.page_count();
        let bytes = doc.finish(self.config.compress)?;
        info!(
            "Assembled {} image pages ({} bytes) in {}ms",
            page_count,
            bytes.len(),
            start.elapsed().as_millis()
        );

        Ok(AssembledDocument {
            bytes,
            page_count,
            filename: Feature::ImageToPdf.default_filename(),
        })
    }
}

impl Assembler for ImagePdfAssembler {
    fn feature(&self) -> Feature {
        Feature::ImageToPdf
    }

    async fn assemble(
        &self,
        records: &[FileRecord],
        progress: &ProgressHandle,
    ) -> Result<AssembledDocument, AssemblyError> {
        progress.on_assembly_start(records.len());
        let result = self.build(records, progress).await;
        progress.on_assembly_complete(records.len(), result.is_ok());
        result
    }
}

/// Output document under construction.
struct ImageDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    page: PageGeometry,
}

impl ImageDocument {
    fn new(page: PageGeometry) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            page,
        }
    }

    fn page_count(&self) -> usize {
        self.kids.len()
    }

    fn add_page(&mut self, image: &NormalizedImage) -> Result<(), AssemblyError> {
        let image_id = self.add_image(image);
        let placement = Placement::fit(self.page, image.width, image.height);
        let matrix: Vec<Object> = placement
            .to_matrix_pt()
            .into_iter()
            .map(Object::from)
            .collect();

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("cm", matrix),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode().map_err(pdf_error)?));

        let media_box: Vec<Object> = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::from(self.page.width_pt()),
            Object::from(self.page.height_pt()),
        ];
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => media_box,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    IMAGE_RESOURCE => image_id,
                },
            },
        });
        self.kids.push(page_id);
        Ok(())
    }

    fn add_image(&mut self, image: &NormalizedImage) -> ObjectId {
        let width = i64::from(image.width);
        let height = i64::from(image.height);
        match &image.data {
            EncodedImage::Jpeg(bytes) => {
                let dict = dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                };
                // Already compressed; Flate on top only adds overhead.
                self.doc
                    .add_object(Stream::new(dict, bytes.clone()).with_compression(false))
            }
            EncodedImage::Lossless { rgb, alpha } => {
                let mut dict = dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                };
                if let Some(alpha) = alpha {
                    let mask_id = self.doc.add_object(Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => width,
                            "Height" => height,
                            "ColorSpace" => "DeviceGray",
                            "BitsPerComponent" => 8,
                        },
                        alpha.clone(),
                    ));
                    dict.set("SMask", mask_id);
                }
                self.doc.add_object(Stream::new(dict, rgb.clone()))
            }
        }
    }

    fn finish(self, compress: bool) -> Result<Vec<u8>, AssemblyError> {
        finish_document(self.doc, self.pages_id, self.kids, compress)
    }
}
