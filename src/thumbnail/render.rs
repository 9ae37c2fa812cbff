//! Preview rasterisation: first PDF page via pdfium, images via `image`.
//!
//! Renderers are synchronous and CPU-bound. The cache always calls them from
//! `tokio::task::spawn_blocking`; pdfium in particular keeps thread-local
//! state and must never run on an async worker thread.

use crate::assemble::PDF_MIME;
use crate::config::AssemblyConfig;
use crate::error::ThumbnailError;
use crate::record::{FileId, RawFile};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Produces a preview raster for one file.
pub trait ThumbnailRenderer: Send + Sync {
    fn render(&self, id: FileId, file: &RawFile) -> Result<DynamicImage, ThumbnailError>;
}

/// Renders page 1 of a PDF at a fixed scale factor.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    scale: f32,
    max_edge: u32,
    lib_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            scale: config.thumbnail_scale,
            max_edge: config.thumbnail_max_edge,
            lib_path: config.resolved_pdfium_path(),
        }
    }

    fn bind(&self) -> Result<Pdfium, ThumbnailError> {
        let bindings = match &self.lib_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ThumbnailError::Backend(e.to_string()))?;
        Ok(Pdfium::new(bindings))
    }
}

impl ThumbnailRenderer for PdfiumRenderer {
    fn render(&self, id: FileId, file: &RawFile) -> Result<DynamicImage, ThumbnailError> {
        let pdfium = self.bind()?;
        let decode = |e: PdfiumError| ThumbnailError::Decode {
            id,
            detail: format!("{:?}", e),
        };

        let document = pdfium
            .load_pdf_from_byte_slice(file.bytes().as_ref(), None)
            .map_err(decode)?;
        let page = document.pages().get(0).map_err(decode)?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(self.scale);
        let bitmap = page.render_with_config(&render_config).map_err(decode)?;
        let image = cap_edge(bitmap.as_image(), self.max_edge);

        debug!(
            "Rendered preview for {} → {}x{} px",
            id,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

/// Decodes an image and downsizes it to the preview edge.
#[derive(Debug, Clone)]
pub struct ImageRenderer {
    max_edge: u32,
}

impl ImageRenderer {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            max_edge: config.thumbnail_max_edge,
        }
    }
}

impl ThumbnailRenderer for ImageRenderer {
    fn render(&self, id: FileId, file: &RawFile) -> Result<DynamicImage, ThumbnailError> {
        let image = image::load_from_memory(file.bytes()).map_err(|e| ThumbnailError::Decode {
            id,
            detail: e.to_string(),
        })?;
        Ok(cap_edge(image, self.max_edge))
    }
}

/// Routes each file to the renderer for its MIME type.
#[derive(Clone)]
pub struct MimeRenderer {
    pdf: Arc<dyn ThumbnailRenderer>,
    image: Arc<dyn ThumbnailRenderer>,
}

impl MimeRenderer {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            pdf: Arc::new(PdfiumRenderer::new(config)),
            image: Arc::new(ImageRenderer::new(config)),
        }
    }

    /// Substitute the PDF backend (tests, or hosts without pdfium).
    pub fn with_pdf_renderer(mut self, pdf: Arc<dyn ThumbnailRenderer>) -> Self {
        self.pdf = pdf;
        self
    }
}

impl ThumbnailRenderer for MimeRenderer {
    fn render(&self, id: FileId, file: &RawFile) -> Result<DynamicImage, ThumbnailError> {
        let mime = file.mime_type();
        if mime == PDF_MIME {
            self.pdf.render(id, file)
        } else if mime.starts_with("image/") {
            self.image.render(id, file)
        } else {
            Err(ThumbnailError::Unsupported {
                mime: mime.to_string(),
            })
        }
    }
}

fn cap_edge(image: DynamicImage, max_edge: u32) -> DynamicImage {
    if image.width() <= max_edge && image.height() <= max_edge {
        return image;
    }
    image.thumbnail(max_edge, max_edge)
}
