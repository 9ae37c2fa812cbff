//! Configuration for document assembly and preview rendering.
//!
//! All behaviour is controlled through [`AssemblyConfig`], built via its
//! [`AssemblyConfigBuilder`]. One struct shared by both pipelines keeps the
//! page geometry, encoder settings and preview size in a single place.

use crate::assemble::layout::PageGeometry;
use crate::error::NolimitError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for image conversion, PDF merge and previews.
///
/// # Example
/// ```rust
/// use nolimitpdf::AssemblyConfig;
///
/// let config = AssemblyConfig::builder()
///     .jpeg_quality(85)
///     .decode_concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 85);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Output page geometry for image conversion. Default: A4 portrait (210 × 297 mm).
    pub page: PageGeometry,

    /// JPEG quality used when re-encoding non-PNG images. Range 1–100. Default: 92.
    pub jpeg_quality: u8,

    /// Flate-compress content and image streams on output. Default: true.
    pub compress: bool,

    /// How many images may be decoded ahead of page placement. Default: 4.
    ///
    /// Pages are still placed strictly in collection order; this only lets
    /// the next few decodes overlap with the current one.
    pub decode_concurrency: usize,

    /// Scale factor applied to the first PDF page for previews. Range 0.05–2.0. Default: 0.35.
    pub thumbnail_scale: f32,

    /// Longest edge, in pixels, of an image preview. Default: 512.
    pub thumbnail_max_edge: u32,

    /// Path to a pdfium shared library. Falls back to `PDFIUM_LIB_PATH`, then the system library.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            page: PageGeometry::default(),
            jpeg_quality: 92,
            compress: true,
            decode_concurrency: 4,
            thumbnail_scale: 0.35,
            thumbnail_max_edge: 512,
            pdfium_lib_path: None,
        }
    }
}

impl AssemblyConfig {
    /// Create a new builder for `AssemblyConfig`.
    pub fn builder() -> AssemblyConfigBuilder {
        AssemblyConfigBuilder {
            config: Self::default(),
        }
    }

    /// Explicit pdfium path, or the one named by `PDFIUM_LIB_PATH`.
    pub fn resolved_pdfium_path(&self) -> Option<PathBuf> {
        self.pdfium_lib_path.clone().or_else(|| {
            std::env::var_os("PDFIUM_LIB_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
    }
}

/// Builder for [`AssemblyConfig`].
#[derive(Debug)]
pub struct AssemblyConfigBuilder {
    config: AssemblyConfig,
}

impl AssemblyConfigBuilder {
    pub fn page(mut self, page: PageGeometry) -> Self {
        self.config.page = page;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q;
        self
    }

    pub fn compress(mut self, v: bool) -> Self {
        self.config.compress = v;
        self
    }

    pub fn decode_concurrency(mut self, n: usize) -> Self {
        self.config.decode_concurrency = n;
        self
    }

    pub fn thumbnail_scale(mut self, s: f32) -> Self {
        self.config.thumbnail_scale = s;
        self
    }

    pub fn thumbnail_max_edge(mut self, px: u32) -> Self {
        self.config.thumbnail_max_edge = px.max(16);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AssemblyConfig, NolimitError> {
        let c = &self.config;
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(NolimitError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.decode_concurrency == 0 {
            return Err(NolimitError::InvalidConfig(
                "Decode concurrency must be ≥ 1".into(),
            ));
        }
        if !(0.05..=2.0).contains(&c.thumbnail_scale) {
            return Err(NolimitError::InvalidConfig(format!(
                "Thumbnail scale must be 0.05–2.0, got {}",
                c.thumbnail_scale
            )));
        }
        if !(c.page.width_mm > 0.0 && c.page.height_mm > 0.0) {
            return Err(NolimitError::InvalidConfig(format!(
                "Page size must be positive, got {} × {} mm",
                c.page.width_mm, c.page.height_mm
            )));
        }
        Ok(self.config)
    }
}
