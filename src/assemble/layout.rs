//! Page geometry and fit-to-page placement.
//!
//! Placement is computed in millimetres, the unit the page size is expressed
//! in, with image pixels treated as abstract units; only the final content
//! stream converts to PDF points.

use serde::{Deserialize, Serialize};

/// Points per millimetre (72 pt per inch / 25.4 mm per inch).
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// Size of an output page in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PageGeometry {
    /// ISO A4 portrait.
    pub const A4: PageGeometry = PageGeometry {
        width_mm: 210.0,
        height_mm: 297.0,
    };

    pub fn width_pt(&self) -> f32 {
        self.width_mm * PT_PER_MM
    }

    pub fn height_pt(&self) -> f32 {
        self.height_mm * PT_PER_MM
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// Where an image lands on a page, in millimetres from the lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    /// Fit an image of `img_w × img_h` entirely inside `page`, preserving
    /// aspect ratio and centring it on both axes. Never crops.
    pub fn fit(page: PageGeometry, img_w: u32, img_h: u32) -> Self {
        let (w, h) = (img_w.max(1) as f32, img_h.max(1) as f32);
        let scale = (page.width_mm / w).min(page.height_mm / h);
        let width = w * scale;
        let height = h * scale;
        Self {
            scale,
            x: (page.width_mm - width) / 2.0,
            y: (page.height_mm - height) / 2.0,
            width,
            height,
        }
    }

    /// The `cm` operands (a b c d e f) that map the unit square onto this
    /// placement, in points.
    pub fn to_matrix_pt(&self) -> [f32; 6] {
        [
            self.width * PT_PER_MM,
            0.0,
            0.0,
            self.height * PT_PER_MM,
            self.x * PT_PER_MM,
            self.y * PT_PER_MM,
        ]
    }
}
