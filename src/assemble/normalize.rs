//! Image normalisation: arbitrary decodable image → PDF-embeddable raster.
//!
//! PDF natively embeds only a few encodings. Rather than passing the input
//! through, every image is decoded and re-encoded:
//!
//! * PNG input stays lossless: raw RGB samples plus, when the source has an
//!   alpha channel, a separate 8-bit soft mask so transparency survives.
//! * Anything else (JPEG, WEBP, GIF, BMP, …) is flattened onto an opaque
//!   white background and re-encoded as baseline JPEG (`DCTDecode`).

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use tracing::debug;

/// MIME type that selects the lossless path.
pub const LOSSLESS_MIME: &str = "image/png";

/// Encoded pixel data ready to become an image XObject.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedImage {
    /// Baseline JPEG bytes, embedded with `/DCTDecode`.
    Jpeg(Vec<u8>),
    /// 8-bit RGB samples and an optional 8-bit alpha plane.
    Lossless { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

/// A decoded and re-encoded image with its intrinsic pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pub width: u32,
    pub height: u32,
    pub data: EncodedImage,
}

/// Whether `mime` selects lossless re-encoding.
pub fn is_lossless(mime: &str) -> bool {
    mime.eq_ignore_ascii_case(LOSSLESS_MIME)
}

/// Decode `bytes` and normalise according to `mime`.
pub fn normalize(
    bytes: &[u8],
    mime: &str,
    jpeg_quality: u8,
) -> Result<NormalizedImage, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = (img.width(), img.height());

    let data = if is_lossless(mime) {
        encode_lossless(&img)
    } else {
        EncodedImage::Jpeg(encode_jpeg(&flatten_on_white(&img), jpeg_quality)?)
    };

    debug!("Normalised {}x{} {} image", width, height, mime);
    Ok(NormalizedImage {
        width,
        height,
        data,
    })
}

fn encode_lossless(img: &DynamicImage) -> EncodedImage {
    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let mut rgb = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
        let mut alpha = Vec::with_capacity(rgba.as_raw().len() / 4);
        for px in rgba.pixels() {
            rgb.extend_from_slice(&px.0[..3]);
            alpha.push(px.0[3]);
        }
        EncodedImage::Lossless {
            rgb,
            alpha: Some(alpha),
        }
    } else {
        EncodedImage::Lossless {
            rgb: img.to_rgb8().into_raw(),
            alpha: None,
        }
    }
}

/// Composite onto opaque white. Images without alpha are converted as-is.
pub fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder.encode_image(rgb)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encoded(img: &DynamicImage, fmt: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), fmt).unwrap();
        buf
    }

    #[test]
    fn png_keeps_alpha_plane() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 128])));
        let n = normalize(&encoded(&img, ImageFormat::Png), "image/png", 92).unwrap();
        assert_eq!((n.width, n.height), (4, 3));
        match n.data {
            EncodedImage::Lossless { rgb, alpha } => {
                assert_eq!(rgb.len(), 4 * 3 * 3);
                assert_eq!(&rgb[..3], &[10, 20, 30]);
                let alpha = alpha.expect("alpha preserved");
                assert!(alpha.iter().all(|&a| a == 128));
            }
            other => panic!("expected lossless, got {other:?}"),
        }
    }

    #[test]
    fn opaque_png_has_no_mask() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3])));
        let n = normalize(&encoded(&img, ImageFormat::Png), "image/png", 92).unwrap();
        assert!(matches!(n.data, EncodedImage::Lossless { alpha: None, .. }));
    }

    #[test]
    fn non_png_becomes_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([200, 0, 0])));
        let n = normalize(&encoded(&img, ImageFormat::Jpeg), "image/jpeg", 92).unwrap();
        match n.data {
            EncodedImage::Jpeg(bytes) => assert_eq!(&bytes[..2], &[0xFF, 0xD8]),
            other => panic!("expected jpeg, got {other:?}"),
        }
    }

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let mut rgba = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let flat = flatten_on_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(normalize(b"definitely not an image", "image/jpeg", 92).is_err());
    }
}
