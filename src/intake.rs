//! File intake: read local paths into [`RawFile`]s with a sniffed MIME type.
//!
//! The type is taken from the content first (`%PDF` magic, then the image
//! signatures the `image` crate knows) and only falls back to the file
//! extension when the bytes are not recognised. Whether a file is accepted
//! is decided later by the pipeline, not here.

use crate::assemble::PDF_MIME;
use crate::error::NolimitError;
use crate::record::RawFile;
use std::path::{Path, PathBuf};
use tracing::debug;

/// MIME type used when neither content nor extension is recognised.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// Read one file from disk.
pub async fn read_file(path: impl AsRef<Path>) -> Result<RawFile, NolimitError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => NolimitError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => NolimitError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let mime = sniff_mime(&bytes, path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    debug!("Read {} ({} bytes, {})", path.display(), bytes.len(), mime);
    Ok(RawFile::new(name, mime, bytes))
}

/// Read several files, preserving the given order. Stops at the first
/// unreadable path.
pub async fn read_files(paths: &[PathBuf]) -> Result<Vec<RawFile>, NolimitError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(read_file(path).await?);
    }
    Ok(files)
}

/// Best-effort MIME type for `bytes` named `path`.
pub fn sniff_mime(bytes: &[u8], path: &Path) -> String {
    if bytes.starts_with(b"%PDF") {
        return PDF_MIME.to_string();
    }
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    mime_from_extension(path).to_string()
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_MIME,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => UNKNOWN_MIME,
    }
}
