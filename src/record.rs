//! Identified file records: a raw file plus a stable session identity.
//!
//! Both pipelines (image conversion and PDF merge) work on [`FileRecord`]s.
//! A record's [`FileId`] is handed out once, at acceptance time, and is the
//! only thing equality and hashing look at: two uploads of byte-identical
//! files are still two distinct records.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of an accepted file, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(u64);

impl FileId {
    /// Allocate a fresh id. Ids are never reused within a session.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, useful for log lines and file names.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A binary blob with a MIME type, as delivered by a file picker or drop.
///
/// The byte buffer is reference counted, so cloning a `RawFile` to hand it
/// to a blocking worker is cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFile {
    name: String,
    mime_type: String,
    bytes: Bytes,
}

impl RawFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into().to_ascii_lowercase(),
            bytes: bytes.into(),
        }
    }

    /// Original file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased MIME type, possibly empty when the source did not supply one.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for RawFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A raw file wrapped with its identity and display name.
#[derive(Debug, Clone)]
pub struct FileRecord {
    id: FileId,
    file: RawFile,
    display_name: String,
}

impl FileRecord {
    /// Wrap `file` in a record with a freshly allocated id.
    /// The display name defaults to the original file name.
    pub fn new(file: RawFile) -> Self {
        let display_name = file.name().to_string();
        Self {
            id: FileId::next(),
            file,
            display_name,
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn file(&self) -> &RawFile {
        &self.file
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }
}

impl PartialEq for FileRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FileRecord {}

impl Hash for FileRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str) -> RawFile {
        RawFile::new(name, "image/png", vec![1u8, 2, 3])
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = FileId::next();
        let b = FileId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn equality_ignores_content() {
        let a = FileRecord::new(raw("a.png"));
        let b = FileRecord::new(raw("a.png"));
        assert_ne!(a, b, "same bytes, different ids");
        assert_eq!(a, a.clone());
    }

    #[test]
    fn display_name_defaults_to_file_name() {
        let mut rec = FileRecord::new(raw("holiday.png"));
        assert_eq!(rec.display_name(), "holiday.png");
        rec.rename("cover");
        assert_eq!(rec.display_name(), "cover");
        assert_eq!(rec.file().name(), "holiday.png");
    }

    #[test]
    fn mime_type_is_lowercased() {
        let f = RawFile::new("x.PNG", "Image/PNG", Vec::new());
        assert_eq!(f.mime_type(), "image/png");
        assert!(f.is_empty());
    }
}
