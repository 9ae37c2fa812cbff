//! Per-record preview cache.
//!
//! A preview is rendered at most once per [`FileId`]: concurrent requests for
//! the same id share one render, and later requests (for instance after the
//! list is reordered) hit the cache. A failed render is cached too, so a
//! broken file shows its error indicator without being retried on every
//! repaint.
//!
//! Every successful preview owns a [`ResourceHandle`]. Evicting an entry,
//! clearing the cache, or finishing a render for a record that was removed
//! mid-flight releases that handle exactly once.

pub mod render;

use crate::error::ThumbnailError;
use crate::record::{FileId, RawFile};
use crate::resource::{HandleLedger, ResourceHandle};
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub use render::{ImageRenderer, MimeRenderer, PdfiumRenderer, ThumbnailRenderer};

/// Outcome of one render, shared by everyone who asked for it.
pub type ThumbnailResult = Result<Arc<Thumbnail>, ThumbnailError>;

type Slot = Arc<OnceCell<ThumbnailResult>>;

/// A rendered preview: PNG bytes plus the handle that keeps it alive.
#[derive(Debug)]
pub struct Thumbnail {
    id: FileId,
    width: u32,
    height: u32,
    png: Bytes,
    handle: Mutex<Option<ResourceHandle>>,
}

impl Thumbnail {
    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// PNG-encoded preview.
    pub fn png(&self) -> &Bytes {
        &self.png
    }

    /// Whether the backing handle has been released.
    pub fn is_released(&self) -> bool {
        lock(&self.handle).is_none()
    }

    /// Release the backing handle. Returns `false` if it was already released.
    fn release(&self) -> bool {
        match lock(&self.handle).take() {
            Some(handle) => {
                handle.release();
                true
            }
            None => false,
        }
    }
}

/// Preview cache keyed by record id.
pub struct ThumbnailCache {
    slots: Mutex<HashMap<FileId, Slot>>,
    ledger: Arc<HandleLedger>,
    renders: AtomicUsize,
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ThumbnailCache {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ledger: HandleLedger::new(),
            renders: AtomicUsize::new(0),
        }
    }

    /// Return the preview for `id`, rendering it if this is the first request.
    ///
    /// If the record is evicted while its render is in flight, the result is
    /// discarded (its handle released) and [`ThumbnailError::Evicted`] is
    /// returned instead.
    pub async fn populate(
        &self,
        id: FileId,
        file: &RawFile,
        renderer: Arc<dyn ThumbnailRenderer>,
    ) -> ThumbnailResult {
        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.entry(id).or_default())
        };

        let result = slot
            .get_or_init(|| self.render(id, file.clone(), renderer))
            .await
            .clone();

        let still_cached = lock(&self.slots)
            .get(&id)
            .is_some_and(|current| Arc::ptr_eq(current, &slot));
        if !still_cached {
            if let Ok(thumb) = &result {
                if thumb.release() {
                    debug!("Discarded preview for removed record {}", id);
                }
            }
            return Err(ThumbnailError::Evicted { id });
        }
        result
    }

    /// Cached preview for `id`, if a render has finished.
    pub fn get(&self, id: FileId) -> Option<ThumbnailResult> {
        lock(&self.slots).get(&id).and_then(|slot| slot.get().cloned())
    }

    /// Drop the entry for `id` and release its handle. Returns `true` if an
    /// entry (finished or in flight) existed.
    pub fn evict(&self, id: FileId) -> bool {
        let removed = lock(&self.slots).remove(&id);
        match removed {
            Some(slot) => {
                release_slot(&slot);
                true
            }
            None => false,
        }
    }

    /// Drop every entry, releasing all handles.
    pub fn clear(&self) {
        let drained: Vec<Slot> = lock(&self.slots).drain().map(|(_, slot)| slot).collect();
        for slot in &drained {
            release_slot(slot);
        }
        if !drained.is_empty() {
            debug!("Cleared {} preview(s)", drained.len());
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of renderer invocations so far.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Ledger of preview handles.
    pub fn ledger(&self) -> &Arc<HandleLedger> {
        &self.ledger
    }

    async fn render(
        &self,
        id: FileId,
        file: RawFile,
        renderer: Arc<dyn ThumbnailRenderer>,
    ) -> ThumbnailResult {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let (width, height, png) = tokio::task::spawn_blocking(move || {
            let image = renderer.render(id, &file)?;
            let png = encode_png(id, &image)?;
            Ok::<_, ThumbnailError>((image.width(), image.height(), png))
        })
        .await
        .map_err(|e| ThumbnailError::Internal(format!("Preview task failed: {e}")))?
        .inspect_err(|e| warn!("Preview for {} failed: {}", id, e))?;

        debug!("Cached {}x{} preview for {}", width, height, id);
        Ok(Arc::new(Thumbnail {
            id,
            width,
            height,
            png: Bytes::from(png),
            handle: Mutex::new(Some(self.ledger.acquire(id))),
        }))
    }
}

fn release_slot(slot: &Slot) {
    if let Some(Ok(thumb)) = slot.get() {
        thumb.release();
    }
}

fn encode_png(id: FileId, image: &DynamicImage) -> Result<Vec<u8>, ThumbnailError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ThumbnailError::Decode {
            id,
            detail: e.to_string(),
        })?;
    Ok(buf)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
