//! Explicitly released resource handles.
//!
//! Every preview or per-assembly buffer the pipeline hands out is tracked as
//! a [`ResourceHandle`] in a [`HandleLedger`]. A handle is released exactly
//! once: [`ResourceHandle::release`] consumes it, so releasing twice does not
//! compile. A handle dropped without an explicit release is released by its
//! `Drop` impl and logged as a leak so the missing call site can be fixed.

use crate::record::FileId;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// Counts outstanding handles for one owner (a cache or an assembler).
#[derive(Debug, Default)]
pub struct HandleLedger {
    next: AtomicU64,
    live: AtomicUsize,
    released: AtomicUsize,
}

impl HandleLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquire a handle on behalf of `owner`.
    pub fn acquire(self: &Arc<Self>, owner: FileId) -> ResourceHandle {
        let serial = self.next.fetch_add(1, Ordering::Relaxed);
        self.live.fetch_add(1, Ordering::SeqCst);
        trace!("acquire handle {} for {}", serial, owner);
        ResourceHandle {
            ledger: Arc::clone(self),
            owner,
            serial,
            released: false,
        }
    }

    /// Handles acquired and not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Total number of releases so far.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn settle(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// A live resource tied to one record.
#[derive(Debug)]
pub struct ResourceHandle {
    ledger: Arc<HandleLedger>,
    owner: FileId,
    serial: u64,
    released: bool,
}

impl ResourceHandle {
    pub fn owner(&self) -> FileId {
        self.owner
    }

    /// Release the handle.
    pub fn release(mut self) {
        self.released = true;
        trace!("release handle {} for {}", self.serial, self.owner);
        self.ledger.settle();
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "Resource handle {} for {} dropped without release",
                self.serial, self.owner
            );
            self.ledger.settle();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release_balance() {
        let ledger = HandleLedger::new();
        let a = ledger.acquire(FileId::next());
        let b = ledger.acquire(FileId::next());
        assert_eq!(ledger.live(), 2);
        a.release();
        assert_eq!(ledger.live(), 1);
        b.release();
        assert_eq!(ledger.live(), 0);
        assert_eq!(ledger.released(), 2);
    }

    #[test]
    fn dropped_handle_is_settled_once() {
        let ledger = HandleLedger::new();
        {
            let _h = ledger.acquire(FileId::next());
        }
        assert_eq!(ledger.live(), 0);
        assert_eq!(ledger.released(), 1);
    }

    #[test]
    fn handle_remembers_owner() {
        let ledger = HandleLedger::new();
        let id = FileId::next();
        let h = ledger.acquire(id);
        assert_eq!(h.owner(), id);
        h.release();
    }
}
