//! Progress-callback trait for per-record assembly events.
//!
//! Pass an [`Arc<dyn AssemblyProgress>`] to
//! [`crate::orchestrator::Pipeline::with_progress`] to receive events as an
//! assembler works through its snapshot. The CLI uses this to drive the
//! spinner that stands in for the blocking "busy" overlay.
//!
//! # Example
//!
//! ```rust
//! use nolimitpdf::AssemblyProgress;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Counting(AtomicUsize);
//!
//! impl AssemblyProgress for Counting {
//!     fn on_record_complete(&self, index: usize, total: usize) {
//!         let done = self.0.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}/{total} (record {index})");
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by assemblers as they process each record.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indices are 1-based positions in the snapshot.
/// Decodes may run ahead of placement, so `on_record_start` for record
/// `n + 1` can arrive before `on_record_complete` for record `n`.
pub trait AssemblyProgress: Send + Sync {
    /// Called once before the first record is read.
    fn on_assembly_start(&self, total: usize) {
        let _ = total;
    }

    /// Called when reading/decoding of a record begins.
    fn on_record_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a record's pages have been placed in the output.
    fn on_record_complete(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called once after serialisation, or after the first fatal error.
    fn on_assembly_complete(&self, total: usize, succeeded: bool) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl AssemblyProgress for NoopProgress {}

/// Convenience alias for the shared progress handle.
pub type ProgressHandle = Arc<dyn AssemblyProgress>;

/// Shared no-op handle.
pub fn noop() -> ProgressHandle {
    Arc::new(NoopProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        started: AtomicUsize,
        records: AtomicUsize,
        completed: AtomicUsize,
    }

    impl AssemblyProgress for Tracking {
        fn on_assembly_start(&self, total: usize) {
            self.started.store(total, Ordering::SeqCst);
        }

        fn on_record_complete(&self, _index: usize, _total: usize) {
            self.records.fetch_add(1, Ordering::SeqCst);
        }

        fn on_assembly_complete(&self, _total: usize, succeeded: bool) {
            if succeeded {
                self.completed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn noop_does_not_panic() {
        let p = noop();
        p.on_assembly_start(3);
        p.on_record_start(1, 3, "a.png");
        p.on_record_complete(1, 3);
        p.on_assembly_complete(3, true);
    }

    #[test]
    fn tracking_receives_events() {
        let t = Tracking::default();
        t.on_assembly_start(2);
        t.on_record_start(1, 2, "a");
        t.on_record_complete(1, 2);
        t.on_record_complete(2, 2);
        t.on_assembly_complete(2, true);
        assert_eq!(t.started.load(Ordering::SeqCst), 2);
        assert_eq!(t.records.load(Ordering::SeqCst), 2);
        assert_eq!(t.completed.load(Ordering::SeqCst), 1);
    }
}
