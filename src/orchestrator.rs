//! Per-feature pipeline: collection + preview cache + assembler + sink.
//!
//! A [`Pipeline`] owns everything one feature tab needs. It validates input,
//! keeps the busy flag, hands a snapshot of the collection to its
//! [`Assembler`], saves the result and emits exactly one notification per
//! terminal outcome:
//!
//! | Outcome                   | Notification | Collection |
//! |---------------------------|--------------|------------|
//! | saved                     | success      | cleared    |
//! | too few / no files        | warning      | unchanged  |
//! | assembly or save failure  | error        | unchanged  |
//! | already busy              | none         | unchanged  |
//!
//! While a build is in flight every edit is refused, so "clear on success"
//! always clears exactly the records that were assembled.

use crate::assemble::{Assembler, Feature, ImagePdfAssembler, PdfMergeAssembler};
use crate::collection::OrderedCollection;
use crate::config::AssemblyConfig;
use crate::error::{NolimitError, ThumbnailError, ValidationError};
use crate::i18n::{self, Language};
use crate::notify::{Level, NoopNotifier, Notification, Notifier};
use crate::output::OutputSink;
use crate::progress::{self, ProgressHandle};
use crate::record::{FileId, FileRecord, RawFile};
use crate::thumbnail::{MimeRenderer, ThumbnailCache, ThumbnailRenderer, ThumbnailResult};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{info, warn};

/// Lifecycle of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No records.
    Idle,
    /// At least one record, nothing running.
    HasItems,
    /// An assembly is in flight; edits are refused.
    Busy,
}

/// Result of an edit to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// The edit referred to unknown ids or was a no-op.
    Unchanged,
    /// Refused because a build is running.
    Busy,
}

/// Result of [`Pipeline::add_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddReport {
    pub outcome: EditOutcome,
    /// Ids of the accepted files, in input order.
    pub accepted: Vec<FileId>,
    /// Number of files rejected for their type.
    pub rejected: usize,
}

/// Terminal outcome of [`Pipeline::convert`].
#[derive(Debug)]
pub enum ConvertOutcome {
    /// The document was built and handed to the sink.
    Saved { path: PathBuf, page_count: usize },
    /// Nothing was attempted; the collection failed validation.
    Invalid(ValidationError),
    /// Assembly or saving failed; the collection is kept for a retry.
    Failed(NolimitError),
    /// Another build is already running.
    AlreadyBusy,
}

impl ConvertOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, ConvertOutcome::Saved { .. })
    }
}

struct State {
    collection: OrderedCollection,
    busy: bool,
}

impl State {
    fn phase(&self) -> Phase {
        if self.busy {
            Phase::Busy
        } else if self.collection.is_empty() {
            Phase::Idle
        } else {
            Phase::HasItems
        }
    }
}

/// Clears the busy flag when the build ends, including when the `convert`
/// future is dropped mid-flight.
struct BusyGuard<'a> {
    state: &'a Mutex<State>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).busy = false;
    }
}

/// One feature's end-to-end pipeline.
pub struct Pipeline<A, S> {
    assembler: A,
    sink: S,
    state: Mutex<State>,
    cache: ThumbnailCache,
    renderer: Arc<dyn ThumbnailRenderer>,
    notifier: Arc<dyn Notifier>,
    progress: ProgressHandle,
    language: Language,
}

impl<S: OutputSink> Pipeline<ImagePdfAssembler, S> {
    /// Image → PDF pipeline with the default renderers.
    pub fn image_to_pdf(config: AssemblyConfig, sink: S) -> Self {
        let renderer = Arc::new(MimeRenderer::new(&config));
        Self::new(ImagePdfAssembler::new(config), sink, renderer)
    }
}

impl<S: OutputSink> Pipeline<PdfMergeAssembler, S> {
    /// PDF merge pipeline with the default renderers.
    pub fn pdf_merge(config: AssemblyConfig, sink: S) -> Self {
        let renderer = Arc::new(MimeRenderer::new(&config));
        Self::new(PdfMergeAssembler::new(config), sink, renderer)
    }
}

impl<A: Assembler, S: OutputSink> Pipeline<A, S> {
    pub fn new(assembler: A, sink: S, renderer: Arc<dyn ThumbnailRenderer>) -> Self {
        Self {
            assembler,
            sink,
            state: Mutex::new(State {
                collection: OrderedCollection::new(),
                busy: false,
            }),
            cache: ThumbnailCache::new(),
            renderer,
            notifier: Arc::new(NoopNotifier),
            progress: progress::noop(),
            language: Language::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_progress(mut self, progress: ProgressHandle) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn feature(&self) -> Feature {
        self.assembler.feature()
    }

    pub fn assembler(&self) -> &A {
        &self.assembler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    pub fn phase(&self) -> Phase {
        lock(&self.state).phase()
    }

    /// Current records, in order.
    pub fn records(&self) -> Vec<FileRecord> {
        lock(&self.state).collection.snapshot()
    }

    /// Current ids, in order.
    pub fn ids(&self) -> Vec<FileId> {
        lock(&self.state).collection.ids()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Edits ────────────────────────────────────────────────────────────

    /// Append the files this feature accepts. A batch containing any
    /// rejected file produces one warning for the whole batch; accepted
    /// files in the same batch are still added.
    pub fn add_files(&self, files: impl IntoIterator<Item = RawFile>) -> AddReport {
        let feature = self.feature();
        let (accepted, rejected): (Vec<RawFile>, Vec<RawFile>) =
            files.into_iter().partition(|f| feature.accepts(f));

        let ids = {
            let mut state = lock(&self.state);
            if state.busy {
                return AddReport {
                    outcome: EditOutcome::Busy,
                    accepted: Vec::new(),
                    rejected: 0,
                };
            }
            state.collection.append(accepted)
        };

        if let Some(first) = rejected.first() {
            let err = ValidationError::UnsupportedType {
                rejected: rejected.len(),
                expected: feature.accepted_label(),
                first: first.name().to_string(),
            };
            warn!("{}", err);
            self.emit(Level::Warning, feature.messages().wrong_type);
        }

        AddReport {
            outcome: if ids.is_empty() {
                EditOutcome::Unchanged
            } else {
                EditOutcome::Applied
            },
            accepted: ids,
            rejected: rejected.len(),
        }
    }

    /// Remove one record and discard its preview.
    pub fn remove(&self, id: FileId) -> EditOutcome {
        let removed = {
            let mut state = lock(&self.state);
            if state.busy {
                return EditOutcome::Busy;
            }
            state.collection.remove(id)
        };
        match removed {
            Some(_) => {
                self.cache.evict(id);
                EditOutcome::Applied
            }
            None => EditOutcome::Unchanged,
        }
    }

    /// Move `source` to the position currently held by `target`.
    pub fn reorder(&self, source: FileId, target: FileId) -> EditOutcome {
        let mut state = lock(&self.state);
        if state.busy {
            return EditOutcome::Busy;
        }
        if state.collection.reorder(source, target) {
            EditOutcome::Applied
        } else {
            EditOutcome::Unchanged
        }
    }

    /// Remove everything and release every preview.
    pub fn reset(&self) -> EditOutcome {
        {
            let mut state = lock(&self.state);
            if state.busy {
                return EditOutcome::Busy;
            }
            state.collection.reset();
        }
        self.cache.clear();
        EditOutcome::Applied
    }

    // ── Previews ─────────────────────────────────────────────────────────

    /// Preview for `id`, rendered on first request. `None` if the id is not
    /// in the collection.
    pub async fn thumbnail(&self, id: FileId) -> Option<ThumbnailResult> {
        let file = lock(&self.state).collection.get(id).map(|r| r.file().clone())?;
        let result = self
            .cache
            .populate(id, &file, Arc::clone(&self.renderer))
            .await;
        if let Err(ThumbnailError::Evicted { .. }) = &result {
            return None;
        }
        // A remove or reset can land between the lookup and the slot being
        // created; its eviction then missed this entry.
        if lock(&self.state).collection.get(id).is_none() {
            self.cache.evict(id);
            return None;
        }
        Some(result)
    }

    // ── Build ────────────────────────────────────────────────────────────

    /// Validate, assemble, save and notify.
    pub async fn convert(&self) -> ConvertOutcome {
        let feature = self.feature();
        let messages = feature.messages();

        let snapshot = {
            let mut state = lock(&self.state);
            if state.busy {
                info!("Build requested while busy; ignoring");
                return ConvertOutcome::AlreadyBusy;
            }
            let count = state.collection.len();
            if let Err(err) = feature.check_count(count) {
                drop(state);
                let key = if count == 0 {
                    messages.empty
                } else {
                    messages.too_few
                };
                warn!("{}", err);
                self.emit(Level::Warning, key);
                return ConvertOutcome::Invalid(err);
            }
            state.busy = true;
            state.collection.snapshot()
        };
        let _busy = BusyGuard { state: &self.state };

        let start = Instant::now();
        info!("Building {} from {} file(s)", feature.default_filename(), snapshot.len());

        let result = match self.assembler.assemble(&snapshot, &self.progress).await {
            Ok(doc) => self
                .sink
                .save(&doc)
                .await
                .map(|path| (path, doc.page_count)),
            Err(e) => Err(NolimitError::from(e)),
        };

        match result {
            Ok((path, page_count)) => {
                lock(&self.state).collection.reset();
                self.cache.clear();
                info!(
                    "Built {} ({} pages) in {}ms",
                    path.display(),
                    page_count,
                    start.elapsed().as_millis()
                );
                self.emit(Level::Success, messages.success);
                ConvertOutcome::Saved { path, page_count }
            }
            Err(e) => {
                warn!("Build failed: {}", e);
                self.emit(Level::Error, messages.failure);
                ConvertOutcome::Failed(e)
            }
        }
    }

    fn emit(&self, level: Level, key: &'static str) {
        self.notifier.notify(Notification {
            level,
            key,
            message: i18n::t(self.language, key),
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::AssembledDocument;
    use crate::error::AssemblyError;
    use crate::notify::RecordingNotifier;
    use crate::output::MemorySink;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Records the names it was asked to assemble; optionally fails or
    /// blocks until released.
    #[derive(Default)]
    struct Fake {
        fail: bool,
        gate: Option<Arc<Notify>>,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl Assembler for Fake {
        fn feature(&self) -> Feature {
            Feature::PdfMerge
        }

        async fn assemble(
            &self,
            records: &[FileRecord],
            _progress: &ProgressHandle,
        ) -> Result<AssembledDocument, AssemblyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *lock(&self.seen) = records.iter().map(|r| r.display_name().to_string()).collect();
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(AssemblyError::Decode {
                    index: 1,
                    name: "x".into(),
                    detail: "bad".into(),
                });
            }
            Ok(AssembledDocument {
                bytes: b"%PDF".to_vec(),
                page_count: records.len(),
                filename: "merged.pdf",
            })
        }
    }

    struct Blank;

    impl ThumbnailRenderer for Blank {
        fn render(&self, _id: FileId, _file: &RawFile) -> Result<DynamicImage, ThumbnailError> {
            Ok(DynamicImage::new_rgb8(2, 2))
        }
    }

    /// Blocks inside `render` until the test sends on the gate.
    struct Gated {
        gate: Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl ThumbnailRenderer for Gated {
        fn render(&self, id: FileId, file: &RawFile) -> Result<DynamicImage, ThumbnailError> {
            let _ = lock(&self.gate).recv();
            Blank.render(id, file)
        }
    }

    fn pdf(name: &str) -> RawFile {
        RawFile::new(name, "application/pdf", b"%PDF".to_vec())
    }

    fn pipeline(fake: Fake) -> (Pipeline<Fake, MemorySink>, Arc<RecordingNotifier>) {
        let notes = Arc::new(RecordingNotifier::new());
        let p = Pipeline::new(fake, MemorySink::new(), Arc::new(Blank))
            .with_notifier(notes.clone())
            .with_language(Language::En);
        (p, notes)
    }

    #[test]
    fn rejected_batch_warns_once() {
        let (p, notes) = pipeline(Fake::default());
        let report = p.add_files(vec![
            pdf("a.pdf"),
            RawFile::new("b.png", "image/png", Vec::new()),
            RawFile::new("c.txt", "text/plain", Vec::new()),
        ]);
        assert_eq!(report.outcome, EditOutcome::Applied);
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.rejected, 2);
        assert_eq!(notes.keys(), vec!["toastWarnTypePdf"]);
        assert_eq!(notes.notifications()[0].message, "Only PDF files can be uploaded.");
        assert_eq!(p.phase(), Phase::HasItems);
    }

    #[tokio::test]
    async fn single_file_merge_is_refused() {
        let (p, notes) = pipeline(Fake::default());
        p.add_files(vec![pdf("only.pdf")]);
        let outcome = p.convert().await;
        assert!(matches!(
            outcome,
            ConvertOutcome::Invalid(ValidationError::TooFewFiles { required: 2, actual: 1 })
        ));
        assert_eq!(notes.keys(), vec!["toastErrorMergeMinFiles"]);
        assert_eq!(p.assembler().calls.load(Ordering::SeqCst), 0);
        assert_eq!(p.len(), 1);
    }

    #[tokio::test]
    async fn empty_merge_asks_for_files() {
        let (p, notes) = pipeline(Fake::default());
        assert!(matches!(p.convert().await, ConvertOutcome::Invalid(_)));
        assert_eq!(notes.keys(), vec!["toastWarnAddPdfs"]);
    }

    #[tokio::test]
    async fn success_saves_and_clears() {
        let (p, notes) = pipeline(Fake::default());
        let ids = p.add_files(vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")]).accepted;
        assert_eq!(p.reorder(ids[2], ids[0]), EditOutcome::Applied);
        p.thumbnail(ids[1]).await.unwrap().unwrap();

        let outcome = p.convert().await;
        assert!(outcome.is_saved());
        assert_eq!(*lock(&p.assembler().seen), vec!["c.pdf", "a.pdf", "b.pdf"]);
        assert_eq!(p.sink().saved().len(), 1);
        assert_eq!(p.phase(), Phase::Idle);
        assert!(p.cache().is_empty());
        assert_eq!(p.cache().ledger().live(), 0);
        assert_eq!(notes.keys(), vec!["toastSuccessPdfMerge"]);
    }

    #[tokio::test]
    async fn failure_keeps_collection() {
        let (p, notes) = pipeline(Fake {
            fail: true,
            ..Fake::default()
        });
        p.add_files(vec![pdf("a.pdf"), pdf("b.pdf")]);
        assert!(matches!(p.convert().await, ConvertOutcome::Failed(_)));
        assert_eq!(p.len(), 2);
        assert_eq!(p.phase(), Phase::HasItems);
        assert!(p.sink().saved().is_empty());
        assert_eq!(notes.keys(), vec!["toastErrorMerge"]);
    }

    #[tokio::test]
    async fn busy_refuses_edits_and_second_build() {
        let gate = Arc::new(Notify::new());
        let (p, notes) = pipeline(Fake {
            gate: Some(gate.clone()),
            ..Fake::default()
        });
        let ids = p.add_files(vec![pdf("a.pdf"), pdf("b.pdf")]).accepted;

        let first = p.convert();
        let second = async {
            tokio::task::yield_now().await;
            assert_eq!(p.phase(), Phase::Busy);
            assert!(matches!(p.convert().await, ConvertOutcome::AlreadyBusy));
            assert_eq!(p.remove(ids[0]), EditOutcome::Busy);
            assert_eq!(p.reorder(ids[1], ids[0]), EditOutcome::Busy);
            assert_eq!(p.reset(), EditOutcome::Busy);
            assert_eq!(p.add_files(vec![pdf("c.pdf")]).outcome, EditOutcome::Busy);
            gate.notify_one();
        };
        let (outcome, ()) = tokio::join!(first, second);

        assert!(outcome.is_saved());
        assert_eq!(p.assembler().calls.load(Ordering::SeqCst), 1);
        assert_eq!(notes.keys(), vec!["toastSuccessPdfMerge"]);
    }

    #[tokio::test]
    async fn remove_evicts_preview() {
        let (p, _) = pipeline(Fake::default());
        let ids = p.add_files(vec![pdf("a.pdf"), pdf("b.pdf")]).accepted;
        p.thumbnail(ids[0]).await.unwrap().unwrap();
        assert_eq!(p.cache().len(), 1);
        assert_eq!(p.remove(ids[0]), EditOutcome::Applied);
        assert_eq!(p.remove(ids[0]), EditOutcome::Unchanged);
        assert!(p.cache().is_empty());
        assert_eq!(p.cache().ledger().live(), 0);
        assert!(p.thumbnail(ids[0]).await.is_none());
    }

    #[tokio::test]
    async fn preview_for_record_removed_before_its_slot_is_dropped() {
        let (open, gate) = std::sync::mpsc::channel();
        let renderer = Arc::new(Gated {
            gate: Mutex::new(gate),
        });
        let p = Pipeline::new(Fake::default(), MemorySink::new(), renderer);
        let id = p.add_files(vec![pdf("a.pdf")]).accepted[0];

        let (preview, ()) = tokio::join!(p.thumbnail(id), async {
            while p.cache().render_count() == 0 {
                tokio::task::yield_now().await;
            }
            // Removed from the list without reaching the cache entry.
            lock(&p.state).collection.remove(id);
            open.send(()).unwrap();
        });

        assert!(preview.is_none());
        assert!(p.cache().is_empty());
        assert_eq!(p.cache().ledger().live(), 0);
    }
}
