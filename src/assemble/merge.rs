//! PDF merge: every page of every input, in collection order, in one file.
//!
//! Each input is parsed, its object ids are shifted past everything already
//! in the output, and its objects are moved across. Catalog and page-tree
//! nodes are dropped; each page is re-parented directly under the output's
//! single `/Pages` root. Attributes a page inherited from an intermediate
//! node (`/Resources`, `/MediaBox`, `/CropBox`, `/Rotate`) are copied onto
//! the page first so that dropping the node does not change its rendering.
//!
//! The output is serialised exactly once, after the last input is appended.

use super::{finish_document, AssembledDocument, Assembler, Feature};
use crate::config::AssemblyConfig;
use crate::error::AssemblyError;
use crate::progress::ProgressHandle;
use crate::record::FileRecord;
use crate::resource::HandleLedger;
use lopdf::{Document, Object, ObjectId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Page attributes that may be inherited from an ancestor `/Pages` node.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Node types that belong to the source's document structure, not its pages.
const STRUCTURAL: [&[u8]; 4] = [b"Catalog", b"Pages", b"Outlines", b"Outline"];

/// Builds `merged.pdf` from an ordered list of PDF records.
pub struct PdfMergeAssembler {
    config: AssemblyConfig,
    ledger: Arc<HandleLedger>,
}

impl PdfMergeAssembler {
    pub fn new(config: AssemblyConfig) -> Self {
        Self {
            config,
            ledger: HandleLedger::new(),
        }
    }

    /// Ledger of the transient per-record read handles.
    pub fn ledger(&self) -> &Arc<HandleLedger> {
        &self.ledger
    }
}

impl Assembler for PdfMergeAssembler {
    fn feature(&self) -> Feature {
        Feature::PdfMerge
    }

    async fn assemble(
        &self,
        records: &[FileRecord],
        progress: &ProgressHandle,
    ) -> Result<AssembledDocument, AssemblyError> {
        let total = records.len();
        progress.on_assembly_start(total);

        let records = records.to_vec();
        let ledger = Arc::clone(&self.ledger);
        let compress = self.config.compress;
        let cb = Arc::clone(progress);

        let result = tokio::task::spawn_blocking(move || merge_all(&records, &ledger, compress, &cb))
            .await
            .map_err(|e| AssemblyError::Internal(format!("Merge task failed: {e}")))
            .and_then(|r| r);

        progress.on_assembly_complete(total, result.is_ok());
        result
    }
}

fn merge_all(
    records: &[FileRecord],
    ledger: &Arc<HandleLedger>,
    compress: bool,
    progress: &ProgressHandle,
) -> Result<AssembledDocument, AssemblyError> {
    let total = records.len();
    if total == 0 {
        return Err(AssemblyError::Pdf {
            detail: "no documents to merge".into(),
        });
    }
    let start = Instant::now();

    let mut out = Document::with_version("1.5");
    let pages_id = out.new_object_id();
    let mut kids: Vec<ObjectId> = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let index = i + 1;
        progress.on_record_start(index, total, record.display_name());

        let handle = ledger.acquire(record.id());
        let loaded = Document::load_mem(record.file().bytes());
        handle.release();

        let source = loaded.map_err(|e| AssemblyError::Decode {
            index,
            name: record.display_name().to_string(),
            detail: e.to_string(),
        })?;

        let appended = append_pages(&mut out, source, pages_id)?;
        debug!(
            "Appended {} page(s) from '{}' ({}/{})",
            appended.len(),
            record.display_name(),
            index,
            total
        );
        kids.extend(appended);
        progress.on_record_complete(index, total);
    }

    let page_count = kids.len();
    let bytes = finish_document(out, pages_id, kids, compress)?;
    info!(
        "Merged {} document(s) into {} pages ({} bytes) in {}ms",
        total,
        page_count,
        bytes.len(),
        start.elapsed().as_millis()
    );

    Ok(AssembledDocument {
        bytes,
        page_count,
        filename: Feature::PdfMerge.default_filename(),
    })
}

/// Move all pages of `source` into `out`, parented under `pages_id`.
/// Returns the new page ids in the source's page order.
fn append_pages(
    out: &mut Document,
    mut source: Document,
    pages_id: ObjectId,
) -> Result<Vec<ObjectId>, AssemblyError> {
    let original: Vec<ObjectId> = source.get_pages().into_values().collect();
    for page in &original {
        inherit_attributes(&mut source, *page);
    }

    source.renumber_objects_with(out.max_id + 1);
    // get_pages is keyed by page number, so values come out in page order.
    let pages: Vec<ObjectId> = source.get_pages().into_values().collect();
    if pages.len() != original.len() {
        return Err(AssemblyError::Internal(format!(
            "page count changed while renumbering ({} → {})",
            original.len(),
            pages.len()
        )));
    }

    for (id, object) in source.objects {
        if is_structural(&object) {
            continue;
        }
        out.objects.insert(id, object);
    }
    out.max_id = out.max_id.max(source.max_id);

    for page in &pages {
        let dict = out
            .get_object_mut(*page)
            .and_then(Object::as_dict_mut)
            .map_err(|e| AssemblyError::Pdf {
                detail: format!("page {page:?} missing after copy: {e}"),
            })?;
        dict.set("Parent", pages_id);
    }
    Ok(pages)
}

/// Copy inherited attributes from ancestor nodes onto the page itself.
fn inherit_attributes(doc: &mut Document, page: ObjectId) {
    let mut found: Vec<(&[u8], Object)> = Vec::new();
    let Ok(dict) = doc.get_object(page).and_then(Object::as_dict) else {
        return;
    };
    let mut missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !dict.has(key))
        .collect();
    let mut parent = dict.get(b"Parent").and_then(Object::as_reference).ok();

    // Bounded walk; malformed files can contain parent cycles.
    let mut depth = 0;
    while let Some(node_id) = parent {
        if missing.is_empty() || depth > 64 {
            break;
        }
        depth += 1;
        let Ok(node) = doc.get_object(node_id).and_then(Object::as_dict) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((*key, value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    if found.is_empty() {
        return;
    }
    if let Ok(dict) = doc.get_object_mut(page).and_then(Object::as_dict_mut) {
        for (key, value) in found {
            dict.set(key, value);
        }
    }
}

fn is_structural(object: &Object) -> bool {
    let Object::Dictionary(dict) = object else {
        return false;
    };
    match dict.get(b"Type") {
        Ok(Object::Name(name)) => STRUCTURAL.contains(&name.as_slice()),
        _ => false,
    }
}
