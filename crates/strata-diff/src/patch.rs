//! Patch building: turn a [`ChangeSet`] into ordered per-file diff records.
//!
//! Each change is classified, its blobs are read from the store, and text
//! content is diffed line by line. Lines are interned into a per-change
//! [`LineTable`], the ids are encoded into pseudo-texts with the line codec,
//! and the pseudo-texts are handed to a [`DiffEngine`]. The resulting runs
//! are decoded back into [`Chunk`]s of lines.
//!
//! The build is all-or-nothing: a malformed change or a store failure aborts
//! it. The one exception is cancellation, which returns the records already
//! completed inside [`DiffError::Cancelled`]. Cancellation is only checked
//! between changes; a single large file diff runs to completion once started.

use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use rayon::prelude::*;
use serde::Serialize;
use strata_store::{EntryMode, ObjectStore};
use strata_types::ObjectId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::binary::is_binary;
use crate::change::{Action, Change, ChangeSet, ChangeSide, FileView};
use crate::codec::{decode_text, encode_ids};
use crate::config::PatchConfig;
use crate::engine::{DiffEngine, MyersDiff, Operation};
use crate::error::{CodecError, DiffError, DiffResult};
use crate::lines::{common_prefix_len, common_suffix_len, LineTable};
use crate::transcode;

/// A run of lines sharing one operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub op: Operation,
    /// Lines of the run, each keeping its `\n` terminator if it had one.
    pub lines: Vec<String>,
    /// Zero-based index of the run's first line in the old text. For inserts,
    /// the old line the run is inserted before.
    pub old_start: usize,
    /// Zero-based index of the run's first line in the new text. For
    /// deletes, the new line the run is removed before.
    pub new_start: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Metadata of one side of a file record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileMeta {
    pub path: String,
    pub mode: EntryMode,
    pub id: ObjectId,
    pub size: u64,
}

impl From<&ChangeSide> for FileMeta {
    fn from(side: &ChangeSide) -> Self {
        let entry = side.entry();
        Self {
            path: side.path().to_string(),
            mode: entry.mode,
            id: entry.object_id,
            size: entry.size,
        }
    }
}

/// What a file record carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum PatchContent {
    /// Line diff of text content.
    Text(Vec<Chunk>),
    /// Mode or type change involving a non-regular entry; no line diff.
    Structural,
    /// At least one side is binary.
    Binary,
    /// More distinct lines than the line codec can encode.
    LineLimitExceeded,
}

impl PatchContent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Structural => "structural",
            Self::Binary => "binary",
            Self::LineLimitExceeded => "line-limit-exceeded",
        }
    }
}

/// Diff record of one change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilePatch {
    pub path: String,
    pub action: Action,
    pub from: Option<FileMeta>,
    pub to: Option<FileMeta>,
    pub content: PatchContent,
}

impl FilePatch {
    /// Text chunks, empty for non-text records.
    pub fn chunks(&self) -> &[Chunk] {
        match &self.content {
            PatchContent::Text(chunks) => chunks,
            _ => &[],
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.content, PatchContent::Binary)
    }

    fn count(&self, op: Operation) -> usize {
        self.chunks()
            .iter()
            .filter(|c| c.op == op)
            .map(Chunk::len)
            .sum()
    }

    /// Lines added.
    pub fn additions(&self) -> usize {
        self.count(Operation::Insert)
    }

    /// Lines removed.
    pub fn deletions(&self) -> usize {
        self.count(Operation::Delete)
    }
}

/// Totals over a patch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PatchStats {
    pub files: usize,
    pub additions: usize,
    pub deletions: usize,
    pub binary: usize,
}

/// Ordered file records, one per change, in change-set order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Patch {
    pub files: Vec<FilePatch>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilePatch> {
        self.files.iter()
    }

    pub fn stats(&self) -> PatchStats {
        self.files.iter().fold(
            PatchStats {
                files: self.files.len(),
                ..PatchStats::default()
            },
            |mut stats, file| {
                stats.additions += file.additions();
                stats.deletions += file.deletions();
                stats.binary += usize::from(file.is_binary());
                stats
            },
        )
    }
}

/// Result of diffing two texts by line.
#[derive(Debug)]
enum LineDiff {
    Chunks(Vec<Chunk>),
    /// A line id in the differing region could not be encoded.
    TooManyLines { distinct: usize, source: CodecError },
}

/// Diff `old` and `new` line by line through `engine`.
fn diff_lines(engine: &dyn DiffEngine, old: &str, new: &str) -> DiffResult<LineDiff> {
    let mut table = LineTable::new();
    let old_ids = table.intern_text(old);
    let new_ids = table.intern_text(new);

    let prefix = common_prefix_len(&old_ids, &new_ids);
    let suffix = common_suffix_len(&old_ids[prefix..], &new_ids[prefix..]);
    let old_mid = &old_ids[prefix..old_ids.len() - suffix];
    let new_mid = &new_ids[prefix..new_ids.len() - suffix];

    let (old_text, new_text) = match (encode_ids(old_mid), encode_ids(new_mid)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(source), _) | (_, Err(source)) => {
            return Ok(LineDiff::TooManyLines {
                distinct: table.len(),
                source,
            })
        }
    };

    let mut out = ChunkWriter::default();
    out.push(Operation::Equal, &old_ids[..prefix], &table)?;
    for edit in engine.diff(&old_text, &new_text) {
        out.push(edit.op, &decode_text(&edit.text)?, &table)?;
    }
    out.push(Operation::Equal, &old_ids[old_ids.len() - suffix..], &table)?;
    Ok(LineDiff::Chunks(out.chunks))
}

/// Accumulates decoded runs into chunks, tracking line positions.
#[derive(Default)]
struct ChunkWriter {
    chunks: Vec<Chunk>,
    old_pos: usize,
    new_pos: usize,
}

impl ChunkWriter {
    fn push(&mut self, op: Operation, ids: &[u32], table: &LineTable<'_>) -> DiffResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let lines = ids
            .iter()
            .map(|&id| {
                table
                    .line(id)
                    .map(str::to_string)
                    .ok_or(CodecError::OutOfRange(id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let count = lines.len();

        match self.chunks.last_mut() {
            Some(last) if last.op == op => last.lines.extend(lines),
            _ => self.chunks.push(Chunk {
                op,
                lines,
                old_start: self.old_pos,
                new_start: self.new_pos,
            }),
        }
        match op {
            Operation::Equal => {
                self.old_pos += count;
                self.new_pos += count;
            }
            Operation::Delete => self.old_pos += count,
            Operation::Insert => self.new_pos += count,
        }
        Ok(())
    }
}

/// Builds patches from change sets against an object store.
pub struct PatchBuilder<'s, E = MyersDiff> {
    store: &'s dyn ObjectStore,
    engine: E,
    config: PatchConfig,
}

impl<'s> PatchBuilder<'s, MyersDiff> {
    pub fn new(store: &'s dyn ObjectStore) -> Self {
        Self::with_config(store, PatchConfig::default())
    }

    pub fn with_config(store: &'s dyn ObjectStore, config: PatchConfig) -> Self {
        Self {
            store,
            engine: MyersDiff::with_timeout(config.diff_timeout()),
            config,
        }
    }
}

impl<'s, E: DiffEngine> PatchBuilder<'s, E> {
    /// Replace the diff engine.
    pub fn with_engine<F: DiffEngine>(self, engine: F) -> PatchBuilder<'s, F> {
        PatchBuilder {
            store: self.store,
            engine,
            config: self.config,
        }
    }

    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Build a patch, one change at a time, in change-set order.
    pub fn build(&self, cancel: &CancellationToken, changes: &ChangeSet) -> DiffResult<Patch> {
        let mut patch = Patch::new();
        for change in changes {
            if cancel.is_cancelled() {
                debug!(completed = patch.len(), "patch build cancelled");
                return Err(DiffError::Cancelled {
                    partial: Box::new(patch),
                });
            }
            patch.files.push(self.file_patch(change)?);
        }
        let stats = patch.stats();
        info!(
            files = stats.files,
            additions = stats.additions,
            deletions = stats.deletions,
            binary = stats.binary,
            "patch built"
        );
        Ok(patch)
    }

    /// Build a patch with per-change work spread over the rayon pool.
    ///
    /// Records are reassembled in change-set order and the first failure in
    /// that order is returned, whichever finished first. Changes after the
    /// lowest failing index seen so far are skipped. On cancellation the
    /// partial patch holds the records preceding the first change that saw
    /// the cancelled token.
    pub fn build_parallel(
        &self,
        cancel: &CancellationToken,
        changes: &ChangeSet,
    ) -> DiffResult<Patch> {
        let first_failure = AtomicUsize::new(usize::MAX);
        let results: Vec<Option<DiffResult<FilePatch>>> = changes
            .as_slice()
            .par_iter()
            .enumerate()
            .map(|(index, change)| {
                if index > first_failure.load(AtomicOrdering::Acquire) {
                    return None;
                }
                let result = if cancel.is_cancelled() {
                    Err(DiffError::Cancelled {
                        partial: Box::default(),
                    })
                } else {
                    self.file_patch(change)
                };
                if result.is_err() {
                    first_failure.fetch_min(index, AtomicOrdering::AcqRel);
                }
                Some(result)
            })
            .collect();

        let skipped = results.iter().filter(|r| r.is_none()).count();
        if skipped > 0 {
            debug!(skipped, "changes skipped after a failed change");
        }

        let mut patch = Patch::new();
        let mut first_err = None;
        // Skipped changes all follow the first failure.
        for result in results.into_iter().flatten() {
            match result {
                Ok(file) => {
                    if first_err.is_none() {
                        patch.files.push(file);
                    }
                }
                Err(err) if first_err.is_none() => first_err = Some(err),
                Err(DiffError::Cancelled { .. }) => {}
                Err(err) => warn!(error = %err, "additional failure after first patch error"),
            }
        }

        match first_err {
            None => {
                info!(files = patch.len(), "patch built in parallel");
                Ok(patch)
            }
            Some(DiffError::Cancelled { .. }) => {
                debug!(completed = patch.len(), "parallel patch build cancelled");
                Err(DiffError::Cancelled {
                    partial: Box::new(patch),
                })
            }
            Some(err) => Err(err),
        }
    }

    /// Record for a single change.
    pub fn file_patch(&self, change: &Change) -> DiffResult<FilePatch> {
        let action = change.action()?;
        let path = change.path().unwrap_or_default().to_string();
        let from = change.from.as_present();
        let to = change.to.as_present();

        let structural = from
            .into_iter()
            .chain(to)
            .any(|side| !side.entry().mode.is_regular());
        let content = if structural {
            PatchContent::Structural
        } else {
            let (from_file, to_file) = change.files()?;
            self.content_diff(&path, from_file, to_file)?
        };
        debug!(path = %path, action = %action, kind = content.kind(), "file patch");

        Ok(FilePatch {
            path,
            action,
            from: from.map(FileMeta::from),
            to: to.map(FileMeta::from),
            content,
        })
    }

    fn content_diff(
        &self,
        path: &str,
        from: Option<FileView<'_>>,
        to: Option<FileView<'_>>,
    ) -> DiffResult<PatchContent> {
        let old = from.map(|f| f.contents(self.store)).transpose()?;
        let new = to.map(|f| f.contents(self.store)).transpose()?;
        let old = old.as_deref().unwrap_or_default();
        let new = new.as_deref().unwrap_or_default();

        let (limit, sniff) = (self.config.max_text_size, self.config.sniff_len);
        if is_binary(old, limit, sniff) || is_binary(new, limit, sniff) {
            debug!(path, "binary content");
            return Ok(PatchContent::Binary);
        }

        let canonical = self.config.transcode_to_canonical;
        let old_text = transcode::decode_text(old, canonical);
        let new_text = transcode::decode_text(new, canonical);

        match diff_lines(&self.engine, &old_text, &new_text)? {
            LineDiff::Chunks(chunks) => Ok(PatchContent::Text(chunks)),
            LineDiff::TooManyLines { distinct, source } => {
                warn!(path, distinct, error = %source, "too many distinct lines for a line diff");
                Ok(PatchContent::LineLimitExceeded)
            }
        }
    }
}

/// Build a patch for `changes` with default settings.
///
/// `transcode_to_canonical` converts legacy-encoded text to UTF-8 before
/// diffing so that encoding differences do not show up as changed lines.
pub fn build_patch(
    store: &dyn ObjectStore,
    cancel: &CancellationToken,
    transcode_to_canonical: bool,
    changes: &ChangeSet,
) -> DiffResult<Patch> {
    let config = PatchConfig {
        transcode_to_canonical,
        ..PatchConfig::default()
    };
    PatchBuilder::with_config(store, config).build(cancel, changes)
}
