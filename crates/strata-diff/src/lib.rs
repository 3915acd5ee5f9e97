//! Snapshot diff engine for Strata.
//!
//! Compares two tree snapshots from an object store and produces an ordered
//! patch: one record per changed path, carrying a line diff for text files
//! and a classification for everything else.
//!
//! # Key Types
//!
//! - [`ChangeSet`] / [`Change`] / [`Side`] -- Path-level changes between two trees
//! - [`PatchBuilder`] / [`Patch`] / [`FilePatch`] -- Per-file diff records
//! - [`DiffEngine`] / [`MyersDiff`] -- Character-level diff over line-id pseudo-texts
//! - [`LineTable`] and the [`codec`] module -- Line interning and encoding
//! - [`DiffHunk`] / [`DiffLine`] -- Unified diff rendering
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strata_diff::{build_patch, diff_trees, CancellationToken};
//! use strata_store::{Blob, EntryMode, InMemoryObjectStore, ObjectStore, Tree, TreeEntry};
//!
//! let store = InMemoryObjectStore::new();
//! let old = Blob::new("hello\n");
//! let new = Blob::new("hello\nworld\n");
//! store.write_blob(&old).unwrap();
//! store.write_blob(&new).unwrap();
//! let a = store
//!     .write_tree(&Tree::new(vec![TreeEntry::file(EntryMode::Regular, "greeting", &old)]))
//!     .unwrap();
//! let b = store
//!     .write_tree(&Tree::new(vec![TreeEntry::file(EntryMode::Regular, "greeting", &new)]))
//!     .unwrap();
//!
//! let changes = diff_trees(&store, Some(&a), Some(&b)).unwrap();
//! let patch = build_patch(&store, &CancellationToken::new(), false, &changes).unwrap();
//! assert_eq!(patch.stats().additions, 1);
//! ```

pub mod binary;
pub mod change;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod lines;
pub mod patch;
pub mod transcode;
pub mod tree_diff;
pub mod unified;

pub use change::{compare_changes, Action, Change, ChangeSet, ChangeSide, FileView, Side};
pub use codec::{decode_line_id, encode_line_id, LINE_ID_LIMIT};
pub use config::PatchConfig;
pub use engine::{DiffEngine, Edit, MyersDiff, Operation};
pub use error::{CodecError, DiffError, DiffResult};
pub use lines::LineTable;
pub use patch::{
    build_patch, Chunk, FileMeta, FilePatch, Patch, PatchBuilder, PatchContent, PatchStats,
};
pub use tree_diff::{diff_tree_objects, diff_trees};
pub use unified::{DiffHunk, DiffLine, DEFAULT_CONTEXT};

pub use tokio_util::sync::CancellationToken;
