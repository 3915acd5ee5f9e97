//! Change records between two tree snapshots and their ordering.
//!
//! A [`Change`] pairs the before and after view of one path. Each side is
//! either [`Side::Present`] or [`Side::Absent`]; the action is derived from
//! which sides are present and is never stored.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_store::{EntryMode, ObjectStore, Tree, TreeEntry};
use strata_types::ObjectId;

use crate::error::{DiffError, DiffResult};

/// Kind of change between two sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Insert,
    Delete,
    Modify,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "Insert"),
            Self::Delete => write!(f, "Delete"),
            Self::Modify => write!(f, "Modify"),
        }
    }
}

/// One entry of a tree snapshot, addressed by its full path.
///
/// The entry is borrowed from the shared owning tree rather than copied.
#[derive(Clone, Debug)]
pub struct ChangeSide {
    path: String,
    tree: Arc<Tree>,
    index: usize,
}

impl ChangeSide {
    /// Side for entry `index` of `tree`, or `None` if the index is out of range.
    pub fn new(path: impl Into<String>, tree: Arc<Tree>, index: usize) -> Option<Self> {
        if index >= tree.len() {
            return None;
        }
        Some(Self {
            path: path.into(),
            tree,
            index,
        })
    }

    /// Side for the entry called `name` in `tree`, placed under `parent`.
    pub fn lookup(parent: &str, tree: Arc<Tree>, name: &str) -> Option<Self> {
        let index = tree.position(name)?;
        Self::new(join_path(parent, name), tree, index)
    }

    /// Full slash-separated path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The tree snapshot that owns the entry.
    pub fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    pub fn entry(&self) -> &TreeEntry {
        // Trees are immutable behind the Arc, so the index checked in `new` stays valid.
        &self.tree.entries[self.index]
    }
}

impl PartialEq for ChangeSide {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.entry() == other.entry()
            && (Arc::ptr_eq(&self.tree, &other.tree) || self.tree == other.tree)
    }
}

impl Eq for ChangeSide {}

/// Presence of one side of a change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Present(ChangeSide),
    Absent,
}

impl Side {
    pub fn as_present(&self) -> Option<&ChangeSide> {
        match self {
            Self::Present(side) => Some(side),
            Self::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<Option<ChangeSide>> for Side {
    fn from(side: Option<ChangeSide>) -> Self {
        side.map_or(Self::Absent, Self::Present)
    }
}

impl From<ChangeSide> for Side {
    fn from(side: ChangeSide) -> Self {
        Self::Present(side)
    }
}

/// Read-only view of a file-typed side, able to fetch its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileView<'a> {
    path: &'a str,
    entry: &'a TreeEntry,
}

impl<'a> FileView<'a> {
    pub fn path(&self) -> &'a str {
        self.path
    }

    pub fn mode(&self) -> EntryMode {
        self.entry.mode
    }

    pub fn id(&self) -> ObjectId {
        self.entry.object_id
    }

    pub fn size(&self) -> u64 {
        self.entry.size
    }

    /// Read the blob bytes from `store`.
    pub fn contents(&self, store: &dyn ObjectStore) -> DiffResult<Vec<u8>> {
        Ok(store.read_blob(&self.entry.object_id)?.data)
    }
}

fn file_view(side: &Side) -> Option<FileView<'_>> {
    let side = side.as_present()?;
    let entry = side.entry();
    entry.mode.is_file().then_some(FileView {
        path: side.path(),
        entry,
    })
}

/// A detected change between two trees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub from: Side,
    pub to: Side,
}

impl Change {
    pub fn new(from: impl Into<Side>, to: impl Into<Side>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn insert(to: ChangeSide) -> Self {
        Self::new(Side::Absent, to)
    }

    pub fn delete(from: ChangeSide) -> Self {
        Self::new(from, Side::Absent)
    }

    pub fn modify(from: ChangeSide, to: ChangeSide) -> Self {
        Self::new(from, to)
    }

    /// Kind of change, derived from side presence.
    pub fn action(&self) -> DiffResult<Action> {
        match (&self.from, &self.to) {
            (Side::Absent, Side::Absent) => Err(DiffError::MalformedChange),
            (Side::Absent, Side::Present(_)) => Ok(Action::Insert),
            (Side::Present(_), Side::Absent) => Ok(Action::Delete),
            (Side::Present(_), Side::Present(_)) => Ok(Action::Modify),
        }
    }

    /// File views of the sides that are blobs.
    ///
    /// Directory and submodule sides come back as `None` even though they are
    /// present; check the side's mode rather than inferring it from `None`.
    pub fn files(&self) -> DiffResult<(Option<FileView<'_>>, Option<FileView<'_>>)> {
        self.action()?;
        Ok((file_view(&self.from), file_view(&self.to)))
    }

    /// Path of the from side if present, otherwise of the to side.
    pub fn path(&self) -> Option<&str> {
        self.from
            .as_present()
            .or_else(|| self.to.as_present())
            .map(ChangeSide::path)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.action(), self.path()) {
            (Ok(action), Some(path)) => write!(f, "<Action: {action}, Path: {path}>"),
            _ => write!(f, "malformed change"),
        }
    }
}

/// Order of two changes by effective path bytes.
pub fn compare_changes(a: &Change, b: &Change) -> Ordering {
    a.path().map(str::as_bytes).cmp(&b.path().map(str::as_bytes))
}

/// Changes between two trees, in patch output order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect `changes` and sort them.
    pub fn from_changes(changes: Vec<Change>) -> Self {
        let mut set = Self { changes };
        set.sort();
        set
    }

    /// Append without re-sorting; call [`ChangeSet::sort`] afterwards.
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// Stable sort by effective path.
    pub fn sort(&mut self) {
        self.changes.sort_by(compare_changes);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn as_slice(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Effective paths in order.
    pub fn paths(&self) -> Vec<&str> {
        self.changes.iter().filter_map(Change::path).collect()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, change) in self.changes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{change}")?;
        }
        f.write_str("]")
    }
}

pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strata_store::{Blob, InMemoryObjectStore};

    fn tree_with(entries: Vec<TreeEntry>) -> Arc<Tree> {
        Arc::new(Tree::new(entries))
    }

    fn side(path: &str, mode: EntryMode, content: &str) -> ChangeSide {
        let name = path.rsplit('/').next().unwrap_or(path);
        let tree = tree_with(vec![TreeEntry::file(mode, name, &Blob::new(content))]);
        ChangeSide::new(path, tree, 0).unwrap()
    }

    fn file(path: &str) -> ChangeSide {
        side(path, EntryMode::Regular, path)
    }

    #[test]
    fn action_table() {
        assert!(matches!(
            Change::new(Side::Absent, Side::Absent).action(),
            Err(DiffError::MalformedChange)
        ));
        assert_eq!(Change::insert(file("a")).action().unwrap(), Action::Insert);
        assert_eq!(Change::delete(file("a")).action().unwrap(), Action::Delete);
        assert_eq!(
            Change::modify(file("a"), file("a")).action().unwrap(),
            Action::Modify
        );
    }

    #[test]
    fn empty_named_entry_is_not_absent() {
        let tree = tree_with(vec![TreeEntry::new(EntryMode::Regular, "", ObjectId::zero())]);
        let change = Change::insert(ChangeSide::new("", tree, 0).unwrap());
        assert_eq!(change.action().unwrap(), Action::Insert);
        assert_eq!(change.path(), Some(""));
    }

    #[test]
    fn side_index_out_of_range() {
        assert!(ChangeSide::new("x", Arc::new(Tree::empty()), 0).is_none());
    }

    #[test]
    fn lookup_joins_parent_path() {
        let tree = tree_with(vec![TreeEntry::file(EntryMode::Regular, "y.rs", &Blob::new("y"))]);
        let side = ChangeSide::lookup("src/x", Arc::clone(&tree), "y.rs").unwrap();
        assert_eq!(side.path(), "src/x/y.rs");
        assert!(Arc::ptr_eq(side.tree(), &tree));
        assert!(ChangeSide::lookup("src", tree, "missing").is_none());
    }

    #[test]
    fn files_resolves_file_sides_only() {
        let dir_tree = tree_with(vec![TreeEntry::new(
            EntryMode::Directory,
            "lib",
            ObjectId::digest(b"tree"),
        )]);
        let dir = ChangeSide::new("lib", dir_tree, 0).unwrap();
        let change = Change::modify(dir, file("lib"));
        let (from, to) = change.files().unwrap();
        assert!(from.is_none());
        assert_eq!(to.unwrap().path(), "lib");

        let sub = side("vendor", EntryMode::Submodule, "");
        let sub_change = Change::delete(sub);
        let (from, to) = sub_change.files().unwrap();
        assert!(from.is_none() && to.is_none());

        let link = side("link", EntryMode::Symlink, "target");
        let link_change = Change::insert(link);
        let (_, to) = link_change.files().unwrap();
        assert_eq!(to.unwrap().mode(), EntryMode::Symlink);
    }

    #[test]
    fn files_of_malformed_change_fails() {
        let change = Change::new(Side::Absent, Side::Absent);
        assert!(matches!(change.files(), Err(DiffError::MalformedChange)));
    }

    #[test]
    fn file_view_reads_content() {
        let store = InMemoryObjectStore::new();
        let blob = Blob::new("content\n");
        store.write_blob(&blob).unwrap();
        let change = Change::insert(side("f.txt", EntryMode::Regular, "content\n"));
        let (_, to) = change.files().unwrap();
        let to = to.unwrap();
        assert_eq!(to.size(), 8);
        assert_eq!(to.id(), blob.id());
        assert_eq!(to.contents(&store).unwrap(), b"content\n");
    }

    #[test]
    fn file_view_missing_blob() {
        let store = InMemoryObjectStore::new();
        let change = Change::insert(file("gone.txt"));
        let (_, to) = change.files().unwrap();
        assert!(matches!(
            to.unwrap().contents(&store),
            Err(DiffError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn sort_by_effective_path() {
        let set = ChangeSet::from_changes(vec![
            Change::insert(file("b/x")),
            Change::delete(file("a/y")),
            Change::modify(file("a/a"), file("a/a")),
        ]);
        assert_eq!(set.paths(), vec!["a/a", "a/y", "b/x"]);
    }

    #[test]
    fn sort_uses_bytes_not_locale() {
        let set = ChangeSet::from_changes(vec![
            Change::insert(file("a")),
            Change::insert(file("B")),
            Change::insert(file("a/b")),
            Change::insert(file("a.b")),
        ]);
        assert_eq!(set.paths(), vec!["B", "a", "a.b", "a/b"]);
    }

    #[test]
    fn sort_is_stable_for_equal_paths() {
        let first = Change::insert(side("same", EntryMode::Regular, "1"));
        let second = Change::delete(side("same", EntryMode::Regular, "2"));
        let set = ChangeSet::from_changes(vec![first.clone(), second.clone()]);
        assert_eq!(set.as_slice(), &[first, second]);
    }

    #[test]
    fn display_formats() {
        let set = ChangeSet::from_changes(vec![
            Change::delete(file("old.txt")),
            Change::insert(file("new.txt")),
        ]);
        assert_eq!(
            set.to_string(),
            "[<Action: Insert, Path: new.txt>, <Action: Delete, Path: old.txt>]"
        );
        assert_eq!(
            Change::new(Side::Absent, Side::Absent).to_string(),
            "malformed change"
        );
    }

    proptest! {
        #[test]
        fn sorted_paths_are_nondecreasing(paths in proptest::collection::vec("[a-c/]{1,6}", 0..20)) {
            let set = ChangeSet::from_changes(paths.iter().map(|p| Change::insert(file(p))).collect());
            let sorted = set.paths();
            prop_assert_eq!(sorted.len(), paths.len());
            for pair in sorted.windows(2) {
                prop_assert!(pair[0].as_bytes() <= pair[1].as_bytes());
            }
        }
    }
}
