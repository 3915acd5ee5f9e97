//! Tree-level diff: walk two snapshots and collect leaf changes.
//!
//! Entries are matched by name at each level. Subtrees with equal IDs are
//! skipped without being read; subtrees that differ are descended into, and
//! a subtree present on only one side contributes every leaf below it.

use std::cmp::Ordering;
use std::sync::Arc;

use strata_store::{ObjectStore, Tree};
use strata_types::ObjectId;
use tracing::debug;

use crate::change::{join_path, Change, ChangeSet, ChangeSide, Side};
use crate::error::DiffResult;

/// Compare two root trees from the store.
///
/// `None` stands for the empty tree on that side, so `diff_trees(store, None,
/// Some(root))` lists every file of `root` as an insertion.
pub fn diff_trees(
    store: &dyn ObjectStore,
    from: Option<&ObjectId>,
    to: Option<&ObjectId>,
) -> DiffResult<ChangeSet> {
    if from.is_some() && from == to {
        return Ok(ChangeSet::new());
    }
    let from_tree = load_root(store, from)?;
    let to_tree = load_root(store, to)?;

    let mut walker = Walker::new(Some(store));
    walker.walk("", &from_tree, &to_tree)?;
    debug!(changes = walker.changes.len(), "tree walk complete");
    Ok(ChangeSet::from_changes(walker.changes))
}

/// Compare two in-memory trees without a store.
///
/// Only the top level is compared: subtree entries are treated as leaves, so
/// a changed directory shows up as one change whose sides are directories.
pub fn diff_tree_objects(from: Option<&Tree>, to: &Tree) -> DiffResult<ChangeSet> {
    let from_tree = Arc::new(from.cloned().unwrap_or_default());
    let to_tree = Arc::new(to.clone());

    let mut walker = Walker::new(None);
    walker.walk("", &from_tree, &to_tree)?;
    Ok(ChangeSet::from_changes(walker.changes))
}

fn load_root(store: &dyn ObjectStore, id: Option<&ObjectId>) -> DiffResult<Arc<Tree>> {
    match id {
        Some(id) => Ok(Arc::new(store.read_tree(id)?)),
        None => Ok(Arc::new(Tree::empty())),
    }
}

struct Walker<'s> {
    store: Option<&'s dyn ObjectStore>,
    empty: Arc<Tree>,
    changes: Vec<Change>,
}

#[derive(Clone, Copy)]
enum Which {
    From,
    To,
}

impl<'s> Walker<'s> {
    fn new(store: Option<&'s dyn ObjectStore>) -> Self {
        Self {
            store,
            empty: Arc::new(Tree::empty()),
            changes: Vec::new(),
        }
    }

    /// Subtree behind entry `index`, if it is a directory and a store is available.
    fn subtree(&self, tree: &Tree, index: usize) -> DiffResult<Option<Arc<Tree>>> {
        let entry = &tree.entries[index];
        match self.store {
            Some(store) if entry.mode.is_dir() => {
                Ok(Some(Arc::new(store.read_tree(&entry.object_id)?)))
            }
            _ => Ok(None),
        }
    }

    fn side(prefix: &str, tree: &Arc<Tree>, index: usize) -> Side {
        let path = join_path(prefix, &tree.entries[index].name);
        ChangeSide::new(path, Arc::clone(tree), index).into()
    }

    fn walk(&mut self, prefix: &str, from: &Arc<Tree>, to: &Arc<Tree>) -> DiffResult<()> {
        let (mut i, mut j) = (0, 0);
        loop {
            let order = match (from.entries.get(i), to.entries.get(j)) {
                (Some(a), Some(b)) => a.name.as_bytes().cmp(b.name.as_bytes()),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => return Ok(()),
            };
            match order {
                Ordering::Less => {
                    self.one_sided(prefix, from, i, Which::From)?;
                    i += 1;
                }
                Ordering::Greater => {
                    self.one_sided(prefix, to, j, Which::To)?;
                    j += 1;
                }
                Ordering::Equal => {
                    self.paired(prefix, from, i, to, j)?;
                    i += 1;
                    j += 1;
                }
            }
        }
    }

    /// Entry present on one side only: a leaf change, or every leaf below it.
    fn one_sided(
        &mut self,
        prefix: &str,
        tree: &Arc<Tree>,
        index: usize,
        which: Which,
    ) -> DiffResult<()> {
        if let Some(sub) = self.subtree(tree, index)? {
            let path = join_path(prefix, &tree.entries[index].name);
            let empty = Arc::clone(&self.empty);
            return match which {
                Which::From => self.walk(&path, &sub, &empty),
                Which::To => self.walk(&path, &empty, &sub),
            };
        }
        let side = Self::side(prefix, tree, index);
        self.changes.push(match which {
            Which::From => Change::new(side, Side::Absent),
            Which::To => Change::new(Side::Absent, side),
        });
        Ok(())
    }

    fn paired(
        &mut self,
        prefix: &str,
        from: &Arc<Tree>,
        i: usize,
        to: &Arc<Tree>,
        j: usize,
    ) -> DiffResult<()> {
        let (a, b) = (&from.entries[i], &to.entries[j]);
        if a.object_id == b.object_id && a.mode == b.mode {
            return Ok(());
        }

        let from_sub = self.subtree(from, i)?;
        let to_sub = self.subtree(to, j)?;
        match (from_sub, to_sub) {
            (Some(old), Some(new)) => {
                let path = join_path(prefix, &a.name);
                self.walk(&path, &old, &new)
            }
            (Some(_), None) | (None, Some(_)) => {
                self.one_sided(prefix, from, i, Which::From)?;
                self.one_sided(prefix, to, j, Which::To)
            }
            (None, None) => {
                let change = Change::new(Self::side(prefix, from, i), Self::side(prefix, to, j));
                self.changes.push(change);
                Ok(())
            }
        }
    }
}
