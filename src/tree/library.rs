//! Deduplicating store of decision trees with fitness-based pruning.

use super::node::{ActionKind, Tree, TreeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Canonical copy of every distinct tree an organism's lineage produced.
///
/// Entries are keyed by structural id, so re-deriving a known shape lands on
/// the existing entry and keeps accumulating its fitness. Iteration follows
/// registration order.
#[derive(Debug, Clone)]
pub struct TreeLibrary {
    trees: HashMap<TreeId, Tree>,
    order: Vec<TreeId>,
    max_count: usize,
}

impl TreeLibrary {
    pub fn new(max_count: usize) -> Self {
        Self {
            trees: HashMap::new(),
            order: Vec::new(),
            max_count,
        }
    }

    /// Library holding one single-leaf tree per action, in action order
    pub fn seeded(max_count: usize) -> Self {
        let mut library = Self::new(max_count);
        for action in ActionKind::ALL {
            library.register(Tree::from_action(action));
        }
        library
    }

    /// Insert `tree` unless its shape is already known; either way return
    /// the canonical entry.
    pub fn register(&mut self, tree: Tree) -> &Tree {
        match self.trees.entry(tree.id().clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.order.push(entry.key().clone());
                entry.insert(tree)
            }
        }
    }

    #[inline]
    pub fn get(&self, id: &TreeId) -> Option<&Tree> {
        self.trees.get(id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: &TreeId) -> Option<&mut Tree> {
        self.trees.get_mut(id)
    }

    #[inline]
    pub fn contains(&self, id: &TreeId) -> bool {
        self.trees.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    #[inline]
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Trees in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Tree> + '_ {
        self.order.iter().filter_map(move |id| self.trees.get(id))
    }

    /// Highest average health delta; the earliest registered wins a tie
    pub fn best(&self) -> Option<&Tree> {
        self.iter().fold(None, |best: Option<&Tree>, tree| match best {
            Some(current) if current.avg_health_delta() >= tree.avg_health_delta() => Some(current),
            _ => Some(tree),
        })
    }

    /// Remove the single worst unprotected tree when over capacity.
    ///
    /// Active trees and trees walked in the previous cycle are never
    /// removed, so the library can stay above `max_count` for a while.
    pub fn prune(&mut self) -> Option<TreeId> {
        if self.trees.len() <= self.max_count {
            return None;
        }

        let worst = self
            .iter()
            .filter(|tree| !tree.is_protected())
            .fold(None, |worst: Option<&Tree>, tree| match worst {
                Some(current) if current.avg_health_delta() <= tree.avg_health_delta() => Some(current),
                _ => Some(tree),
            })?
            .id()
            .clone();

        self.remove(&worst).map(|tree| tree.id().clone())
    }

    fn remove(&mut self, id: &TreeId) -> Option<Tree> {
        let tree = self.trees.remove(id)?;
        self.order.retain(|known| known != id);
        Some(tree)
    }

    /// Mark or unmark every node of `id` as part of the active tree
    pub(crate) fn set_active(&mut self, id: &TreeId, active: bool) -> bool {
        match self.trees.get_mut(id) {
            Some(tree) => {
                tree.set_active(active);
                true
            }
            None => false,
        }
    }

    /// Forget last cycle's usage marks before a new walk
    pub(crate) fn clear_usage(&mut self) {
        for tree in self.trees.values_mut() {
            tree.clear_usage();
        }
    }

    /// Deep copy for a child; active marks are dropped
    pub fn snapshot(&self) -> TreeLibrary {
        Self {
            trees: self
                .trees
                .iter()
                .map(|(id, tree)| (id.clone(), tree.snapshot()))
                .collect(),
            order: self.order.clone(),
            max_count: self.max_count,
        }
    }
}
