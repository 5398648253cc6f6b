//! Point mutations of decision trees.
//!
//! A mutation is drawn as a [`Mutation`] plan first and applied second, so a
//! specific edit can be replayed without depending on a random sequence.

use super::node::{ActionKind, ConditionKind, Node, NodeKind, Tree};
use rand::Rng;

/// One edit at a pre-order node index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Turn an action leaf into a condition over the original action and a
    /// fresh one; `original_first` puts the original on the yes branch
    Split {
        node: usize,
        condition: ConditionKind,
        fresh: ActionKind,
        original_first: bool,
    },
    /// Swap an action leaf for a different action
    ReplaceAction { node: usize, action: ActionKind },
    /// Collapse a condition and both its subtrees into one action
    Collapse { node: usize, action: ActionKind },
    /// Swap a condition for a different one, keeping its children
    ReplaceCondition { node: usize, condition: ConditionKind },
}

impl Mutation {
    /// Draw a mutation for `tree`. Splits are only drawn while the result
    /// stays within `max_size` nodes.
    pub fn random<R: Rng + ?Sized>(tree: &Tree, max_size: usize, rng: &mut R) -> Self {
        let index = rng.gen_range(0..tree.size());
        let Some(node) = tree.node(index) else {
            panic!("node {index} outside tree {} of size {}", tree.id(), tree.size());
        };

        match node.kind() {
            NodeKind::Action(action) => {
                if rng.gen_bool(0.5) && tree.size() + 2 <= max_size {
                    Mutation::Split {
                        node: index,
                        condition: ConditionKind::random(rng),
                        fresh: ActionKind::random(rng),
                        original_first: rng.gen_bool(0.5),
                    }
                } else {
                    Mutation::ReplaceAction {
                        node: index,
                        action: action.random_other(rng),
                    }
                }
            }
            NodeKind::Condition { condition, .. } => {
                if rng.gen_bool(0.5) {
                    Mutation::Collapse {
                        node: index,
                        action: ActionKind::random(rng),
                    }
                } else {
                    Mutation::ReplaceCondition {
                        node: index,
                        condition: condition.random_other(rng),
                    }
                }
            }
        }
    }

    /// Pre-order index of the edited node
    pub fn node(&self) -> usize {
        match *self {
            Mutation::Split { node, .. }
            | Mutation::ReplaceAction { node, .. }
            | Mutation::Collapse { node, .. }
            | Mutation::ReplaceCondition { node, .. } => node,
        }
    }
}

impl Tree {
    /// Apply `mutation` to a copy of this tree.
    ///
    /// The result has a fresh id and size, no usage marks, no usage count,
    /// and starts its fitness from this tree's average. Panics if the plan
    /// does not fit the tree, since that means the plan was drawn for a
    /// different structure.
    pub fn mutated(&self, mutation: &Mutation) -> Tree {
        let mut root = self.root().clone();
        let index = mutation.node();
        let Some(target) = root.nth_mut(index) else {
            panic!("mutation targets node {index} of tree {} (size {})", self.id(), self.size());
        };
        let removed = target.size();

        let expected_size = match *mutation {
            Mutation::Split {
                condition,
                fresh,
                original_first,
                ..
            } => {
                let NodeKind::Action(original) = *target.kind() else {
                    panic!("split of non-action node {index} in tree {}", self.id());
                };
                let (yes, no) = if original_first {
                    (original, fresh)
                } else {
                    (fresh, original)
                };
                let branch = Node::condition(condition, Node::action(yes), Node::action(no));
                target.replace_kind(branch.kind().clone());
                self.size() + 2
            }
            Mutation::ReplaceAction { action, .. } => {
                if !matches!(target.kind(), NodeKind::Action(_)) {
                    panic!("action replacement on condition node {index} in tree {}", self.id());
                }
                target.replace_kind(NodeKind::Action(action));
                self.size()
            }
            Mutation::Collapse { action, .. } => {
                if !matches!(target.kind(), NodeKind::Condition { .. }) {
                    panic!("collapse of action node {index} in tree {}", self.id());
                }
                target.replace_kind(NodeKind::Action(action));
                self.size() - removed + 1
            }
            Mutation::ReplaceCondition { condition, .. } => {
                let old = target.replace_kind(NodeKind::Action(ActionKind::Idle));
                let NodeKind::Condition { yes, no, .. } = old else {
                    panic!("condition replacement on action node {index} in tree {}", self.id());
                };
                target.replace_kind(NodeKind::Condition { condition, yes, no });
                self.size()
            }
        };

        let tree = Tree::rebuilt(root, self.avg_health_delta());
        assert_eq!(
            tree.size(),
            expected_size,
            "mutation {mutation:?} left tree {} with inconsistent size",
            tree.id()
        );
        tree
    }

    /// Draw and apply one random mutation
    pub fn mutate<R: Rng + ?Sized>(&self, max_size: usize, rng: &mut R) -> Tree {
        let mutation = Mutation::random(self, max_size, rng);
        self.mutated(&mutation)
    }
}
