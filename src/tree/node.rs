//! Decision tree nodes, structural ids and evaluation.

use rand::Rng;
use std::fmt;

/// Terminal behaviours, in tag order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Idle,
    TurnLeft,
    TurnRight,
    MoveForward,
    Eat,
    Attack,
    Feed,
    Spawn,
}

impl ActionKind {
    pub const ALL: [ActionKind; 8] = [
        ActionKind::Idle,
        ActionKind::TurnLeft,
        ActionKind::TurnRight,
        ActionKind::MoveForward,
        ActionKind::Eat,
        ActionKind::Attack,
        ActionKind::Feed,
        ActionKind::Spawn,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Two-digit tag code; actions occupy `0..COUNT`
    #[inline]
    pub fn code(self) -> usize {
        self.index()
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::COUNT)]
    }

    /// Uniform pick among every action except `self`
    pub fn random_other<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let pick = rng.gen_range(0..Self::COUNT - 1);
        let index = if pick >= self.index() { pick + 1 } else { pick };
        Self::ALL[index]
    }
}

/// Branch predicates, in tag order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    FoodAhead,
    FoodLeft,
    FoodRight,
    OrganismAhead,
    OrganismLeft,
    OrganismRight,
    BiggerOrganismAhead,
    RelatedOrganismAhead,
    CoinFlip,
    HealthAboveHalf,
    PhComfortable,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 11] = [
        ConditionKind::FoodAhead,
        ConditionKind::FoodLeft,
        ConditionKind::FoodRight,
        ConditionKind::OrganismAhead,
        ConditionKind::OrganismLeft,
        ConditionKind::OrganismRight,
        ConditionKind::BiggerOrganismAhead,
        ConditionKind::RelatedOrganismAhead,
        ConditionKind::CoinFlip,
        ConditionKind::HealthAboveHalf,
        ConditionKind::PhComfortable,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Two-digit tag code; conditions follow the actions
    #[inline]
    pub fn code(self) -> usize {
        ActionKind::COUNT + self.index()
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::COUNT)]
    }

    /// Uniform pick among every condition except `self`
    pub fn random_other<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let pick = rng.gen_range(0..Self::COUNT - 1);
        let index = if pick >= self.index() { pick + 1 } else { pick };
        Self::ALL[index]
    }
}

// Every tag must fit the fixed two-digit encoding.
const _: () = assert!(ActionKind::COUNT + ConditionKind::COUNT <= 100);

/// Tag and children of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Action(ActionKind),
    Condition {
        condition: ConditionKind,
        yes: Box<Node>,
        no: Box<Node>,
    },
}

/// One vertex of a decision tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    used_in_active_tree: bool,
    used_last_cycle: bool,
}

impl Node {
    pub fn action(action: ActionKind) -> Self {
        Self {
            kind: NodeKind::Action(action),
            used_in_active_tree: false,
            used_last_cycle: false,
        }
    }

    pub fn condition(condition: ConditionKind, yes: Node, no: Node) -> Self {
        Self {
            kind: NodeKind::Condition {
                condition,
                yes: Box::new(yes),
                no: Box::new(no),
            },
            used_in_active_tree: false,
            used_last_cycle: false,
        }
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn used_in_active_tree(&self) -> bool {
        self.used_in_active_tree
    }

    #[inline]
    pub fn used_last_cycle(&self) -> bool {
        self.used_last_cycle
    }

    /// Tag code of this node alone
    pub fn code(&self) -> usize {
        match &self.kind {
            NodeKind::Action(action) => action.code(),
            NodeKind::Condition { condition, .. } => condition.code(),
        }
    }

    /// Node count of the subtree rooted here
    pub fn size(&self) -> usize {
        match &self.kind {
            NodeKind::Action(_) => 1,
            NodeKind::Condition { yes, no, .. } => 1 + yes.size() + no.size(),
        }
    }

    fn write_id(&self, out: &mut String) {
        use std::fmt::Write;
        // Writing to a String cannot fail.
        let _ = write!(out, "{:02}", self.code());
        if let NodeKind::Condition { yes, no, .. } = &self.kind {
            yes.write_id(out);
            no.write_id(out);
        }
    }

    /// Node at `index` in pre-order
    pub fn nth(&self, index: usize) -> Option<&Node> {
        let mut remaining = index;
        self.nth_inner(&mut remaining)
    }

    fn nth_inner(&self, remaining: &mut usize) -> Option<&Node> {
        if *remaining == 0 {
            return Some(self);
        }
        *remaining -= 1;
        match &self.kind {
            NodeKind::Action(_) => None,
            NodeKind::Condition { yes, no, .. } => {
                yes.nth_inner(remaining).or_else(|| no.nth_inner(remaining))
            }
        }
    }

    pub(crate) fn nth_mut(&mut self, index: usize) -> Option<&mut Node> {
        let mut remaining = index;
        self.nth_mut_inner(&mut remaining)
    }

    fn nth_mut_inner(&mut self, remaining: &mut usize) -> Option<&mut Node> {
        if *remaining == 0 {
            return Some(self);
        }
        *remaining -= 1;
        match &mut self.kind {
            NodeKind::Action(_) => None,
            NodeKind::Condition { yes, no, .. } => {
                if let Some(found) = yes.nth_mut_inner(remaining) {
                    return Some(found);
                }
                no.nth_mut_inner(remaining)
            }
        }
    }

    pub(crate) fn replace_kind(&mut self, kind: NodeKind) -> NodeKind {
        std::mem::replace(&mut self.kind, kind)
    }

    fn set_active(&mut self, active: bool) {
        self.used_in_active_tree = active;
        if let NodeKind::Condition { yes, no, .. } = &mut self.kind {
            yes.set_active(active);
            no.set_active(active);
        }
    }

    fn clear_usage(&mut self) {
        self.used_last_cycle = false;
        if let NodeKind::Condition { yes, no, .. } = &mut self.kind {
            yes.clear_usage();
            no.clear_usage();
        }
    }

    fn walk<F>(&mut self, test: &mut F) -> ActionKind
    where
        F: FnMut(ConditionKind) -> bool,
    {
        self.used_last_cycle = true;
        match &mut self.kind {
            NodeKind::Action(action) => *action,
            NodeKind::Condition { condition, yes, no } => {
                if test(*condition) {
                    yes.walk(test)
                } else {
                    no.walk(test)
                }
            }
        }
    }
}

/// Structural identity of a tree: its pre-order tag codes, two digits each
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(String);

impl TreeId {
    pub fn of(root: &Node) -> Self {
        let mut id = String::with_capacity(root.size() * 2);
        root.write_id(&mut id);
        Self(id)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A rooted decision tree with its fitness record
#[derive(Debug, Clone)]
pub struct Tree {
    root: Node,
    id: TreeId,
    size: usize,
    usage_count: u64,
    avg_health_delta: f32,
}

impl Tree {
    pub fn new(root: Node) -> Self {
        let id = TreeId::of(&root);
        let size = root.size();
        Self {
            root,
            id,
            size,
            usage_count: 0,
            avg_health_delta: 0.0,
        }
    }

    /// Bootstrap tree: a single action leaf
    pub fn from_action(action: ActionKind) -> Self {
        Self::new(Node::action(action))
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_action(ActionKind::random(rng))
    }

    #[inline]
    pub fn id(&self) -> &TreeId {
        &self.id
    }

    #[inline]
    pub fn root(&self) -> &Node {
        &self.root
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }

    #[inline]
    pub fn avg_health_delta(&self) -> f32 {
        self.avg_health_delta
    }

    /// Node at `index` in pre-order
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.root.nth(index)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.root.used_in_active_tree
    }

    #[inline]
    pub fn used_last_cycle(&self) -> bool {
        self.root.used_last_cycle
    }

    /// Active trees and trees walked last cycle must survive pruning
    #[inline]
    pub fn is_protected(&self) -> bool {
        self.is_active() || self.used_last_cycle()
    }

    /// Fold one cycle's health change into the running average
    pub fn record_health_delta(&mut self, delta: f32) {
        self.usage_count += 1;
        self.avg_health_delta += (delta - self.avg_health_delta) / self.usage_count as f32;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.root.set_active(active);
    }

    pub(crate) fn clear_usage(&mut self) {
        self.root.clear_usage();
    }

    /// Deep copy for a new owner; keeps usage marks, drops the active marks
    pub fn snapshot(&self) -> Tree {
        let mut copy = self.clone();
        copy.set_active(false);
        copy
    }

    /// Walk from the root, asking `test` at every branch, and return the
    /// action reached. Every visited node is marked as used this cycle.
    pub fn evaluate<F>(&mut self, mut test: F) -> ActionKind
    where
        F: FnMut(ConditionKind) -> bool,
    {
        self.root.walk(&mut test)
    }

    /// Rebuild a tree around an edited root, carrying over a fitness seed
    pub(crate) fn rebuilt(mut root: Node, avg_health_delta: f32) -> Self {
        root.clear_usage();
        root.set_active(false);
        let mut tree = Self::new(root);
        tree.avg_health_delta = avg_health_delta;
        tree
    }
}
