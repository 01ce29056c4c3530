//! Hand-built game trees for search and sampler tests.

use std::rc::Rc;

use santorini_core::{GameNode, Outcome, Player};

#[derive(Debug)]
struct NodeDef {
    mover: Player,
    outcome: Outcome,
    children: Vec<usize>,
}

/// Builder for a table of nodes addressed by index.
#[derive(Default)]
pub struct ToyTree {
    defs: Vec<NodeDef>,
}

impl ToyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its id. Children may refer to ids added later.
    pub fn node(&mut self, mover: Player, outcome: Outcome, children: &[usize]) -> usize {
        self.defs.push(NodeDef {
            mover,
            outcome,
            children: children.to_vec(),
        });
        self.defs.len() - 1
    }

    /// Terminal node the mover has won.
    pub fn win(&mut self, mover: Player) -> usize {
        self.node(mover, Outcome::Win, &[])
    }

    /// Terminal node the mover has lost.
    pub fn loss(&mut self, mover: Player) -> usize {
        self.node(mover, Outcome::Loss, &[])
    }

    /// Interior node.
    pub fn open(&mut self, mover: Player, children: &[usize]) -> usize {
        self.node(mover, Outcome::Undecided, children)
    }

    /// Freeze the table and hand out a node to start from.
    pub fn finish(self, root: usize) -> ToyNode {
        ToyNode {
            defs: Rc::new(self.defs),
            id: root,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ToyNode {
    defs: Rc<Vec<NodeDef>>,
    id: usize,
}

impl ToyNode {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl GameNode for ToyNode {
    type Key = usize;

    fn key(&self) -> usize {
        self.id
    }

    fn side_to_move(&self) -> Player {
        self.defs[self.id].mover
    }

    fn outcome(&self) -> Outcome {
        self.defs[self.id].outcome
    }

    fn children(&self) -> Vec<ToyNode> {
        if self.outcome().is_decided() {
            return Vec::new();
        }
        self.defs[self.id]
            .children
            .iter()
            .map(|&id| ToyNode {
                defs: Rc::clone(&self.defs),
                id,
            })
            .collect()
    }
}

/// Ids for the pruning tree:
///
/// ```text
/// root (One) ── n1 (Two, won by Two)
///            └─ n2 (Two) ── n3 (One, won by One)
///                        └─ n4 (One, won by One)
/// ```
pub struct PruningTree {
    pub root: ToyNode,
    pub n1: usize,
    pub n2: usize,
}

pub fn pruning_tree() -> PruningTree {
    let mut tree = ToyTree::new();
    let n3 = tree.win(Player::One);
    let n4 = tree.win(Player::One);
    let n1 = tree.win(Player::Two);
    let n2 = tree.open(Player::Two, &[n3, n4]);
    let root = tree.open(Player::One, &[n1, n2]);
    PruningTree {
        root: tree.finish(root),
        n1,
        n2,
    }
}

/// A tree where the best-looking branch is the losing one:
///
/// ```text
/// root (One) ── a (Two) ── a1 (One, lost)
///            │          ├─ a2 (One, won)
///            │          └─ a3 (One, won)
///            └─ b (Two) ── b1 (One) ── b1a (Two, lost)
/// ```
///
/// Both `a` and `b` sample to score 1; `a` finds a terminal sooner and is
/// ranked first.
pub fn decoy_tree() -> ToyNode {
    let mut tree = ToyTree::new();
    let a1 = tree.loss(Player::One);
    let a2 = tree.win(Player::One);
    let a3 = tree.win(Player::One);
    let a = tree.open(Player::Two, &[a1, a2, a3]);
    let b1a = tree.loss(Player::Two);
    let b1 = tree.open(Player::One, &[b1a]);
    let b = tree.open(Player::Two, &[b1]);
    let root = tree.open(Player::One, &[a, b]);
    tree.finish(root)
}
