//! Iterative memoized game-tree search with sampled move ordering.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use santorini_core::{GameNode, Player, Position};
use tracing::{debug, info};

use crate::checkpoint::Checkpoint;
use crate::config::{SearchConfig, SearchMode};
use crate::error::CheckpointError;
use crate::sampler::{sample_score, Sample};
use crate::stats::SolverStats;

/// Absolute search result. The discriminants are the checkpoint encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum Label {
    WinP1 = 1,
    Undecided = 0,
    WinP2 = -1,
}

impl Label {
    /// Label for a win by `player`.
    #[inline]
    pub fn win_for(player: Player) -> Label {
        match player {
            Player::One => Label::WinP1,
            Player::Two => Label::WinP2,
        }
    }

    #[inline]
    pub fn winner(self) -> Option<Player> {
        match self {
            Label::WinP1 => Some(Player::One),
            Label::WinP2 => Some(Player::Two),
            Label::Undecided => None,
        }
    }

    #[inline]
    pub fn is_decided(self) -> bool {
        self != Label::Undecided
    }

    #[inline]
    pub fn as_i8(self) -> i8 {
        self as i8
    }

    pub fn from_i8(value: i8) -> Option<Label> {
        match value {
            1 => Some(Label::WinP1),
            0 => Some(Label::Undecided),
            -1 => Some(Label::WinP2),
            _ => None,
        }
    }
}

/// Memo table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// On the current search path.
    InProgress,
    /// Proven by exhaustive search or a terminal.
    Resolved(Label),
    /// Best-first guess. Never persisted, and re-searched in exhaustive mode.
    Estimated(Label),
}

/// Summary of one `solve_report` call.
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub label: Label,
    pub mode: SearchMode,
    /// True only for an exhaustive run that never cut a branch short.
    pub exhaustive: bool,
    pub stats: SolverStats,
}

/// Stack frame for the iterative search.
struct Frame<N: GameNode> {
    /// Memo key of this node
    key: N::Key,
    /// Side to move here
    mover: Player,
    /// Ordered children not yet visited
    pending: std::vec::IntoIter<N>,
    /// A child was won by the mover
    won: bool,
    /// A child came back undecided
    undecided: bool,
}

impl<N: GameNode> Frame<N> {
    fn label(&self) -> Label {
        if self.won {
            Label::win_for(self.mover)
        } else if self.undecided {
            Label::Undecided
        } else {
            // Every child (possibly none) is won by the opponent
            Label::win_for(self.mover.opponent())
        }
    }
}

/// Result of entering a node.
enum Entry<N: GameNode> {
    Resolved(Label),
    Expand(Frame<N>),
}

/// A search session. The memo table lives as long as the session.
pub struct Solver<N: GameNode> {
    /// Memo table: node key -> state
    pub memo: HashMap<N::Key, NodeState>,
    /// Search statistics
    pub stats: SolverStats,
    config: SearchConfig,
}

impl<N: GameNode> Solver<N> {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            memo: HashMap::new(),
            stats: SolverStats::new(),
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Memo state for a key, if any.
    pub fn state(&self, key: &N::Key) -> Option<NodeState> {
        self.memo.get(key).copied()
    }

    /// Order children by sampled score (descending), then by the depth of
    /// the first terminal (ascending). The sort is stable.
    fn order(&mut self, children: Vec<N>) -> Vec<N> {
        if self.config.sample_leaf_limit == 0 || children.len() < 2 {
            return children;
        }

        let leaf_limit = self.config.sample_leaf_limit;
        let node_budget = self.config.sample_node_budget;
        let mut scored: Vec<(Sample, N)> = children
            .into_iter()
            .map(|child| (sample_score(&child, leaf_limit, node_budget), child))
            .collect();
        self.stats.samples_taken += scored.len() as u64;

        scored.sort_by(|(a, _), (b, _)| {
            b.score
                .cmp(&a.score)
                .then(a.shallow_depth.cmp(&b.shallow_depth))
        });
        scored.into_iter().map(|(_, child)| child).collect()
    }

    /// Look a node up, classify it, or set it up for expansion.
    fn enter(&mut self, node: N) -> Entry<N> {
        let key = node.key();

        match self.memo.get(&key) {
            Some(NodeState::Resolved(label)) => {
                self.stats.cache_hits += 1;
                return Entry::Resolved(*label);
            }
            Some(NodeState::Estimated(label)) if self.config.mode == SearchMode::BestFirst => {
                self.stats.cache_hits += 1;
                return Entry::Resolved(*label);
            }
            Some(NodeState::InProgress) => {
                self.stats.in_progress_hits += 1;
                return Entry::Resolved(Label::Undecided);
            }
            Some(NodeState::Estimated(_)) | None => {}
        }

        if self.stats.nodes_visited >= self.config.max_nodes
            || self.memo.len() >= self.config.max_memo_entries
        {
            self.stats.budget_exhausted += 1;
            return Entry::Resolved(Label::Undecided);
        }
        self.stats.nodes_visited += 1;

        let mover = node.side_to_move();
        if let Some(winner) = node.outcome().winner(mover) {
            let label = Label::win_for(winner);
            self.memo.insert(key, NodeState::Resolved(label));
            self.stats.record_terminal(label);
            return Entry::Resolved(label);
        }

        let mut children = self.order(node.children());
        if self.config.mode == SearchMode::BestFirst {
            children.truncate(1);
        }

        self.memo.insert(key, NodeState::InProgress);
        Entry::Expand(Frame {
            key,
            mover,
            pending: children.into_iter(),
            won: false,
            undecided: false,
        })
    }

    /// Fold a child's label into its parent frame.
    fn absorb(&mut self, frame: &mut Frame<N>, label: Label) {
        match label.winner() {
            Some(winner) if winner == frame.mover => {
                frame.won = true;
                self.stats.branches_pruned += frame.pending.len() as u64;
            }
            Some(_) => {}
            None => frame.undecided = true,
        }
    }

    /// Solve from `root` and return its label.
    ///
    /// Exhaustive mode proves the label when no budget is hit. Best-first
    /// mode follows only the top-ranked child at each node.
    pub fn solve(&mut self, root: N) -> Label {
        let mut stack: Vec<Frame<N>> = Vec::with_capacity(128);

        match self.enter(root) {
            Entry::Resolved(label) => return label,
            Entry::Expand(frame) => stack.push(frame),
        }
        self.stats.max_depth = self.stats.max_depth.max(1);

        let mut root_label = Label::Undecided;

        while let Some(frame) = stack.last_mut() {
            if self.stats.should_log(self.config.log_interval_secs) {
                self.stats.log_progress(self.memo.len());
            }

            let next = if frame.won { None } else { frame.pending.next() };

            match next {
                Some(child) => match self.enter(child) {
                    Entry::Resolved(label) => self.absorb(frame, label),
                    Entry::Expand(child_frame) => {
                        stack.push(child_frame);
                        self.stats.max_depth = self.stats.max_depth.max(stack.len() as u64);
                    }
                },
                None => {
                    let Some(done) = stack.pop() else { break };
                    let label = done.label();
                    let state = if self.config.mode == SearchMode::BestFirst && label.is_decided() {
                        NodeState::Estimated(label)
                    } else {
                        NodeState::Resolved(label)
                    };
                    self.memo.insert(done.key, state);
                    self.stats.record_resolved(label);

                    match stack.last_mut() {
                        Some(parent) => self.absorb(parent, label),
                        None => root_label = label,
                    }
                }
            }
        }

        root_label
    }

    /// Solve and summarise the run.
    pub fn solve_report(&mut self, root: N) -> SolveReport {
        let budget_before = self.stats.budget_exhausted;
        let in_progress_before = self.stats.in_progress_hits;
        let start = Instant::now();

        let label = self.solve(root);

        let exhaustive = self.config.mode == SearchMode::Exhaustive
            && self.stats.budget_exhausted == budget_before
            && self.stats.in_progress_hits == in_progress_before;
        info!(
            ?label,
            mode = %self.config.mode,
            exhaustive,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "search finished"
        );

        SolveReport {
            label,
            mode: self.config.mode,
            exhaustive,
            stats: self.stats.clone(),
        }
    }
}

impl<N: GameNode> Default for Solver<N> {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl Solver<Position> {
    /// Write proven, decided memo entries to a checkpoint file.
    pub fn save_checkpoint(&self, path: &Path) -> Result<usize, CheckpointError> {
        let start = Instant::now();
        let count = Checkpoint::save(path, &self.memo)?;
        debug!(
            count,
            path = %path.display(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "checkpoint saved"
        );
        Ok(count)
    }

    /// Seed the memo table from a checkpoint file.
    pub fn load_checkpoint(&mut self, path: &Path) -> Result<usize, CheckpointError> {
        let start = Instant::now();
        let checkpoint = Checkpoint::load(path)?;
        let count = checkpoint.entries.len();
        self.memo.extend(
            checkpoint
                .entries
                .into_iter()
                .map(|(key, label)| (key, NodeState::Resolved(label))),
        );
        debug!(
            count,
            path = %path.display(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "checkpoint loaded"
        );
        Ok(count)
    }

    /// Proven label for a position, if the session has one.
    pub fn lookup(&self, position: &Position) -> Option<Label> {
        match self.memo.get(&position.key()) {
            Some(NodeState::Resolved(label)) => Some(*label),
            _ => None,
        }
    }
}
