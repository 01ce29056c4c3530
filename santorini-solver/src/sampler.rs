//! Bounded breadth-first sampling used to order children.
//!
//! The sampler explores a node's subtree level by level, counting terminal
//! states by winner until it has seen `leaf_limit` of them or dequeued
//! `node_budget` nodes. Each distinct state is enqueued once.

use std::collections::{HashSet, VecDeque};

use santorini_core::{GameNode, Player};

/// `shallow_depth` when no terminal was reached.
pub const NO_TERMINAL: u32 = u32::MAX;

/// Sampler result for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Opponent wins minus mover wins among sampled terminals.
    /// Larger is worse for the node's side to move.
    pub score: i32,
    /// BFS depth of the first terminal found, or [`NO_TERMINAL`].
    pub shallow_depth: u32,
}

#[inline]
fn player_index(player: Player) -> usize {
    match player {
        Player::One => 0,
        Player::Two => 1,
    }
}

/// Sample the subtree under `node`.
pub fn sample_score<N: GameNode>(node: &N, leaf_limit: usize, node_budget: usize) -> Sample {
    let mover = node.side_to_move();
    let mut wins = [0i32; 2];
    let mut leaves = 0usize;
    let mut dequeued = 0usize;
    let mut shallow_depth = NO_TERMINAL;

    let mut seen: HashSet<N::Key> = HashSet::new();
    let mut queue: VecDeque<(N, u32)> = VecDeque::new();
    seen.insert(node.key());
    queue.push_back((node.clone(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        if leaves >= leaf_limit || dequeued >= node_budget {
            break;
        }
        dequeued += 1;

        if let Some(winner) = current.outcome().winner(current.side_to_move()) {
            wins[player_index(winner)] += 1;
            leaves += 1;
            if shallow_depth == NO_TERMINAL {
                shallow_depth = depth;
            }
            continue;
        }

        for child in current.children() {
            if seen.insert(child.key()) {
                queue.push_back((child, depth + 1));
            }
        }
    }

    Sample {
        score: wins[player_index(mover.opponent())] - wins[player_index(mover)],
        shallow_depth,
    }
}
