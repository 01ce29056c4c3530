//! Fixture-driven scenario tests
//!
//! Loads hand-checked positions from `tests/fixtures/positions.json` and
//! verifies, for each one:
//! - Text encoding round-trip and canonical form
//! - Side to move
//! - Outcome classification
//! - Move-build count (where recorded)

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rand::prelude::*;
use santorini_core::{GameNode, Outcome, Player, Position, REFERENCE_POSITION};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Fixtures {
    version: String,
    positions: Vec<Scenario>,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    description: String,
    encoding: String,
    canonical: Position,
    side_to_move: Player,
    outcome: Outcome,
    move_build_count: Option<usize>,
}

fn load_fixtures() -> Fixtures {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/positions.json");
    let file = File::open(&path).expect("Failed to open fixture file");
    serde_json::from_reader(BufReader::new(file)).expect("Failed to parse fixtures")
}

#[test]
fn test_fixture_scenarios() {
    let fixtures = load_fixtures();
    assert_eq!(fixtures.version, "1");
    assert!(!fixtures.positions.is_empty());

    let mut failures: Vec<String> = Vec::new();

    for scenario in &fixtures.positions {
        let mut errors: Vec<String> = Vec::new();
        let position = match Position::decode(&scenario.encoding) {
            Ok(position) => position,
            Err(e) => {
                failures.push(format!("{}: decode failed: {}", scenario.description, e));
                continue;
            }
        };

        if position.encode() != scenario.encoding {
            errors.push(format!("round-trip gave {}", position.encode()));
        }
        if position.canonical() != scenario.canonical {
            errors.push(format!(
                "canonical: expected {}, got {}",
                scenario.canonical,
                position.canonical()
            ));
        }
        if position.side_to_move() != scenario.side_to_move {
            errors.push(format!(
                "side to move: expected {:?}, got {:?}",
                scenario.side_to_move,
                position.side_to_move()
            ));
        }
        if position.outcome() != scenario.outcome {
            errors.push(format!(
                "outcome: expected {:?}, got {:?}",
                scenario.outcome,
                position.outcome()
            ));
        }
        if let Some(expected) = scenario.move_build_count {
            let actual = position.legal_move_builds().len();
            if actual != expected {
                errors.push(format!("move-builds: expected {}, got {}", expected, actual));
            }
        }

        if !errors.is_empty() {
            failures.push(format!("{}:\n  {}", scenario.description, errors.join("\n  ")));
        }
    }

    assert!(failures.is_empty(), "fixture failures:\n{}", failures.join("\n"));
}

#[test]
fn test_children_are_distinct_states() {
    for scenario in load_fixtures().positions {
        let position: Position = scenario.encoding.parse().unwrap();
        let children = position.children();
        if scenario.outcome.is_decided() {
            assert!(children.is_empty(), "{}", scenario.description);
            continue;
        }
        // Each action changes either a piece cell or the build cell, so no
        // two actions collide
        let keys: HashSet<_> = children.iter().map(|child| child.key()).collect();
        assert_eq!(keys.len(), children.len(), "{}", scenario.description);
    }
}

#[test]
fn test_game_node_view_matches_position() {
    fn summary<N: GameNode>(node: &N) -> (Player, Outcome, usize) {
        (node.side_to_move(), node.outcome(), node.children().len())
    }

    let position = Position::decode(REFERENCE_POSITION).unwrap();
    let (side, outcome, count) = summary(&position);
    assert_eq!(side, Player::One);
    assert_eq!(outcome, Outcome::Undecided);
    assert_eq!(count, position.legal_move_builds().len());
    assert_eq!(GameNode::key(&position), position.canonical().key());
}

/// Every ply adds one level and the board holds at most 100, so every
/// game ends, and one side's loss is always the other's win.
#[test]
fn test_random_games_terminate() {
    let mut rng = rand::rng();

    for _ in 0..300 {
        let mut position = Position::decode(REFERENCE_POSITION).unwrap();
        let mut plies = 0;

        let outcome = loop {
            let outcome = position.outcome();
            if outcome.is_decided() {
                break outcome;
            }
            let actions = position.legal_move_builds();
            let mb = actions.get(rng.random_range(0..actions.len()));
            position = position.apply(mb);
            plies += 1;
            assert!(plies <= 100, "game did not terminate");
        };

        let winner = outcome.winner(position.side_to_move());
        assert!(winner.is_some());
        if outcome == Outcome::Loss {
            assert!(position.legal_move_builds().is_empty());
        }
    }
}
