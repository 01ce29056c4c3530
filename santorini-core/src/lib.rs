//! Santorini game logic with bit-layer board representation.
//!
//! # Board Encoding
//!
//! ```text
//! Cells are bits 0-24 of a u32, row-major:
//!
//!    0  1  2  3  4
//!    5  6  7  8  9
//!   10 11 12 13 14
//!   15 16 17 18 19
//!   20 21 22 23 24
//!
//! Heights are four nested layers L1 ⊇ L2 ⊇ L3 ⊇ L4 (one u32 each).
//! A cell's height is the number of layers containing it; 4 is a dome.
//!
//! Pieces are single-bit masks in four slots:
//!   slot 0, 1: Player One (first, second)
//!   slot 2, 3: Player Two (first, second)
//! Within a side the lower cell index is stored first.
//! ```
//!
//! # Text Encoding
//!
//! ```text
//! |0400300002001303040111124|08050018|
//!  25 height digits          4 piece cells, 2 digits each
//! ```
//!
//! The side to move follows the parity of odd-height cells (even = One).
//! When a position disagrees with that rule a trailing `1` or `2` is
//! appended, giving a 37 character form.
//!
//! # Key Encoding (128-bit)
//!
//! ```text
//! Bits 0-74:  cell heights (25 cells × 3 bits)
//! Bits 75-94: piece cells (4 slots × 5 bits, canonical order)
//! Bit 95:     side to move (0 = One, 1 = Two)
//! ```

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "wasm")]
pub mod wasm;

/// Number of cells on the board.
pub const CELLS: usize = 25;

/// Mask with every cell bit set.
pub const BOARD_MASK: u32 = (1 << CELLS) - 1;

/// Length of the canonical text encoding without a turn marker.
pub const ENCODED_LEN: usize = 36;

/// A mid-game position used by the solver binary and tests.
pub const REFERENCE_POSITION: &str = "|0400300002001303040111124|08050018|";

/// Player identifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Player {
    One = 1,
    Two = 2,
}

impl Player {
    /// Get the opponent player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Parse an ASCII turn marker (`b'1'` or `b'2'`).
    #[inline]
    pub fn from_digit(digit: u8) -> Option<Player> {
        match digit {
            b'1' => Some(Player::One),
            b'2' => Some(Player::Two),
            _ => None,
        }
    }

    /// ASCII turn marker for this player.
    #[inline]
    pub fn digit(self) -> char {
        match self {
            Player::One => '1',
            Player::Two => '2',
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize - 1
    }
}

/// Which of a side's two (canonically ordered) pieces.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Worker {
    First = 0,
    Second = 1,
}

impl Worker {
    /// Both workers, in generation order.
    pub const ALL: [Worker; 2] = [Worker::First, Worker::Second];
}

/// Piece slot for a player's worker.
#[inline]
const fn slot(player: Player, worker: Worker) -> usize {
    player.index() * 2 + worker as usize
}

/// Cell on the 5x5 board (0-24).
///
/// Layout:
/// ```text
///    0  1  2  3  4
///    5  6  7  8  9
///   10 11 12 13 14
///   15 16 17 18 19
///   20 21 22 23 24
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell(pub u8);

impl Cell {
    /// Create a cell from row and column (0-4 each).
    #[inline]
    pub fn from_row_col(row: u8, col: u8) -> Cell {
        debug_assert!(row < 5 && col < 5);
        Cell(row * 5 + col)
    }

    /// Get the row (0-4).
    #[inline]
    pub fn row(self) -> u8 {
        self.0 / 5
    }

    /// Get the column (0-4).
    #[inline]
    pub fn col(self) -> u8 {
        self.0 % 5
    }

    /// Check if this is a valid cell (0-24).
    #[inline]
    pub fn is_valid(self) -> bool {
        (self.0 as usize) < CELLS
    }

    /// Single-bit mask for this cell.
    #[inline]
    pub const fn mask(self) -> u32 {
        1 << self.0
    }

    /// Recover a cell from a single-bit mask.
    #[inline]
    pub fn from_mask(mask: u32) -> Option<Cell> {
        if mask.count_ones() == 1 && mask & !BOARD_MASK == 0 {
            Some(Cell(mask.trailing_zeros() as u8))
        } else {
            None
        }
    }

    /// King-move neighbourhood of this cell.
    #[inline]
    pub fn neighbors(self) -> CellSet {
        CellSet(NEIGHBORS[self.0 as usize])
    }

    /// Iterate over all 25 cells.
    pub fn all() -> impl Iterator<Item = Cell> {
        (0..CELLS as u8).map(Cell)
    }
}

/// A set of cells as a 25-bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellSet(pub u32);

impl CellSet {
    /// The empty set.
    pub const EMPTY: CellSet = CellSet(0);

    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, cell: Cell) -> bool {
        self.0 & cell.mask() != 0
    }

    /// Iterate over member cells in ascending order.
    #[inline]
    pub fn iter(self) -> CellIter {
        CellIter(self.0)
    }
}

impl IntoIterator for CellSet {
    type Item = Cell;
    type IntoIter = CellIter;

    fn into_iter(self) -> CellIter {
        self.iter()
    }
}

impl fmt::Debug for CellSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|cell| cell.0)).finish()
    }
}

/// Iterator over the cells of a [`CellSet`], lowest index first.
pub struct CellIter(u32);

impl Iterator for CellIter {
    type Item = Cell;

    #[inline]
    fn next(&mut self) -> Option<Cell> {
        if self.0 == 0 {
            return None;
        }
        let idx = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(Cell(idx as u8))
    }
}

const fn king_masks() -> [u32; CELLS] {
    let mut masks = [0u32; CELLS];
    let mut idx = 0;
    while idx < CELLS {
        let row = (idx / 5) as i32;
        let col = (idx % 5) as i32;
        let mut dr = -1;
        while dr <= 1 {
            let mut dc = -1;
            while dc <= 1 {
                let r = row + dr;
                let c = col + dc;
                if (dr != 0 || dc != 0) && r >= 0 && r < 5 && c >= 0 && c < 5 {
                    masks[idx] |= 1u32 << ((r * 5 + c) as u32);
                }
                dc += 1;
            }
            dr += 1;
        }
        idx += 1;
    }
    masks
}

/// King-move masks for each of the 25 cells, indexed by cell.
pub const NEIGHBORS: [u32; CELLS] = king_masks();

/// One full turn: move a worker, then build next to its new cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct MoveBuild {
    /// Destination of the moving worker.
    pub to: Cell,
    /// Cell raised by one level after the move.
    pub build: Cell,
    /// Side making the move.
    pub player: Player,
    /// Which of that side's workers moves.
    pub worker: Worker,
}

impl MoveBuild {
    #[inline]
    fn slot(&self) -> usize {
        slot(self.player, self.worker)
    }
}

/// Max possible actions: 2 workers × 8 destinations × 8 builds.
pub const MAX_MOVE_BUILDS: usize = 128;

/// A fixed-size action list that avoids heap allocation.
#[derive(Clone, Copy)]
pub struct MoveBuildList {
    items: [MoveBuild; MAX_MOVE_BUILDS],
    len: u8,
}

impl MoveBuildList {
    const FILLER: MoveBuild = MoveBuild {
        to: Cell(0),
        build: Cell(0),
        player: Player::One,
        worker: Worker::First,
    };

    /// Create an empty list.
    #[inline]
    pub const fn new() -> MoveBuildList {
        MoveBuildList {
            items: [Self::FILLER; MAX_MOVE_BUILDS],
            len: 0,
        }
    }

    /// Add an action to the list.
    #[inline]
    pub fn push(&mut self, mb: MoveBuild) {
        debug_assert!((self.len as usize) < MAX_MOVE_BUILDS);
        self.items[self.len as usize] = mb;
        self.len += 1;
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get an action by index.
    #[inline]
    pub const fn get(&self, idx: usize) -> MoveBuild {
        self.items[idx]
    }

    /// Iterate over actions in generation order.
    pub fn iter(&self) -> impl Iterator<Item = MoveBuild> + '_ {
        self.items[..self.len as usize].iter().copied()
    }

    /// Copy the actions into a `Vec`.
    pub fn to_vec(&self) -> Vec<MoveBuild> {
        self.items[..self.len as usize].to_vec()
    }
}

impl Default for MoveBuildList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MoveBuildList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Game-theoretic status of a position, from the side to move's view.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The side to move has a move onto a height-3 cell.
    Win,
    /// The side to move has no legal move-build.
    Loss,
    /// Neither; the position must be expanded.
    Undecided,
}

impl Outcome {
    #[inline]
    pub fn is_decided(self) -> bool {
        self != Outcome::Undecided
    }

    /// Absolute winner, given who is to move.
    #[inline]
    pub fn winner(self, mover: Player) -> Option<Player> {
        match self {
            Outcome::Win => Some(mover),
            Outcome::Loss => Some(mover.opponent()),
            Outcome::Undecided => None,
        }
    }
}

/// Rejected text encodings and keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected 36 or 37 characters, got {actual}")]
    WrongLength { actual: usize },

    #[error("expected '|' at offset {offset}")]
    MissingSeparator { offset: usize },

    #[error("invalid height {found:?} at cell {cell}")]
    InvalidHeight { cell: usize, found: char },

    #[error("piece field {slot} is not a two-digit number: {text:?}")]
    InvalidPieceField { slot: usize, text: String },

    #[error("piece field {slot} names cell {index}, outside the board")]
    PieceOutOfRange { slot: usize, index: u8 },

    #[error("two pieces share cell {cell}")]
    PiecesOverlap { cell: u8 },

    #[error("piece on cell {cell} stands on a dome")]
    PieceOnDome { cell: u8 },

    #[error("invalid turn marker {found:?}, expected '1' or '2'")]
    InvalidTurn { found: char },

    #[error("not a canonical position key: {key:#x}")]
    InvalidKey { key: u128 },
}

/// Caller errors against the rules API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("mask {mask:#x} is not one of the position's pieces")]
    NotAPiece { mask: u32 },
}

/// Packed canonical form of a position, used as the memo key.
///
/// See module documentation for the bit layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct PositionKey(pub u128);

impl PositionKey {
    const HEIGHT_BITS: u32 = 3;
    const PIECE_SHIFT: u32 = 75;
    const PIECE_BITS: u32 = 5;
    const TURN_BIT: u32 = 95;
}

/// Capabilities the search engine needs from a game-tree node.
pub trait GameNode: Clone {
    /// Transposition key; equal keys mean equal game states.
    type Key: Copy + Eq + Hash + fmt::Debug;

    fn key(&self) -> Self::Key;

    fn side_to_move(&self) -> Player;

    fn outcome(&self) -> Outcome;

    /// Successor nodes. Empty for decided nodes.
    fn children(&self) -> Vec<Self>;
}

/// Side to move implied by the parity of odd-height cells.
#[inline]
fn parity_turn(layers: &[u32; 4]) -> Player {
    let odd = layers[0] ^ layers[1] ^ layers[2] ^ layers[3];
    if odd.count_ones() % 2 == 0 {
        Player::One
    } else {
        Player::Two
    }
}

fn layers_from_heights(heights: &[u8; CELLS]) -> [u32; 4] {
    let mut layers = [0u32; 4];
    for (cell, &height) in heights.iter().enumerate() {
        for (level, layer) in layers.iter_mut().enumerate() {
            if height as usize > level {
                *layer |= 1 << cell;
            }
        }
    }
    layers
}

/// Immutable game state: height layers, four pieces, side to move.
///
/// See module documentation for encoding details.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Position {
    layers: [u32; 4],
    pieces: [u32; 4],
    turn: Player,
}

impl Position {
    /// Build a position from per-cell heights and piece cells.
    ///
    /// Pieces are given in slot order (One first, One second, Two first,
    /// Two second) and kept as given.
    pub fn from_parts(
        heights: [u8; CELLS],
        pieces: [Cell; 4],
        turn: Player,
    ) -> Result<Position, DecodeError> {
        for (cell, &height) in heights.iter().enumerate() {
            if height > 4 {
                return Err(DecodeError::InvalidHeight {
                    cell,
                    found: char::from_digit(height as u32, 10).unwrap_or('?'),
                });
            }
        }
        Self::from_layers(layers_from_heights(&heights), pieces, turn)
    }

    fn from_layers(
        layers: [u32; 4],
        pieces: [Cell; 4],
        turn: Player,
    ) -> Result<Position, DecodeError> {
        let mut masks = [0u32; 4];
        let mut occupied = 0u32;
        for (slot, &cell) in pieces.iter().enumerate() {
            if !cell.is_valid() {
                return Err(DecodeError::PieceOutOfRange { slot, index: cell.0 });
            }
            let mask = cell.mask();
            if occupied & mask != 0 {
                return Err(DecodeError::PiecesOverlap { cell: cell.0 });
            }
            if layers[3] & mask != 0 {
                return Err(DecodeError::PieceOnDome { cell: cell.0 });
            }
            occupied |= mask;
            masks[slot] = mask;
        }
        Ok(Position {
            layers,
            pieces: masks,
            turn,
        })
    }

    // ========== Accessors ==========

    /// Side to move.
    #[inline]
    pub fn side_to_move(&self) -> Player {
        self.turn
    }

    /// Height of a cell (0-4).
    #[inline]
    pub fn height(&self, cell: Cell) -> u8 {
        let bit = cell.mask();
        self.layers.iter().filter(|&&layer| layer & bit != 0).count() as u8
    }

    /// Heights of all cells in cell order.
    pub fn heights(&self) -> [u8; CELLS] {
        let mut heights = [0u8; CELLS];
        for cell in Cell::all() {
            heights[cell.0 as usize] = self.height(cell);
        }
        heights
    }

    /// Cells of height at least `level` (1-4).
    #[inline]
    pub fn layer(&self, level: usize) -> CellSet {
        debug_assert!((1..=4).contains(&level));
        CellSet(self.layers[level - 1])
    }

    /// Capped cells.
    #[inline]
    pub fn domes(&self) -> CellSet {
        CellSet(self.layers[3])
    }

    /// Raw piece masks in slot order.
    #[inline]
    pub fn piece_masks(&self) -> [u32; 4] {
        self.pieces
    }

    /// Cell of a player's worker.
    #[inline]
    pub fn piece(&self, player: Player, worker: Worker) -> Cell {
        Cell(self.pieces[slot(player, worker)].trailing_zeros() as u8)
    }

    /// Both cells of a player's workers, first worker first.
    pub fn pieces(&self, player: Player) -> [Cell; 2] {
        [
            self.piece(player, Worker::First),
            self.piece(player, Worker::Second),
        ]
    }

    /// Which worker stands on a cell, if any.
    pub fn piece_at(&self, cell: Cell) -> Option<(Player, Worker)> {
        let bit = cell.mask();
        let slot = self.pieces.iter().position(|&piece| piece == bit)?;
        let player = if slot < 2 { Player::One } else { Player::Two };
        let worker = if slot % 2 == 0 { Worker::First } else { Worker::Second };
        Some((player, worker))
    }

    /// Cells holding any piece.
    #[inline]
    pub fn occupied(&self) -> u32 {
        self.pieces[0] | self.pieces[1] | self.pieces[2] | self.pieces[3]
    }

    // ========== Canonical Form ==========

    /// Copy with each side's pieces in ascending cell order.
    #[inline]
    pub fn canonical(&self) -> Position {
        let mut canonical = *self;
        canonical.sort_pieces();
        canonical
    }

    /// Whether each side's pieces are already in ascending order.
    #[inline]
    pub fn is_canonical(&self) -> bool {
        self.pieces[0] < self.pieces[1] && self.pieces[2] < self.pieces[3]
    }

    #[inline]
    fn sort_pieces(&mut self) {
        if self.pieces[0] > self.pieces[1] {
            self.pieces.swap(0, 1);
        }
        if self.pieces[2] > self.pieces[3] {
            self.pieces.swap(2, 3);
        }
    }

    // ========== Move Generation ==========

    fn slot_of(&self, piece: u32) -> Result<usize, CoreError> {
        if piece.count_ones() == 1 {
            if let Some(slot) = self.pieces.iter().position(|&p| p == piece) {
                return Ok(slot);
            }
        }
        Err(CoreError::NotAPiece { mask: piece })
    }

    /// Destinations for a piece: free, uncapped, at most one level up.
    #[inline]
    fn move_mask(&self, piece: u32) -> u32 {
        let idx = piece.trailing_zeros() as usize;
        let mut mask = NEIGHBORS[idx] & !(self.occupied() | self.layers[3]);
        // Not at least 1 high: can't reach 2 or 3
        if piece & self.layers[0] == 0 {
            mask &= !self.layers[1];
        }
        // Not at least 2 high: can't reach 3
        if piece & self.layers[1] == 0 {
            mask &= !self.layers[2];
        }
        mask
    }

    /// Build targets around a piece: free and uncapped.
    #[inline]
    fn build_mask(&self, piece: u32) -> u32 {
        let idx = piece.trailing_zeros() as usize;
        NEIGHBORS[idx] & !(self.occupied() | self.layers[3])
    }

    /// Legal destination cells for one of the four pieces.
    pub fn legal_moves(&self, piece: u32) -> Result<CellSet, CoreError> {
        self.slot_of(piece)?;
        Ok(CellSet(self.move_mask(piece)))
    }

    /// Cells the given piece could build on from where it stands.
    ///
    /// Call this on the post-move position.
    pub fn legal_builds(&self, piece: u32) -> Result<CellSet, CoreError> {
        self.slot_of(piece)?;
        Ok(CellSet(self.build_mask(piece)))
    }

    /// All move-build actions for the side to move.
    ///
    /// A move that leaves no build is dropped.
    pub fn legal_move_builds(&self) -> MoveBuildList {
        let player = self.turn;
        let mut list = MoveBuildList::new();

        for worker in Worker::ALL {
            let slot = slot(player, worker);
            for to in CellSet(self.move_mask(self.pieces[slot])) {
                // Builds are computed with the worker already moved
                let mut moved = *self;
                moved.pieces[slot] = to.mask();
                for build in CellSet(moved.build_mask(to.mask())) {
                    list.push(MoveBuild {
                        to,
                        build,
                        player,
                        worker,
                    });
                }
            }
        }

        list
    }

    /// Whether the action steps onto a height-3 cell.
    #[inline]
    pub fn is_winning(&self, mb: MoveBuild) -> bool {
        self.layers[2] & !self.layers[3] & mb.to.mask() != 0
    }

    // ========== Apply ==========

    /// Apply an action produced by [`Position::legal_move_builds`].
    ///
    /// Moves the worker, raises the build cell by one layer, re-sorts each
    /// side's pieces and passes the turn.
    pub fn apply(&self, mb: MoveBuild) -> Position {
        let slot = mb.slot();
        debug_assert!(self.move_mask(self.pieces[slot]) & mb.to.mask() != 0);

        let mut next = *self;
        next.pieces[slot] = mb.to.mask();

        let bit = mb.build.mask();
        debug_assert!(next.build_mask(mb.to.mask()) & bit != 0);
        if let Some(layer) = next.layers.iter_mut().find(|layer| **layer & bit == 0) {
            *layer |= bit;
        }

        next.sort_pieces();
        next.turn = next.turn.opponent();
        next
    }

    // ========== Outcome ==========

    /// Classify the position for the side to move.
    pub fn outcome(&self) -> Outcome {
        self.classify(&self.legal_move_builds())
    }

    fn classify(&self, actions: &MoveBuildList) -> Outcome {
        if actions.is_empty() {
            Outcome::Loss
        } else if actions.iter().any(|mb| self.is_winning(mb)) {
            Outcome::Win
        } else {
            Outcome::Undecided
        }
    }

    /// Successor positions. Decided positions have none.
    pub fn children(&self) -> Vec<Position> {
        let actions = self.legal_move_builds();
        if self.classify(&actions).is_decided() {
            return Vec::new();
        }
        actions.iter().map(|mb| self.apply(mb)).collect()
    }

    // ========== Encoding ==========

    /// Canonical text encoding.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(ENCODED_LEN + 1);
        out.push('|');
        for cell in Cell::all() {
            out.push(char::from(b'0' + self.height(cell)));
        }
        out.push('|');
        for &piece in &self.pieces {
            let idx = piece.trailing_zeros() as u8;
            out.push(char::from(b'0' + idx / 10));
            out.push(char::from(b'0' + idx % 10));
        }
        out.push('|');
        if self.turn != parity_turn(&self.layers) {
            out.push(self.turn.digit());
        }
        out
    }

    /// Parse a text encoding. Piece order is kept as written.
    pub fn decode(s: &str) -> Result<Position, DecodeError> {
        let bytes = s.as_bytes();
        if bytes.len() != ENCODED_LEN && bytes.len() != ENCODED_LEN + 1 {
            return Err(DecodeError::WrongLength {
                actual: bytes.len(),
            });
        }
        for offset in [0, 26, 35] {
            if bytes[offset] != b'|' {
                return Err(DecodeError::MissingSeparator { offset });
            }
        }

        let mut heights = [0u8; CELLS];
        for (cell, &byte) in bytes[1..26].iter().enumerate() {
            match byte {
                b'0'..=b'4' => heights[cell] = byte - b'0',
                _ => {
                    return Err(DecodeError::InvalidHeight {
                        cell,
                        found: byte as char,
                    })
                }
            }
        }

        let mut pieces = [Cell(0); 4];
        for (slot, piece) in pieces.iter_mut().enumerate() {
            let field = &bytes[27 + slot * 2..29 + slot * 2];
            if !field.iter().all(u8::is_ascii_digit) {
                return Err(DecodeError::InvalidPieceField {
                    slot,
                    text: String::from_utf8_lossy(field).into_owned(),
                });
            }
            *piece = Cell((field[0] - b'0') * 10 + (field[1] - b'0'));
        }

        let layers = layers_from_heights(&heights);
        let turn = match bytes.get(ENCODED_LEN) {
            None => parity_turn(&layers),
            Some(&marker) => Player::from_digit(marker).ok_or(DecodeError::InvalidTurn {
                found: marker as char,
            })?,
        };

        Self::from_layers(layers, pieces, turn)
    }

    /// Packed canonical key (pieces sorted, turn included).
    pub fn key(&self) -> PositionKey {
        let canonical = self.canonical();
        let mut bits = 0u128;
        for cell in Cell::all() {
            bits |= (canonical.height(cell) as u128) << (cell.0 as u32 * PositionKey::HEIGHT_BITS);
        }
        for (slot, &piece) in canonical.pieces.iter().enumerate() {
            let shift = PositionKey::PIECE_SHIFT + slot as u32 * PositionKey::PIECE_BITS;
            bits |= (piece.trailing_zeros() as u128) << shift;
        }
        if canonical.turn == Player::Two {
            bits |= 1 << PositionKey::TURN_BIT;
        }
        PositionKey(bits)
    }

    /// Rebuild a position from its key. Only canonical keys are accepted.
    pub fn from_key(key: PositionKey) -> Result<Position, DecodeError> {
        let bits = key.0;
        if bits >> (PositionKey::TURN_BIT + 1) != 0 {
            return Err(DecodeError::InvalidKey { key: bits });
        }

        let mut heights = [0u8; CELLS];
        for (cell, height) in heights.iter_mut().enumerate() {
            *height = ((bits >> (cell as u32 * PositionKey::HEIGHT_BITS)) & 0b111) as u8;
        }
        let mut pieces = [Cell(0); 4];
        for (slot, piece) in pieces.iter_mut().enumerate() {
            let shift = PositionKey::PIECE_SHIFT + slot as u32 * PositionKey::PIECE_BITS;
            *piece = Cell(((bits >> shift) & 0b11111) as u8);
        }
        let turn = if (bits >> PositionKey::TURN_BIT) & 1 == 1 {
            Player::Two
        } else {
            Player::One
        };

        let position = Self::from_parts(heights, pieces, turn)?;
        if !position.is_canonical() {
            return Err(DecodeError::InvalidKey { key: bits });
        }
        Ok(position)
    }
}

impl GameNode for Position {
    type Key = PositionKey;

    #[inline]
    fn key(&self) -> PositionKey {
        Position::key(self)
    }

    #[inline]
    fn side_to_move(&self) -> Player {
        self.turn
    }

    #[inline]
    fn outcome(&self) -> Outcome {
        Position::outcome(self)
    }

    fn children(&self) -> Vec<Position> {
        Position::children(self)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Position {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Position, DecodeError> {
        Position::decode(s)
    }
}

impl TryFrom<String> for Position {
    type Error = DecodeError;

    fn try_from(s: String) -> Result<Position, DecodeError> {
        Position::decode(&s)
    }
}

impl From<Position> for String {
    fn from(position: Position) -> String {
        position.encode()
    }
}
