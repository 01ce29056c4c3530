//! WASM bindings for santorini-core
//!
//! Exposes positions to JavaScript through the text encoding, so a browser
//! board can round-trip state with the solver's exports.

use wasm_bindgen::prelude::*;

use crate::{Cell, MoveBuild, Outcome, Player, Position, Worker};

/// WASM-friendly wrapper around Position
#[wasm_bindgen]
pub struct WasmPosition {
    inner: Position,
}

#[wasm_bindgen]
impl WasmPosition {
    /// Parse a position from its text encoding
    #[wasm_bindgen(constructor)]
    pub fn new(encoding: &str) -> Result<WasmPosition, JsError> {
        let inner = Position::decode(encoding)?;
        Ok(WasmPosition { inner })
    }

    /// Text encoding of the position
    pub fn encode(&self) -> String {
        self.inner.encode()
    }

    /// Canonical key as a hex string (u128 does not cross the boundary)
    #[wasm_bindgen(js_name = keyHex)]
    pub fn key_hex(&self) -> String {
        format!("{:032x}", self.inner.key().0)
    }

    /// Side to move (1 or 2)
    #[wasm_bindgen(js_name = sideToMove)]
    pub fn side_to_move(&self) -> u8 {
        self.inner.side_to_move() as u8
    }

    /// Heights of all 25 cells, row-major
    pub fn heights(&self) -> Vec<u8> {
        self.inner.heights().to_vec()
    }

    /// Height of one cell (0-4; 4 is a dome)
    pub fn height(&self, cell: u8) -> u8 {
        let cell = Cell(cell);
        if cell.is_valid() {
            self.inner.height(cell)
        } else {
            0
        }
    }

    /// Owner of the piece on `cell` (1 or 2), or 0 for an empty cell
    #[wasm_bindgen(js_name = pieceAt)]
    pub fn piece_at(&self, cell: u8) -> u8 {
        let cell = Cell(cell);
        if !cell.is_valid() {
            return 0;
        }
        self.inner
            .piece_at(cell)
            .map_or(0, |(player, _)| player as u8)
    }

    /// Piece cells in slot order: One first, One second, Two first, Two second
    pub fn pieces(&self) -> Vec<u8> {
        let [a, b] = self.inner.pieces(Player::One);
        let [c, d] = self.inner.pieces(Player::Two);
        vec![a.0, b.0, c.0, d.0]
    }

    /// Legal destinations for the piece on `cell`, or an error if none stands there
    #[wasm_bindgen(js_name = legalMoves)]
    pub fn legal_moves(&self, cell: u8) -> Result<Vec<u8>, JsError> {
        let moves = self.inner.legal_moves(1u32.checked_shl(cell as u32).unwrap_or(0))?;
        Ok(moves.iter().map(|c| c.0).collect())
    }

    /// All move-builds as JSON: [{ worker: 0|1, to: n, build: n }]
    #[wasm_bindgen(js_name = legalMoveBuilds)]
    pub fn legal_move_builds(&self) -> Result<JsValue, JsError> {
        let actions = move_build_rows(&self.inner);
        Ok(serde_wasm_bindgen::to_value(&actions)?)
    }

    /// Apply a move-build for the side to move. Returns true if it was legal.
    #[wasm_bindgen(js_name = applyMoveBuild)]
    pub fn apply_move_build(&mut self, worker: u8, to: u8, build: u8) -> bool {
        let worker = match worker {
            0 => Worker::First,
            1 => Worker::Second,
            _ => return false,
        };
        let mb = MoveBuild {
            to: Cell(to),
            build: Cell(build),
            player: self.inner.side_to_move(),
            worker,
        };

        if !self.inner.legal_move_builds().iter().any(|legal| legal == mb) {
            return false;
        }

        self.inner = self.inner.apply(mb);
        true
    }

    /// "win", "loss" or "undecided" for the side to move
    pub fn outcome(&self) -> String {
        match self.inner.outcome() {
            Outcome::Win => "win".to_string(),
            Outcome::Loss => "loss".to_string(),
            Outcome::Undecided => "undecided".to_string(),
        }
    }
}

/// Serializable move-build for JavaScript
#[derive(serde::Serialize)]
struct WasmMoveBuild {
    worker: u8,
    to: u8,
    build: u8,
}

impl From<MoveBuild> for WasmMoveBuild {
    fn from(mb: MoveBuild) -> Self {
        WasmMoveBuild {
            worker: mb.worker as u8,
            to: mb.to.0,
            build: mb.build.0,
        }
    }
}

fn move_build_rows(position: &Position) -> Vec<WasmMoveBuild> {
    position
        .legal_move_builds()
        .iter()
        .map(WasmMoveBuild::from)
        .collect()
}
