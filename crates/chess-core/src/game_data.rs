use serde::{Deserialize, Serialize};
use shakmaty::{san::San, Chess, Color, Move, Position};

use crate::notation;
use crate::PgnError;

/// Recorded outcome of a game, as found in the `Result` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Unknown,
}

impl GameResult {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "1-0" => GameResult::WhiteWins,
            "0-1" => GameResult::BlackWins,
            "1/2-1/2" => GameResult::Draw,
            _ => GameResult::Unknown,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
            GameResult::Unknown => "*",
        }
    }

    /// Side credited with the game. Draws and unfinished games count for white.
    pub fn winner(&self) -> Color {
        match self {
            GameResult::BlackWins => Color::Black,
            _ => Color::White,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameHeaders {
    pub white: String,
    pub black: String,
    pub white_elo: Option<u16>,
    pub black_elo: Option<u16>,
    pub result: GameResult,
    pub event: Option<String>,
}

impl Default for GameHeaders {
    fn default() -> Self {
        Self {
            white: "?".to_string(),
            black: "?".to_string(),
            white_elo: None,
            black_elo: None,
            result: GameResult::Unknown,
            event: None,
        }
    }
}

impl GameHeaders {
    /// List label, e.g. `Carlsen vs Nepomniachtchi [1-0]`.
    pub fn label(&self) -> String {
        format!("{} vs {} [{}]", self.white, self.black, self.result.as_tag())
    }
}

/// One recorded halfmove: the move and its SAN in the position it was played from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halfmove {
    pub mv: Move,
    pub san: String,
}

/// A recorded game replayed by a shadow session. Immutable once built.
#[derive(Debug, Clone)]
pub struct ReferenceGame {
    headers: GameHeaders,
    halfmoves: Vec<Halfmove>,
}

impl ReferenceGame {
    /// Build a game from its mainline in SAN, validating every move from the start position.
    pub fn from_san<S: AsRef<str>>(headers: GameHeaders, moves: &[S]) -> Result<Self, PgnError> {
        let mut pos = Chess::default();
        let mut halfmoves = Vec::with_capacity(moves.len());

        for (ply, text) in moves.iter().enumerate() {
            let text = text.as_ref();
            let san: San = text.parse().map_err(|_| PgnError::IllegalSan {
                ply,
                san: text.to_string(),
            })?;
            let mv = san.to_move(&pos).map_err(|_| PgnError::IllegalSan {
                ply,
                san: text.to_string(),
            })?;
            halfmoves.push(Halfmove {
                san: notation::san_plus(&pos, &mv),
                mv: mv.clone(),
            });
            pos.play_unchecked(mv);
        }

        Ok(Self { headers, halfmoves })
    }

    pub fn headers(&self) -> &GameHeaders {
        &self.headers
    }

    pub fn halfmoves(&self) -> &[Halfmove] {
        &self.halfmoves
    }

    pub fn halfmove(&self, index: usize) -> Option<&Halfmove> {
        self.halfmoves.get(index)
    }

    pub fn len(&self) -> usize {
        self.halfmoves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.halfmoves.is_empty()
    }

    pub fn moves(&self) -> impl Iterator<Item = &Move> {
        self.halfmoves.iter().map(|h| &h.mv)
    }

    /// Position after the whole mainline has been played.
    pub fn final_position(&self) -> Chess {
        let mut pos = Chess::default();
        for mv in self.moves() {
            pos.play_unchecked(mv.clone());
        }
        pos
    }
}
