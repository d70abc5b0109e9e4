//! Learner move classification. Pure functions only: no session, engine or book lookups.

use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Move, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveClass {
    /// Same move as the recorded game
    Matched,
    /// Book move that leaves the recorded game
    BookDivergent,
    /// Neither the game move nor a book move
    Novelty,
}

impl MoveClass {
    /// Whether the move counts towards the matched total.
    pub fn counts_as_match(self) -> bool {
        !matches!(self, MoveClass::Novelty)
    }
}

/// Classify `submitted` against the game move `reference` and the book moves of `board`.
///
/// Moves are compared by identity, never by notation. A move that is both the
/// game move and a book move is `Matched`.
pub fn classify(board: &Chess, reference: &Move, submitted: &Move, book_moves: &[Move]) -> MoveClass {
    if submitted == reference {
        MoveClass::Matched
    } else if book_moves.contains(submitted) && board.legal_moves().contains(submitted) {
        MoveClass::BookDivergent
    } else {
        MoveClass::Novelty
    }
}
