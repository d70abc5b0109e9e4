//! In-memory opening book.
//!
//! The book is loaded from a binary file at startup for instant lookups.
//! Use `cargo run --bin build-book` to generate the binary from a PGN collection.

use serde::{Deserialize, Serialize};
use shakmaty::{san::San, Chess, Move, Position};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chess_core::{notation, ReferenceGame};

use crate::error::CoachError;

/// Anything that can answer "which moves are book in this position".
/// Shared read-only across sessions.
pub trait BookSource: Send + Sync {
    fn book_moves(&self, position: &Chess) -> Vec<Move>;

    fn is_book_move(&self, position: &Chess, mv: &Move) -> bool {
        self.book_moves(position).contains(mv)
    }
}

/// A book with no moves at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyBook;

impl BookSource for EmptyBook {
    fn book_moves(&self, _position: &Chess) -> Vec<Move> {
        Vec::new()
    }
}

/// Stats for a single book move.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMoveStats {
    pub games: i32,
    pub white_wins: i32,
    pub draws: i32,
    pub black_wins: i32,
}

/// Opening book keyed by normalized FEN, then move SAN.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionBook {
    positions: HashMap<String, HashMap<String, BookMoveStats>>,
}

impl PositionBook {
    /// Load the book from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CoachError> {
        let file = File::open(path.as_ref())?;
        let book: Self = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| CoachError::Book(e.to_string()))?;
        tracing::info!(
            "Loaded opening book: {} positions, {} moves",
            book.positions.len(),
            book.move_count()
        );
        Ok(book)
    }

    /// Load the book, or fall back to an empty one so book detection is simply disabled.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(book) => book,
            Err(e) => {
                tracing::warn!("Failed to load opening book from {}: {}", path.as_ref().display(), e);
                tracing::warn!("Book move detection will be disabled");
                Self::default()
            }
        }
    }

    /// Save the book to a binary file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CoachError> {
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self).map_err(|e| CoachError::Book(e.to_string()))
    }

    /// Count every game's first `max_ply` halfmoves, keeping moves seen in at least `min_games` games.
    pub fn from_games(games: &[ReferenceGame], max_ply: usize, min_games: i32) -> Self {
        let mut book = Self::default();

        for game in games {
            let result = game.headers().result;
            let mut pos = Chess::default();
            for halfmove in game.halfmoves().iter().take(max_ply) {
                let san = San::from_move(&pos, halfmove.mv.clone()).to_string();
                let stats = book
                    .positions
                    .entry(notation::normalized_fen(&pos))
                    .or_default()
                    .entry(san)
                    .or_default();
                stats.games += 1;
                match result {
                    chess_core::GameResult::WhiteWins => stats.white_wins += 1,
                    chess_core::GameResult::BlackWins => stats.black_wins += 1,
                    chess_core::GameResult::Draw => stats.draws += 1,
                    chess_core::GameResult::Unknown => {}
                }
                pos.play_unchecked(halfmove.mv.clone());
            }
        }

        for moves in book.positions.values_mut() {
            moves.retain(|_, stats| stats.games >= min_games);
        }
        book.positions.retain(|_, moves| !moves.is_empty());
        book
    }

    /// Record a single book move; mainly for hand-built books.
    pub fn insert(&mut self, position: &Chess, mv: &Move, stats: BookMoveStats) {
        let san = San::from_move(position, mv.clone()).to_string();
        self.positions
            .entry(notation::normalized_fen(position))
            .or_default()
            .insert(san, stats);
    }

    /// Look up the stats of a move in the book.
    pub fn lookup(&self, position: &Chess, mv: &Move) -> Option<&BookMoveStats> {
        let san = San::from_move(position, mv.clone()).to_string();
        self.positions
            .get(&notation::normalized_fen(position))
            .and_then(|moves| moves.get(&san))
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn move_count(&self) -> usize {
        self.positions.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl BookSource for PositionBook {
    fn book_moves(&self, position: &Chess) -> Vec<Move> {
        let Some(moves) = self.positions.get(&notation::normalized_fen(position)) else {
            return Vec::new();
        };
        moves
            .keys()
            .filter_map(|san| san.parse::<San>().ok())
            .filter_map(|san| san.to_move(position).ok())
            .collect()
    }
}
