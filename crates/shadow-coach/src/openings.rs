//! Opening names keyed by the exact move sequence from the start position.
//!
//! Lookups are plain string equality on the rendered sequence: two move orders
//! reaching the same position are different keys, and a sequence shorter or
//! longer than a stored line never matches.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use chess_core::{notation, pgn, ReferenceGame};
use shakmaty::Move;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::CoachError;

/// Immutable sequence → name map.
#[derive(Debug, Clone, Default)]
pub struct OpeningNameIndex {
    names: HashMap<String, String>,
}

impl OpeningNameIndex {
    /// Index every game's full mainline. The first game for a given line wins.
    pub fn from_games(games: &[ReferenceGame]) -> Self {
        let mut names = HashMap::with_capacity(games.len());
        for game in games {
            let key = notation::render_line(game.moves());
            names.entry(key).or_insert_with(|| display_name(game));
        }
        Self { names }
    }

    /// Name of exactly this move sequence, rendered from the start position.
    pub fn lookup(&self, moves: &[Move]) -> Option<&str> {
        self.lookup_line(&notation::render_line(moves))
    }

    /// Name of an already rendered line such as `1. e4 c5`.
    pub fn lookup_line(&self, line: &str) -> Option<&str> {
        self.names.get(line).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// `White` header, plus ` (Black)` unless Black is unknown.
fn display_name(game: &ReferenceGame) -> String {
    let headers = game.headers();
    if headers.black.is_empty() || headers.black == "?" {
        headers.white.clone()
    } else {
        format!("{} ({})", headers.white, headers.black)
    }
}

/// Shared handle to an index that is published once, after it is fully built.
///
/// Until then every lookup answers `None`.
#[derive(Debug, Clone, Default)]
pub struct OpeningNames {
    cell: Arc<OnceLock<OpeningNameIndex>>,
}

impl OpeningNames {
    /// A handle whose index is already available.
    pub fn ready(index: OpeningNameIndex) -> Self {
        let names = Self::default();
        names.publish(index);
        names
    }

    /// Build the index from a PGN collection on a blocking worker and publish it when done.
    pub fn spawn_from_pgn(path: impl Into<PathBuf>) -> (Self, JoinHandle<Result<usize, CoachError>>) {
        let names = Self::default();
        let publisher = names.clone();
        let path = path.into();

        let handle = tokio::task::spawn_blocking(move || -> Result<usize, CoachError> {
            let collection = pgn::read_games_from_path(&path)?;
            if collection.skipped > 0 {
                warn!(skipped = collection.skipped, "Opening collection had unreadable games");
            }
            let index = OpeningNameIndex::from_games(&collection.games);
            let count = index.len();
            publisher.publish(index);
            info!(openings = count, path = %path.display(), "Opening names ready");
            Ok(count)
        });

        (names, handle)
    }

    /// Publish the index. Only the first publication takes effect.
    pub fn publish(&self, index: OpeningNameIndex) -> bool {
        self.cell.set(index).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn lookup(&self, moves: &[Move]) -> Option<&str> {
        self.cell.get()?.lookup(moves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::GameHeaders;

    fn opening(white: &str, black: &str, sans: &[&str]) -> ReferenceGame {
        let headers = GameHeaders {
            white: white.into(),
            black: black.into(),
            ..GameHeaders::default()
        };
        ReferenceGame::from_san(headers, sans).unwrap()
    }

    fn moves(sans: &[&str]) -> Vec<Move> {
        opening("?", "?", sans).moves().cloned().collect()
    }

    #[test]
    fn test_exact_lookup() {
        let index = OpeningNameIndex::from_games(&[
            opening("Sicilian defence", "?", &["e4", "c5"]),
            opening("Sicilian", "Najdorf", &["e4", "c5", "Nf3", "d6", "d4", "cxd4", "Nxd4", "Nf6", "Nc3", "a6"]),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup(&moves(&["e4", "c5"])), Some("Sicilian defence"));
        assert_eq!(
            index.lookup_line("1. e4 c5 2. Nf3 d6 3. d4 cxd4 4. Nxd4 Nf6 5. Nc3 a6"),
            Some("Sicilian (Najdorf)")
        );
    }

    #[test]
    fn test_no_prefix_or_transposition_matching() {
        let index = OpeningNameIndex::from_games(&[opening("Queen's gambit", "?", &["d4", "d5", "c4"])]);
        assert_eq!(index.lookup(&moves(&["d4", "d5"])), None);
        assert_eq!(index.lookup(&moves(&["d4", "d5", "c4", "e6"])), None);
        assert_eq!(index.lookup(&moves(&["c4", "d5", "d4"])), None);
        assert_eq!(index.lookup(&moves(&["d4", "d5", "c4"])), Some("Queen's gambit"));
    }

    #[test]
    fn test_first_game_wins_duplicates() {
        let index = OpeningNameIndex::from_games(&[
            opening("King's pawn", "?", &["e4"]),
            opening("Other name", "?", &["e4"]),
        ]);
        assert_eq!(index.lookup(&moves(&["e4"])), Some("King's pawn"));
    }

    #[test]
    fn test_handle_answers_none_until_published() {
        let names = OpeningNames::default();
        let line = moves(&["e4"]);
        assert!(!names.is_ready());
        assert_eq!(names.lookup(&line), None);

        let reader = names.clone();
        assert!(names.publish(OpeningNameIndex::from_games(&[opening("King's pawn", "?", &["e4"])])));
        assert!(!names.publish(OpeningNameIndex::default()));
        assert!(reader.is_ready());
        assert_eq!(reader.lookup(&line), Some("King's pawn"));
        assert_eq!(reader.lookup(&[]), None);
    }

    #[tokio::test]
    async fn test_spawn_from_pgn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecoe.pgn");
        std::fs::write(
            &path,
            "[White \"French defence\"]\n[Black \"?\"]\n\n1. e4 e6 *\n\n[White \"Caro-Kann\"]\n[Black \"Advance\"]\n\n1. e4 c6 2. d4 d5 3. e5 *\n",
        )
        .unwrap();

        let (names, handle) = OpeningNames::spawn_from_pgn(&path);
        assert_eq!(handle.await.unwrap().unwrap(), 2);
        assert!(names.is_ready());
        assert_eq!(names.lookup(&moves(&["e4", "e6"])), Some("French defence"));
        assert_eq!(names.lookup(&moves(&["e4", "c6", "d4", "d5", "e5"])), Some("Caro-Kann (Advance)"));
    }

    #[tokio::test]
    async fn test_spawn_from_missing_file_fails_without_publishing() {
        let (names, handle) = OpeningNames::spawn_from_pgn("/nonexistent/ecoe.pgn");
        assert!(handle.await.unwrap().is_err());
        assert!(!names.is_ready());
    }
}
