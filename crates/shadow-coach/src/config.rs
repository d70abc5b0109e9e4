//! Coach configuration from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CoachError;
use crate::session::DivergencePolicy;

#[derive(Clone, Debug)]
pub struct CoachConfig {
    /// Path to the UCI engine binary
    pub stockfish_path: String,

    /// Search time per evaluation job
    pub engine_movetime: Duration,

    /// Engine `Threads` option
    pub engine_threads: u32,

    /// Engine `Hash` option in MB
    pub engine_hash_mb: u32,

    /// Binary opening book (see `build-book`)
    pub book_path: String,

    /// Opening collection used to name openings
    pub openings_pgn: String,

    /// Games offered for shadowing
    pub games_pgn: String,

    /// What the board does when the learner plays a book move off the game line
    pub divergence_policy: DivergencePolicy,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            stockfish_path: "stockfish".to_string(),
            engine_movetime: Duration::from_millis(5000),
            engine_threads: 1,
            engine_hash_mb: 256,
            book_path: "data/opening_book.bin".to_string(),
            openings_pgn: "data/ecoe.pgn".to_string(),
            games_pgn: "data/games.pgn".to_string(),
            divergence_policy: DivergencePolicy::default(),
        }
    }
}

impl CoachConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, CoachError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoachError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let engine_movetime = parse_var(&lookup, "ENGINE_MOVETIME_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.engine_movetime);

        Ok(Self {
            stockfish_path: lookup("STOCKFISH_PATH").unwrap_or(defaults.stockfish_path),
            engine_movetime,
            engine_threads: parse_var(&lookup, "ENGINE_THREADS")?.unwrap_or(defaults.engine_threads),
            engine_hash_mb: parse_var(&lookup, "ENGINE_HASH_MB")?.unwrap_or(defaults.engine_hash_mb),
            book_path: lookup("BOOK_PATH").unwrap_or(defaults.book_path),
            openings_pgn: lookup("OPENINGS_PGN").unwrap_or(defaults.openings_pgn),
            games_pgn: lookup("GAMES_PGN").unwrap_or(defaults.games_pgn),
            divergence_policy: parse_var(&lookup, "COACH_DIVERGENCE_POLICY")?
                .unwrap_or(defaults.divergence_policy),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, CoachError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CoachError::Config(format!("{key} has invalid value {raw:?}"))),
    }
}
