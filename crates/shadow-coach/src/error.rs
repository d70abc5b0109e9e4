//! Coaching engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoachError {
    /// Move text that does not name a legal move in the current position.
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    /// The reference game has no further halfmove to compare against.
    #[error("Session exhausted: no more reference moves")]
    SessionExhausted,

    /// Engine unreachable or returned output that could not be used.
    #[error("Evaluation unavailable: {0}")]
    EvaluationUnavailable(String),

    /// Input arrived while no trainer tab is open.
    #[error("No active tab")]
    NoActiveTab,

    /// Input of a kind the active trainer does not take.
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Opening book error: {0}")]
    Book(String),

    #[error("PGN error: {0}")]
    Pgn(#[from] chess_core::PgnError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoachError {
    /// Failures that leave the session usable and are only reported to the learner.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoachError::IllegalMove(_)
                | CoachError::SessionExhausted
                | CoachError::EvaluationUnavailable(_)
                | CoachError::NoActiveTab
                | CoachError::UnsupportedInput(_)
        )
    }
}
