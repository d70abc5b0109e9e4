//! Chess building blocks shared by the coaching engine: recorded games,
//! PGN ingestion and move notation.

pub mod game_data;
pub mod notation;
pub mod pgn;

pub use game_data::{GameHeaders, GameResult, Halfmove, ReferenceGame};
pub use pgn::PgnError;

pub use shakmaty;
