pub use chess_core;

pub mod book;
pub mod classifier;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod host;
pub mod narration;
pub mod openings;
pub mod quiz;
pub mod session;
