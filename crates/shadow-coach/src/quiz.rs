//! Board coordinate drill: name a square, rank or file and score the learner's click.

use std::fmt;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use shakmaty::{File, Rank, Square};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizTarget {
    Square(Square),
    Rank(Rank),
    File(File),
}

impl QuizTarget {
    pub fn contains(self, square: Square) -> bool {
        match self {
            QuizTarget::Square(target) => target == square,
            QuizTarget::Rank(rank) => square.rank() == rank,
            QuizTarget::File(file) => square.file() == file,
        }
    }

    fn random<R: Rng>(rng: &mut R) -> Self {
        match rng.gen_range(0..3) {
            0 => QuizTarget::Rank(Rank::ALL.choose(rng).copied().unwrap_or(Rank::First)),
            1 => QuizTarget::File(File::ALL.choose(rng).copied().unwrap_or(File::A)),
            _ => QuizTarget::Square(Square::ALL.choose(rng).copied().unwrap_or(Square::A1)),
        }
    }
}

impl fmt::Display for QuizTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizTarget::Square(square) => write!(f, "square {square}"),
            QuizTarget::Rank(rank) => write!(f, "rank {}", rank.char()),
            QuizTarget::File(file) => write!(f, "file {}", file.char()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizAnswer {
    pub hit: bool,
    /// Time the learner took on the answered target
    pub took: Duration,
    pub hits: u32,
    pub attempts: u32,
}

pub struct CoordinateQuiz {
    rng: StdRng,
    target: QuizTarget,
    hits: u32,
    attempts: u32,
    shown_at: Instant,
}

impl CoordinateQuiz {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Reproducible sequence of targets.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: StdRng) -> Self {
        let target = QuizTarget::random(&mut rng);
        Self {
            rng,
            target,
            hits: 0,
            attempts: 0,
            shown_at: Instant::now(),
        }
    }

    pub fn target(&self) -> QuizTarget {
        self.target
    }

    pub fn prompt(&self) -> String {
        format!("Click {}", self.target)
    }

    /// Score a click on `square`, then move on to a new target.
    pub fn submit_click(&mut self, square: Square) -> QuizAnswer {
        let hit = self.target.contains(square);
        let took = self.shown_at.elapsed();
        self.attempts += 1;
        if hit {
            self.hits += 1;
        }
        debug!(quiz_target = %self.target, %square, hit, "Coordinate answered");

        self.target = QuizTarget::random(&mut self.rng);
        self.shown_at = Instant::now();

        QuizAnswer {
            hit,
            took,
            hits: self.hits,
            attempts: self.attempts,
        }
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Time since the current target appeared.
    pub fn elapsed(&self) -> Duration {
        self.shown_at.elapsed()
    }
}

impl Default for CoordinateQuiz {
    fn default() -> Self {
        Self::new()
    }
}
