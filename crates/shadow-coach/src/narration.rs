//! Narration lines shown to the learner, most recent first.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationKind {
    /// Whose turn it is, session start and end
    Prompt,
    /// Move played on a freeform board
    Move,
    /// Learner move compared with the game
    Comparison,
    /// Book move and opening name
    Book,
    /// Recorded move played for the other side
    OpponentMove,
    /// Engine differential and running total
    Score,
    /// Single-position evaluation
    Evaluation,
    /// Something the learner should know went wrong
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narration {
    pub at: DateTime<Utc>,
    pub kind: NarrationKind,
    pub text: String,
}

/// Ordered narration, newest at the front.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NarrationLog {
    entries: VecDeque<Narration>,
}

impl NarrationLog {
    pub fn push(&mut self, kind: NarrationKind, text: impl Into<String>) -> &Narration {
        self.entries.push_front(Narration {
            at: Utc::now(),
            kind,
            text: text.into(),
        });
        &self.entries[0]
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Narration> {
        self.entries.iter()
    }

    /// Texts newest first.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|n| n.text.clone()).collect()
    }

    pub fn latest(&self) -> Option<&Narration> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Signed centipawn text, e.g. `+20`, `-5`, `0`.
pub fn signed(value: i32) -> String {
    if value > 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}
