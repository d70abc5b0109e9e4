//! Trainer tabs and input routing.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use shakmaty::Square;
use tracing::info;

use crate::error::CoachError;
use crate::quiz::CoordinateQuiz;
use crate::session::{Session, SessionMode, SessionState};

/// Learner input as it arrives from the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainerInput {
    /// Move text in UCI or SAN
    Move(String),
    /// A click on a board square
    Square(Square),
}

/// Something the host can show in a tab and feed input to.
#[async_trait]
pub trait Trainable: Send {
    /// Handle one input. Returns the narration it produced, newest first.
    fn submit_input(&mut self, input: TrainerInput) -> Result<Vec<String>, CoachError>;

    /// Time the learner has spent on the current prompt.
    fn elapsed(&self) -> Duration;

    fn can_accept_input(&self) -> bool;

    fn title(&self) -> String;

    /// Machine-readable progress.
    fn report(&self) -> Value;

    /// Request an engine evaluation of the current board.
    fn analyze(&mut self) -> Result<(), CoachError> {
        Err(CoachError::UnsupportedInput("analyze".into()))
    }

    /// Narration produced since the previous call, newest first.
    fn take_unread(&mut self) -> Vec<String> {
        Vec::new()
    }

    /// Wait for background work before the tab goes away.
    async fn settle(&mut self) {}
}

#[async_trait]
impl Trainable for Session {
    fn submit_input(&mut self, input: TrainerInput) -> Result<Vec<String>, CoachError> {
        match input {
            TrainerInput::Move(text) => {
                self.submit_user_move(&text)?;
                Ok(self.take_unread())
            }
            TrainerInput::Square(square) => {
                Err(CoachError::UnsupportedInput(format!("square {square} without a move")))
            }
        }
    }

    fn elapsed(&self) -> Duration {
        Session::elapsed(self)
    }

    fn can_accept_input(&self) -> bool {
        match self.mode() {
            SessionMode::Editor => true,
            SessionMode::Shadow => {
                self.awaiting_user() && self.state() == SessionState::AwaitingUser
            }
        }
    }

    fn title(&self) -> String {
        Session::title(self)
    }

    fn report(&self) -> Value {
        let report = Session::report(self);
        let accuracy = report.accuracy();
        let mut value = serde_json::to_value(report).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert("accuracy".to_string(), json!(accuracy));
        }
        value
    }

    fn analyze(&mut self) -> Result<(), CoachError> {
        self.analyze_position();
        Ok(())
    }

    fn take_unread(&mut self) -> Vec<String> {
        Session::take_unread(self)
    }

    async fn settle(&mut self) {
        Session::settle(self).await;
    }
}

#[async_trait]
impl Trainable for CoordinateQuiz {
    fn submit_input(&mut self, input: TrainerInput) -> Result<Vec<String>, CoachError> {
        let square = match input {
            TrainerInput::Square(square) => square,
            TrainerInput::Move(text) => text
                .trim()
                .parse::<Square>()
                .map_err(|_| CoachError::UnsupportedInput(text.clone()))?,
        };

        let answer = self.submit_click(square);
        let verdict = if answer.hit { "Correct" } else { "Wrong" };
        Ok(vec![
            self.prompt(),
            format!(
                "{verdict}: {square} in {:.1}s ({}/{})",
                answer.took.as_secs_f64(),
                answer.hits,
                answer.attempts
            ),
        ])
    }

    fn elapsed(&self) -> Duration {
        CoordinateQuiz::elapsed(self)
    }

    fn can_accept_input(&self) -> bool {
        true
    }

    fn title(&self) -> String {
        "Coordinates".to_string()
    }

    fn report(&self) -> Value {
        json!({
            "target": self.target().to_string(),
            "hits": self.hits(),
            "attempts": self.attempts(),
        })
    }
}

/// Open trainer tabs and the one receiving input.
#[derive(Default)]
pub struct SessionHost {
    tabs: Vec<Box<dyn Trainable>>,
    active: Option<usize>,
}

impl SessionHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tab and make it active. Returns its index.
    pub fn open(&mut self, tab: Box<dyn Trainable>) -> usize {
        info!(title = %tab.title(), "Opening tab");
        self.tabs.push(tab);
        let index = self.tabs.len() - 1;
        self.active = Some(index);
        index
    }

    /// Remove a tab. The active tab moves to a neighbour when it is the one closed.
    pub fn close(&mut self, index: usize) -> Option<Box<dyn Trainable>> {
        if index >= self.tabs.len() {
            return None;
        }
        let tab = self.tabs.remove(index);
        self.active = match self.active {
            _ if self.tabs.is_empty() => None,
            Some(active) if active > index => Some(active - 1),
            Some(active) => Some(active.min(self.tabs.len() - 1)),
            None => None,
        };
        info!(title = %tab.title(), "Closed tab");
        Some(tab)
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.tabs.len() {
            self.active = Some(index);
            true
        } else {
            false
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&dyn Trainable> {
        self.tabs.get(self.active?).map(|tab| &**tab)
    }

    pub fn active_mut(&mut self) -> Option<&mut Box<dyn Trainable>> {
        let index = self.active?;
        self.tabs.get_mut(index)
    }

    /// Send input to the active tab.
    pub fn submit(&mut self, input: TrainerInput) -> Result<Vec<String>, CoachError> {
        let tab = self.active_mut().ok_or(CoachError::NoActiveTab)?;
        tab.submit_input(input)
    }

    pub fn analyze(&mut self) -> Result<(), CoachError> {
        self.active_mut().ok_or(CoachError::NoActiveTab)?.analyze()
    }

    /// Unread narration of the active tab, newest first.
    pub fn take_unread(&mut self) -> Vec<String> {
        self.active_mut().map(|tab| tab.take_unread()).unwrap_or_default()
    }

    pub fn titles(&self) -> Vec<String> {
        self.tabs.iter().map(|tab| tab.title()).collect()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Settle every tab, e.g. before exit.
    pub async fn settle_all(&mut self) {
        for tab in &mut self.tabs {
            tab.settle().await;
        }
    }
}
