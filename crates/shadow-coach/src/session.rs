//! Shadow-play session: replays one reference game while the learner plays one side.
//!
//! Board and cursor belong to the foreground caller (`&mut self`). Score,
//! counters and narration live in a ledger behind one mutex, because
//! evaluation callbacks update them from background tasks.

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use chess_core::{notation, Halfmove, ReferenceGame};
use serde::Serialize;
use shakmaty::{Chess, Color, Move, Position};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::book::BookSource;
use crate::classifier::{classify, MoveClass};
use crate::cursor::ReplayCursor;
use crate::error::CoachError;
use crate::evaluation::{EvaluationCoordinator, EvaluationJob, EvaluationResult, Score};
use crate::narration::{signed, Narration, NarrationKind, NarrationLog};
use crate::openings::OpeningNames;

/// What the board receives when the learner leaves the game on a book move.
///
/// The reference line always continues along the recorded game; only the
/// board differs between policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DivergencePolicy {
    /// The learner's book move is played; the recorded line is replayed on top when it still fits.
    #[default]
    KeepLearnerMove,
    /// The recorded move is played, as for a novelty.
    FollowGame,
}

impl DivergencePolicy {
    pub fn board_move<'a>(self, submitted: &'a Move, reference: &'a Move) -> &'a Move {
        match self {
            DivergencePolicy::KeepLearnerMove => submitted,
            DivergencePolicy::FollowGame => reference,
        }
    }
}

impl FromStr for DivergencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep-learner-move" => Ok(DivergencePolicy::KeepLearnerMove),
            "follow-game" => Ok(DivergencePolicy::FollowGame),
            other => Err(format!("unknown divergence policy {other:?}")),
        }
    }
}

/// Resolve the recorded halfmove against the live board.
///
/// The recorded move itself when it is legal here, otherwise its SAN
/// re-read on this board. `None` means the reference line can no longer be
/// played on this board.
pub fn reconcile_reference(board: &Chess, halfmove: &Halfmove) -> Option<Move> {
    if board.legal_moves().contains(&halfmove.mv) {
        return Some(halfmove.mv.clone());
    }
    notation::parse_move(board, &halfmove.san)
}

/// Collaborators shared by every session of a host.
#[derive(Clone)]
pub struct CoachContext {
    pub book: Arc<dyn BookSource>,
    pub openings: OpeningNames,
    pub coordinator: EvaluationCoordinator,
    /// Search time per evaluation job
    pub time_budget: Duration,
    pub divergence: DivergencePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Shadow,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingUser,
    Exhausted,
}

/// Result of an accepted move.
#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    /// SAN of the learner's move in the position it was submitted in
    pub san: String,
    /// `None` in editor mode
    pub class: Option<MoveClass>,
    /// Lines narrated by this call, newest first
    pub narration: Vec<String>,
    /// A score for this move will arrive later through the narration
    pub evaluation_pending: bool,
    pub state: SessionState,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub mode: SessionMode,
    pub state: SessionState,
    pub cursor: usize,
    pub running_score: i32,
    pub total_moves: u32,
    pub matched_moves: u32,
    pub pending_evaluations: usize,
}

impl SessionReport {
    /// Percentage of learner moves that matched the game or the book.
    pub fn accuracy(&self) -> Option<f64> {
        (self.total_moves > 0).then(|| self.matched_moves as f64 * 100.0 / self.total_moves as f64)
    }
}

/// Everything evaluation callbacks may touch.
#[derive(Debug, Default)]
struct Ledger {
    running_score: i32,
    total_moves: u32,
    matched_moves: u32,
    pending: usize,
    exhausted: bool,
    /// The final summary is narrated once, by whichever completion settles last
    final_narrated: bool,
    narration: NarrationLog,
}

/// Labels needed to narrate a finished comparison.
#[derive(Debug, Clone)]
struct PendingScore {
    submitted: Move,
    reference: Move,
    submitted_san: String,
    reference_san: String,
}

impl Ledger {
    fn on_evaluation_completed(&mut self, scoring: &PendingScore, result: Result<EvaluationResult, CoachError>) {
        self.pending = self.pending.saturating_sub(1);

        let diff = result.and_then(|scores| {
            match (scores.score_of(&scoring.submitted), scores.score_of(&scoring.reference)) {
                (Some(user), Some(game)) => Ok(user - game),
                _ => Err(CoachError::EvaluationUnavailable("incomplete scores".into())),
            }
        });

        match diff {
            Ok(diff) => {
                self.running_score += diff;
                self.narration.push(
                    NarrationKind::Score,
                    format!(
                        "Move score ({} vs {}): {}",
                        scoring.submitted_san,
                        scoring.reference_san,
                        signed(diff)
                    ),
                );
                self.narration
                    .push(NarrationKind::Score, format!("Game score: {}", signed(self.running_score)));
            }
            Err(e) => {
                self.narration.push(
                    NarrationKind::Notice,
                    format!("No score available for {} ({e})", scoring.submitted_san),
                );
            }
        }

        self.narrate_final_if_settled();
    }

    fn narrate_final_if_settled(&mut self) {
        if self.exhausted && self.pending == 0 && !self.final_narrated {
            self.final_narrated = true;
            let text = format!(
                "Final score: {}, matched {}/{} moves",
                signed(self.running_score),
                self.matched_moves,
                self.total_moves
            );
            self.narration.push(NarrationKind::Prompt, text);
        }
    }
}

fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ledger changes produced by one foreground step, applied under a single lock.
#[derive(Default)]
struct Step {
    lines: Vec<(NarrationKind, String)>,
    total: u32,
    matched: u32,
    pending: usize,
    exhausted_now: bool,
}

impl Step {
    fn say(&mut self, kind: NarrationKind, text: impl Into<String>) {
        self.lines.push((kind, text.into()));
    }
}

pub struct Session {
    context: CoachContext,
    /// `None` in editor mode
    game: Option<ReferenceGame>,
    board: Chess,
    history: Vec<Move>,
    cursor: ReplayCursor,
    trained_color: Color,
    awaiting_user: bool,
    last_move: Option<Move>,
    last_move_san: Option<String>,
    state: SessionState,
    ledger: Arc<Mutex<Ledger>>,
    jobs: Vec<JoinHandle<()>>,
    turn_started: Instant,
    /// Narration entries already handed out by `take_unread`
    delivered: usize,
}

impl Session {
    /// Shadow `game` when given, otherwise a freeform editor board.
    pub fn open(game: Option<ReferenceGame>, context: CoachContext) -> Self {
        match game {
            Some(game) => Self::shadow(game, context),
            None => Self::editor(context),
        }
    }

    /// Shadow the side credited with the recorded result.
    pub fn shadow(game: ReferenceGame, context: CoachContext) -> Self {
        let color = game.headers().result.winner();
        Self::shadow_as(game, color, context)
    }

    /// Shadow `trained_color` in `game`.
    pub fn shadow_as(game: ReferenceGame, trained_color: Color, context: CoachContext) -> Self {
        info!(game = %game.headers().label(), ?trained_color, "Opening shadow session");
        let cursor = ReplayCursor::new(game.len());
        let mut session = Self::new(Some(game), trained_color, cursor, context);

        let mut step = Step::default();
        step.say(
            NarrationKind::Prompt,
            format!("Shadowing {} as {}", session.title(), color_name(trained_color)),
        );
        session.refresh_turn();
        session.advance_opponent(&mut step);
        session.settle_state(&mut step);
        session.commit(step);
        session
    }

    /// Freeform board: every legal move is accepted, nothing is classified or scored.
    pub fn editor(context: CoachContext) -> Self {
        let mut session = Self::new(None, Color::White, ReplayCursor::new(0), context);
        session.awaiting_user = true;
        session
    }

    fn new(game: Option<ReferenceGame>, trained_color: Color, cursor: ReplayCursor, context: CoachContext) -> Self {
        Self {
            context,
            game,
            board: Chess::default(),
            history: Vec::new(),
            cursor,
            trained_color,
            awaiting_user: false,
            last_move: None,
            last_move_san: None,
            state: SessionState::AwaitingUser,
            ledger: Arc::new(Mutex::new(Ledger::default())),
            jobs: Vec::new(),
            turn_started: Instant::now(),
            delivered: 0,
        }
    }

    /// Accept the learner's move.
    ///
    /// `IllegalMove` and `SessionExhausted` leave the session untouched.
    pub fn submit_user_move(&mut self, text: &str) -> Result<MoveOutcome, CoachError> {
        let mv = notation::parse_move(&self.board, text)
            .ok_or_else(|| CoachError::IllegalMove(text.trim().to_string()))?;
        let san = notation::san_plus(&self.board, &mv);

        if self.game.is_none() {
            let mut step = Step::default();
            step.say(NarrationKind::Move, format!("Move: {san}"));
            self.play(mv, san.clone());
            self.turn_started = Instant::now();
            let narration = self.commit(step);
            return Ok(MoveOutcome {
                san,
                class: None,
                narration,
                evaluation_pending: false,
                state: self.state,
            });
        }

        if self.state == SessionState::Exhausted || !self.awaiting_user {
            return Err(CoachError::SessionExhausted);
        }
        let reference = self.reference_move().ok_or(CoachError::SessionExhausted)?;
        let reference_san = notation::san_plus(&self.board, &reference);
        let book_moves = self.context.book.book_moves(&self.board);
        let class = classify(&self.board, &reference, &mv, &book_moves);

        let mut step = Step {
            total: 1,
            ..Step::default()
        };
        step.say(
            NarrationKind::Comparison,
            format!("Your move: {san}, Game move: {reference_san}"),
        );

        let mut job = None;
        match class {
            MoveClass::Matched => {
                step.say(NarrationKind::Comparison, format!("{san} is the same as the game move"));
                step.matched = 1;
                self.play(reference, reference_san);
            }
            MoveClass::BookDivergent => {
                let mut line = self.history.clone();
                line.push(mv.clone());
                let text = match self.context.openings.lookup(&line) {
                    Some(name) => format!("{san} (Book move - {name})"),
                    None => format!("{san} (Book move)"),
                };
                step.say(NarrationKind::Book, text);
                step.matched = 1;

                let board_move = self.context.divergence.board_move(&mv, &reference).clone();
                let board_san = notation::san_plus(&self.board, &board_move);
                self.play(board_move, board_san);
            }
            MoveClass::Novelty => {
                let position = self.board.clone();
                job = Some((
                    EvaluationJob {
                        position,
                        candidates: vec![mv.clone(), reference.clone()],
                        time_budget: self.context.time_budget,
                    },
                    PendingScore {
                        submitted: mv,
                        reference: reference.clone(),
                        submitted_san: san.clone(),
                        reference_san: reference_san.clone(),
                    },
                ));
                step.pending = 1;
                self.play(reference, reference_san);
            }
        }
        self.cursor.advance();

        self.refresh_turn();
        self.advance_opponent(&mut step);
        self.settle_state(&mut step);
        let narration = self.commit(step);

        let evaluation_pending = job.is_some();
        if let Some((job, scoring)) = job {
            self.spawn_scoring(job, scoring);
        }

        Ok(MoveOutcome {
            san,
            class: Some(class),
            narration,
            evaluation_pending,
            state: self.state,
        })
    }

    /// Play recorded moves until it is the learner's turn or the line ends.
    /// Returns how many halfmoves were played; a no-op while awaiting the learner.
    pub fn auto_advance(&mut self) -> usize {
        if self.awaiting_user || self.state == SessionState::Exhausted {
            return 0;
        }
        let mut step = Step::default();
        let played = self.advance_opponent(&mut step);
        self.settle_state(&mut step);
        self.commit(step);
        played
    }

    /// Ask the engine about the current position; the answer is narrated later.
    pub fn analyze_position(&mut self) {
        let label = self.last_move_san.clone().unwrap_or_else(|| "start".to_string());
        lock(&self.ledger).pending += 1;

        let ledger = Arc::downgrade(&self.ledger);
        let handle = self.context.coordinator.spawn_position(
            self.board.clone(),
            self.context.time_budget,
            move |result: Result<Score, CoachError>| {
                let Some(ledger) = ledger.upgrade() else {
                    debug!("Session closed before position evaluation finished");
                    return;
                };
                let mut ledger = lock(&ledger);
                ledger.pending = ledger.pending.saturating_sub(1);
                match result {
                    Ok(score) => ledger.narration.push(
                        NarrationKind::Evaluation,
                        format!("Position evaluation ({label}): {}", signed(score)),
                    ),
                    Err(e) => ledger
                        .narration
                        .push(NarrationKind::Notice, format!("No evaluation available ({e})")),
                };
                ledger.narrate_final_if_settled();
            },
        );
        self.track(handle);
    }

    /// Wait for every evaluation this session has started.
    pub async fn settle(&mut self) {
        for handle in std::mem::take(&mut self.jobs) {
            if let Err(e) = handle.await {
                debug!(error = %e, "Evaluation task ended abnormally");
            }
        }
    }

    pub fn report(&self) -> SessionReport {
        let ledger = lock(&self.ledger);
        SessionReport {
            mode: self.mode(),
            state: self.state,
            cursor: self.cursor.index(),
            running_score: ledger.running_score,
            total_moves: ledger.total_moves,
            matched_moves: ledger.matched_moves,
            pending_evaluations: ledger.pending,
        }
    }

    /// Narration so far, newest first.
    pub fn narration(&self) -> Vec<Narration> {
        lock(&self.ledger).narration.iter().cloned().collect()
    }

    pub fn narration_lines(&self) -> Vec<String> {
        lock(&self.ledger).narration.lines()
    }

    /// Narration added since the previous call, newest first.
    ///
    /// Includes lines written by evaluations that finished in the background.
    pub fn take_unread(&mut self) -> Vec<String> {
        let ledger = lock(&self.ledger);
        let total = ledger.narration.len();
        let lines = ledger
            .narration
            .iter()
            .take(total.saturating_sub(self.delivered))
            .map(|n| n.text.clone())
            .collect();
        self.delivered = total;
        lines
    }

    pub fn running_score(&self) -> i32 {
        lock(&self.ledger).running_score
    }

    pub fn mode(&self) -> SessionMode {
        if self.game.is_some() {
            SessionMode::Shadow
        } else {
            SessionMode::Editor
        }
    }

    pub fn title(&self) -> String {
        self.game
            .as_ref()
            .map(|g| g.headers().label())
            .unwrap_or_else(|| "Editor".to_string())
    }

    pub fn board(&self) -> &Chess {
        &self.board
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn cursor(&self) -> ReplayCursor {
        self.cursor
    }

    pub fn trained_color(&self) -> Color {
        self.trained_color
    }

    pub fn awaiting_user(&self) -> bool {
        self.awaiting_user
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.last_move.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Time since the learner's current turn began.
    pub fn elapsed(&self) -> Duration {
        self.turn_started.elapsed()
    }

    fn reference_move(&self) -> Option<Move> {
        let game = self.game.as_ref()?;
        let halfmove = game.halfmove(self.cursor.next_index()?)?;
        reconcile_reference(&self.board, halfmove)
    }

    fn play(&mut self, mv: Move, san: String) {
        self.board.play_unchecked(mv.clone());
        self.history.push(mv.clone());
        self.last_move = Some(mv);
        self.last_move_san = Some(san);
    }

    fn refresh_turn(&mut self) {
        self.awaiting_user = self.game.is_none() || self.board.turn() == self.trained_color;
    }

    fn advance_opponent(&mut self, step: &mut Step) -> usize {
        let mut played = 0;
        while !self.awaiting_user && !self.cursor.is_exhausted() {
            let Some(mv) = self.reference_move() else {
                self.abandon_reference(step);
                break;
            };
            let san = notation::san_plus(&self.board, &mv);
            step.say(NarrationKind::OpponentMove, format!("Opponent move: {san}"));
            self.play(mv, san);
            self.cursor.advance();
            played += 1;
            self.refresh_turn();
        }
        played
    }

    /// The recorded line no longer fits the board after a divergence.
    fn abandon_reference(&mut self, step: &mut Step) {
        let recorded = self
            .game
            .as_ref()
            .and_then(|g| g.halfmove(self.cursor.index()))
            .map(|h| h.san.clone())
            .unwrap_or_default();
        step.say(
            NarrationKind::Notice,
            format!("Game move {recorded} cannot be played on this board; replay ends"),
        );
        self.cursor.exhaust();
    }

    fn settle_state(&mut self, step: &mut Step) {
        if self.state == SessionState::Exhausted {
            return;
        }
        if self.awaiting_user && !self.cursor.is_exhausted() && self.reference_move().is_none() {
            self.abandon_reference(step);
        }

        if self.cursor.is_exhausted() {
            self.state = SessionState::Exhausted;
            step.exhausted_now = true;
            info!(game = %self.title(), "Reference line exhausted");
        } else {
            self.turn_started = Instant::now();
            step.say(
                NarrationKind::Prompt,
                format!("**** Make move for {}", color_name(self.board.turn())),
            );
        }
    }

    /// Apply a foreground step to the ledger. Returns its lines newest first.
    fn commit(&self, step: Step) -> Vec<String> {
        let mut ledger = lock(&self.ledger);
        ledger.total_moves += step.total;
        ledger.matched_moves += step.matched;
        ledger.pending += step.pending;
        for (kind, text) in &step.lines {
            ledger.narration.push(*kind, text.clone());
        }

        let mut narration: Vec<String> = step.lines.into_iter().map(|(_, text)| text).collect();
        if step.exhausted_now {
            ledger.exhausted = true;
            let text = format!(
                "Replay finished: matched {}/{} moves, score {}",
                ledger.matched_moves,
                ledger.total_moves,
                signed(ledger.running_score)
            );
            ledger.narration.push(NarrationKind::Prompt, text.clone());
            narration.push(text);
            ledger.narrate_final_if_settled();
        }
        narration.reverse();
        narration
    }

    fn spawn_scoring(&mut self, job: EvaluationJob, scoring: PendingScore) {
        let ledger: Weak<Mutex<Ledger>> = Arc::downgrade(&self.ledger);
        let handle = self.context.coordinator.spawn_job(job, move |_job, result| {
            match ledger.upgrade() {
                Some(ledger) => lock(&ledger).on_evaluation_completed(&scoring, result),
                None => debug!(mv = %scoring.submitted_san, "Session closed; discarding evaluation"),
            }
        });
        self.track(handle);
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.jobs.retain(|h| !h.is_finished());
        self.jobs.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::EmptyBook;
    use chess_core::notation::parse_move;
    use chess_core::GameHeaders;
    use tokio::runtime::Handle;

    fn halfmove(board: &Chess, san: &str) -> Halfmove {
        let mv = parse_move(board, san).unwrap();
        Halfmove {
            san: notation::san_plus(board, &mv),
            mv,
        }
    }

    fn scoring(sans: (&str, &str)) -> PendingScore {
        let board = Chess::default();
        PendingScore {
            submitted: parse_move(&board, sans.0).unwrap(),
            reference: parse_move(&board, sans.1).unwrap(),
            submitted_san: sans.0.to_string(),
            reference_san: sans.1.to_string(),
        }
    }

    #[test]
    fn test_policy_parsing_and_choice() {
        let board = Chess::default();
        let d4 = parse_move(&board, "d4").unwrap();
        let e4 = parse_move(&board, "e4").unwrap();
        assert_eq!("follow-game".parse::<DivergencePolicy>().unwrap(), DivergencePolicy::FollowGame);
        assert!("rewind".parse::<DivergencePolicy>().is_err());
        assert_eq!(DivergencePolicy::KeepLearnerMove.board_move(&d4, &e4), &d4);
        assert_eq!(DivergencePolicy::FollowGame.board_move(&d4, &e4), &e4);
    }

    #[test]
    fn test_reconcile_reference_on_diverged_board() {
        // Recorded 1. e4 e5 2. Nf3; the learner played 1. d4 instead.
        let start = Chess::default();
        let mut recorded = start.clone();
        recorded.play_unchecked(parse_move(&start, "e4").unwrap());
        let after_e4 = recorded.clone();
        recorded.play_unchecked(parse_move(&after_e4, "e5").unwrap());
        let nf3 = halfmove(&recorded, "Nf3");

        let mut live = start.clone();
        live.play_unchecked(parse_move(&start, "d4").unwrap());
        let after_d4 = live.clone();
        live.play_unchecked(parse_move(&after_d4, "d5").unwrap());

        assert_eq!(reconcile_reference(&live, &nf3), Some(nf3.mv.clone()));

        let e5 = halfmove(&after_e4, "e5");
        let mut blocked = start.clone();
        blocked.play_unchecked(parse_move(&start, "e4").unwrap());
        let after = blocked.clone();
        blocked.play_unchecked(parse_move(&after, "e5").unwrap());
        let after = blocked.clone();
        blocked.play_unchecked(parse_move(&after, "Nf3").unwrap());
        // Black's e-pawn already stands on e5: the recorded e7e5 no longer exists.
        assert_eq!(reconcile_reference(&blocked, &e5), None);
    }

    #[test]
    fn test_callbacks_sum_regardless_of_order() {
        let a = scoring(("d4", "e4"));
        let b = scoring(("a3", "e4"));
        let result = |pairs: &[(&PendingScore, i32, i32)]| -> Vec<Result<EvaluationResult, CoachError>> {
            pairs
                .iter()
                .map(|(s, user, game)| {
                    Ok(EvaluationResult::from_scores(vec![
                        (s.submitted.clone(), *user),
                        (s.reference.clone(), *game),
                    ]))
                })
                .collect()
        };

        let mut forward = Ledger {
            pending: 2,
            ..Ledger::default()
        };
        let mut results = result(&[(&a, 50, 30), (&b, -40, 30)]).into_iter();
        forward.on_evaluation_completed(&a, results.next().unwrap());
        forward.on_evaluation_completed(&b, results.next().unwrap());

        let mut backward = Ledger {
            pending: 2,
            ..Ledger::default()
        };
        let mut results = result(&[(&a, 50, 30), (&b, -40, 30)]).into_iter();
        let first = results.next().unwrap();
        backward.on_evaluation_completed(&b, results.next().unwrap());
        backward.on_evaluation_completed(&a, first);

        assert_eq!(forward.running_score, -50);
        assert_eq!(backward.running_score, -50);
        assert_eq!(forward.pending, 0);
        assert_eq!(forward.narration.latest().unwrap().text, "Game score: -50");
    }

    #[test]
    fn test_failed_evaluation_only_narrates() {
        let s = scoring(("d4", "e4"));
        let mut ledger = Ledger {
            pending: 1,
            exhausted: true,
            running_score: 15,
            ..Ledger::default()
        };
        ledger.on_evaluation_completed(&s, Err(CoachError::EvaluationUnavailable("down".into())));
        assert_eq!(ledger.running_score, 15);
        let lines = ledger.narration.lines();
        assert!(lines[1].starts_with("No score available for d4"));
        assert_eq!(lines[0], "Final score: +15, matched 0/0 moves");
    }

    #[tokio::test]
    async fn test_empty_game_is_exhausted_on_open() {
        let context = CoachContext {
            book: Arc::new(EmptyBook),
            openings: OpeningNames::default(),
            coordinator: EvaluationCoordinator::offline(Handle::current()),
            time_budget: Duration::from_millis(10),
            divergence: DivergencePolicy::default(),
        };
        let game = ReferenceGame::from_san::<&str>(GameHeaders::default(), &[]).unwrap();
        let mut session = Session::shadow(game, context);
        assert_eq!(session.state(), SessionState::Exhausted);
        assert!(matches!(
            session.submit_user_move("e4"),
            Err(CoachError::SessionExhausted)
        ));
        assert!(session.history().is_empty());
    }
}
