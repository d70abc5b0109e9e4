//! Single-flight evaluation coordinator.
//!
//! Every request to the engine holds the one engine permit for its whole
//! duration. The permit is an async FIFO mutex around the backend, so waiting
//! callers queue instead of failing and the permit is released on every exit
//! path when the guard drops.

use std::sync::Arc;
use std::time::Duration;

use chess_core::notation;
use shakmaty::{Chess, Move};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{EvaluationEngine, PvLine, SearchRequest};
use crate::error::CoachError;

/// Engine score in centipawns from the side to move; mates are `±MATE_SCORE`.
pub type Score = i32;

/// Candidate moves to compare in one position.
#[derive(Debug, Clone)]
pub struct EvaluationJob {
    pub position: Chess,
    pub candidates: Vec<Move>,
    pub time_budget: Duration,
}

/// One score per candidate move of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationResult {
    scores: Vec<(Move, Score)>,
}

impl EvaluationResult {
    pub fn from_scores(scores: Vec<(Move, Score)>) -> Self {
        Self { scores }
    }

    pub fn score_of(&self, mv: &Move) -> Option<Score> {
        self.scores
            .iter()
            .find(|(candidate, _)| candidate == mv)
            .map(|(_, score)| *score)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

type SharedEngine = Arc<Mutex<Box<dyn EvaluationEngine>>>;

#[derive(Clone)]
pub struct EvaluationCoordinator {
    engine: Option<SharedEngine>,
    runtime: Handle,
}

impl EvaluationCoordinator {
    /// Coordinate `engine`, running spawned jobs on `runtime`.
    pub fn new<E>(engine: E, runtime: Handle) -> Self
    where
        E: EvaluationEngine + 'static,
    {
        let engine: Box<dyn EvaluationEngine> = Box::new(engine);
        Self {
            engine: Some(Arc::new(Mutex::new(engine))),
            runtime,
        }
    }

    /// A coordinator without an engine; every request is `EvaluationUnavailable`.
    pub fn offline(runtime: Handle) -> Self {
        Self {
            engine: None,
            runtime,
        }
    }

    pub fn is_online(&self) -> bool {
        self.engine.is_some()
    }

    /// Evaluate a single position.
    pub async fn evaluate(&self, position: &Chess, time_budget: Duration) -> Result<Score, CoachError> {
        let request = SearchRequest {
            fen: notation::fen(position),
            multipv: 1,
            movetime: time_budget,
            searchmoves: Vec::new(),
        };
        let lines = self.run(&request).await?;
        lines
            .first()
            .and_then(PvLine::score)
            .ok_or_else(|| CoachError::EvaluationUnavailable("engine reported no score".into()))
    }

    /// Evaluate exactly `moves` in `position`, one score per move.
    pub async fn evaluate_candidates(
        &self,
        position: &Chess,
        moves: &[Move],
        time_budget: Duration,
    ) -> Result<EvaluationResult, CoachError> {
        let mut candidates: Vec<Move> = Vec::with_capacity(moves.len());
        for mv in moves {
            if !candidates.contains(mv) {
                candidates.push(mv.clone());
            }
        }
        if candidates.is_empty() {
            return Ok(EvaluationResult::default());
        }

        let searchmoves: Vec<String> = candidates.iter().map(notation::uci).collect();
        let request = SearchRequest {
            fen: notation::fen(position),
            multipv: candidates.len() as u32,
            movetime: time_budget,
            searchmoves: searchmoves.clone(),
        };
        let lines = self.run(&request).await?;

        let mut scores = Vec::with_capacity(candidates.len());
        for (mv, uci) in candidates.into_iter().zip(searchmoves) {
            let score = lines
                .iter()
                .find(|line| line.first_move() == Some(uci.as_str()))
                .and_then(PvLine::score)
                .ok_or_else(|| {
                    CoachError::EvaluationUnavailable(format!("engine returned no score for {uci}"))
                })?;
            scores.push((mv, score));
        }

        Ok(EvaluationResult::from_scores(scores))
    }

    /// Run a job to completion.
    pub async fn run_job(&self, job: &EvaluationJob) -> Result<EvaluationResult, CoachError> {
        self.evaluate_candidates(&job.position, &job.candidates, job.time_budget)
            .await
    }

    /// Run `job` on a background task and hand the outcome to `on_complete` there.
    pub fn spawn_job<F>(&self, job: EvaluationJob, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(EvaluationJob, Result<EvaluationResult, CoachError>) + Send + 'static,
    {
        let coordinator = self.clone();
        self.runtime.spawn(async move {
            let result = coordinator.run_job(&job).await;
            if let Err(e) = &result {
                warn!(error = %e, "Evaluation job failed");
            }
            on_complete(job, result);
        })
    }

    /// Evaluate `position` on a background task and hand the score to `on_complete`.
    pub fn spawn_position<F>(&self, position: Chess, time_budget: Duration, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Score, CoachError>) + Send + 'static,
    {
        let coordinator = self.clone();
        self.runtime.spawn(async move {
            let result = coordinator.evaluate(&position, time_budget).await;
            on_complete(result);
        })
    }

    /// Wait for the permit, then shut the engine down.
    pub async fn shutdown(&self) {
        if let Some(engine) = &self.engine {
            engine.lock().await.shutdown().await;
            debug!("Engine shut down");
        }
    }

    async fn run(&self, request: &SearchRequest) -> Result<Vec<PvLine>, CoachError> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| CoachError::EvaluationUnavailable("no engine configured".into()))?;

        let mut permit = engine.lock().await;
        debug!(fen = %request.fen, multipv = request.multipv, "Engine permit acquired");
        permit.analyse(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MATE_SCORE;
    use async_trait::async_trait;
    use chess_core::notation::parse_move;

    /// Answers every search from a fixed table of (uci, cp, mate) lines.
    struct TableEngine {
        lines: Vec<(&'static str, Option<i32>, Option<i32>)>,
        requests: Arc<std::sync::Mutex<Vec<SearchRequest>>>,
    }

    #[async_trait]
    impl EvaluationEngine for TableEngine {
        async fn analyse(&mut self, request: &SearchRequest) -> Result<Vec<PvLine>, CoachError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self
                .lines
                .iter()
                .filter(|(uci, _, _)| {
                    request.searchmoves.is_empty() || request.searchmoves.iter().any(|m| m == uci)
                })
                .take(request.multipv as usize)
                .map(|(uci, cp, mate)| PvLine {
                    pv: vec![uci.to_string()],
                    cp: *cp,
                    mate: *mate,
                })
                .collect())
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl EvaluationEngine for FailingEngine {
        async fn analyse(&mut self, _request: &SearchRequest) -> Result<Vec<PvLine>, CoachError> {
            Err(CoachError::EvaluationUnavailable("engine crashed".into()))
        }
    }

    fn table_coordinator(
        lines: Vec<(&'static str, Option<i32>, Option<i32>)>,
    ) -> (EvaluationCoordinator, Arc<std::sync::Mutex<Vec<SearchRequest>>>) {
        let requests = Arc::new(std::sync::Mutex::new(Vec::new()));
        let engine = TableEngine {
            lines,
            requests: requests.clone(),
        };
        (EvaluationCoordinator::new(engine, Handle::current()), requests)
    }

    #[tokio::test]
    async fn test_evaluate_candidates_restricts_search() {
        let (coordinator, requests) = table_coordinator(vec![
            ("e2e4", Some(30), None),
            ("d2d4", Some(25), None),
            ("g1f3", Some(20), None),
        ]);
        let pos = Chess::default();
        let d4 = parse_move(&pos, "d4").unwrap();
        let nf3 = parse_move(&pos, "Nf3").unwrap();

        let result = coordinator
            .evaluate_candidates(&pos, &[d4.clone(), nf3.clone()], Duration::from_millis(10))
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.score_of(&d4), Some(25));
        assert_eq!(result.score_of(&nf3), Some(20));

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].multipv, 2);
        assert_eq!(requests[0].searchmoves, vec!["d2d4", "g1f3"]);
    }

    #[tokio::test]
    async fn test_evaluate_normalizes_mate() {
        let (coordinator, _) = table_coordinator(vec![("d8h4", None, Some(1))]);
        let score = coordinator
            .evaluate(&Chess::default(), Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(score, MATE_SCORE);
    }

    #[tokio::test]
    async fn test_missing_candidate_is_unavailable() {
        let (coordinator, _) = table_coordinator(vec![("e2e4", Some(30), None)]);
        let pos = Chess::default();
        let a3 = parse_move(&pos, "a3").unwrap();
        let err = coordinator
            .evaluate_candidates(&pos, &[a3], Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::EvaluationUnavailable(_)));
    }

    #[tokio::test]
    async fn test_offline_and_failing_engines_are_unavailable() {
        let offline = EvaluationCoordinator::offline(Handle::current());
        assert!(!offline.is_online());
        let err = offline
            .evaluate(&Chess::default(), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::EvaluationUnavailable(_)));

        let failing = EvaluationCoordinator::new(FailingEngine, Handle::current());
        let err = failing
            .evaluate(&Chess::default(), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::EvaluationUnavailable(_)));

        // The permit was released despite the failure.
        let err = failing
            .evaluate(&Chess::default(), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::EvaluationUnavailable(_)));
    }

    #[tokio::test]
    async fn test_spawn_job_invokes_callback() {
        let (coordinator, _) = table_coordinator(vec![("e2e4", Some(30), None)]);
        let pos = Chess::default();
        let e4 = parse_move(&pos, "e4").unwrap();
        let job = EvaluationJob {
            position: pos,
            candidates: vec![e4.clone()],
            time_budget: Duration::from_millis(10),
        };

        let (tx, rx) = tokio::sync::oneshot::channel();
        coordinator
            .spawn_job(job, move |_job, result| {
                let _ = tx.send(result);
            })
            .await
            .unwrap();

        let result = rx.await.unwrap().unwrap();
        assert_eq!(result.score_of(&e4), Some(30));
    }

    #[tokio::test]
    async fn test_empty_candidates_skip_engine() {
        let (coordinator, requests) = table_coordinator(vec![]);
        let result = coordinator
            .evaluate_candidates(&Chess::default(), &[], Duration::from_millis(10))
            .await
            .unwrap();
        assert!(result.is_empty());
        assert!(requests.lock().unwrap().is_empty());
    }
}
