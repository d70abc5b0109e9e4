#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chess_core::notation::parse_move;
use chess_core::{GameHeaders, GameResult, ReferenceGame};
use shadow_coach::book::{BookMoveStats, BookSource, EmptyBook, PositionBook};
use shadow_coach::engine::{EvaluationEngine, PvLine, SearchRequest};
use shadow_coach::error::CoachError;
use shadow_coach::evaluation::EvaluationCoordinator;
use shadow_coach::openings::{OpeningNameIndex, OpeningNames};
use shadow_coach::session::{CoachContext, DivergencePolicy};
use shakmaty::Chess;
use tokio::runtime::Handle;

/// What the scripted engine saw, shared with the test.
#[derive(Default)]
pub struct EngineLog {
    pub requests: Mutex<Vec<SearchRequest>>,
    pub intervals: Mutex<Vec<(Instant, Instant)>>,
    /// Calls that arrived while another search was still running
    pub overlaps: AtomicUsize,
    busy: AtomicBool,
}

impl EngineLog {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// True when no two recorded searches overlapped in time.
    pub fn intervals_disjoint(&self) -> bool {
        let mut intervals = self.intervals.lock().unwrap().clone();
        intervals.sort_by_key(|(start, _)| *start);
        intervals.windows(2).all(|w| w[0].1 <= w[1].0)
    }
}

/// Engine double: scores every UCI move from a fixed table, after a delay.
pub struct ScriptedEngine {
    scores: HashMap<String, i32>,
    delay: Duration,
    log: Arc<EngineLog>,
}

impl ScriptedEngine {
    pub fn new(scores: &[(&str, i32)], delay: Duration) -> (Self, Arc<EngineLog>) {
        let log = Arc::new(EngineLog::default());
        let engine = Self {
            scores: scores.iter().map(|(uci, cp)| (uci.to_string(), *cp)).collect(),
            delay,
            log: log.clone(),
        };
        (engine, log)
    }
}

#[async_trait]
impl EvaluationEngine for ScriptedEngine {
    async fn analyse(&mut self, request: &SearchRequest) -> Result<Vec<PvLine>, CoachError> {
        if self.log.busy.swap(true, Ordering::SeqCst) {
            self.log.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let start = Instant::now();
        self.log.requests.lock().unwrap().push(request.clone());

        tokio::time::sleep(self.delay).await;

        let lines = request
            .searchmoves
            .iter()
            .map(|uci| PvLine {
                pv: vec![uci.clone()],
                cp: Some(self.scores.get(uci).copied().unwrap_or(0)),
                mate: None,
            })
            .collect::<Vec<_>>();
        let lines = if lines.is_empty() {
            vec![PvLine {
                pv: vec!["e2e4".to_string()],
                cp: Some(self.scores.get("position").copied().unwrap_or(0)),
                mate: None,
            }]
        } else {
            lines
        };

        self.log.intervals.lock().unwrap().push((start, Instant::now()));
        self.log.busy.store(false, Ordering::SeqCst);
        Ok(lines)
    }
}

pub fn game(result: GameResult, sans: &[&str]) -> ReferenceGame {
    let headers = GameHeaders {
        white: "Anderssen".into(),
        black: "Kieseritzky".into(),
        result,
        ..GameHeaders::default()
    };
    ReferenceGame::from_san(headers, sans).unwrap()
}

/// Book with the given SAN moves from the start position.
pub fn start_book(sans: &[&str]) -> PositionBook {
    let start = Chess::default();
    let mut book = PositionBook::default();
    for san in sans {
        let mv = parse_move(&start, san).unwrap();
        book.insert(&start, &mv, BookMoveStats { games: 10, ..BookMoveStats::default() });
    }
    book
}

/// Opening index from (name, space-separated SAN moves) pairs.
pub fn openings(lines: &[(&str, &str)]) -> OpeningNames {
    let games: Vec<ReferenceGame> = lines
        .iter()
        .map(|(name, sans)| {
            let headers = GameHeaders {
                white: name.to_string(),
                ..GameHeaders::default()
            };
            let sans: Vec<&str> = sans.split_whitespace().collect();
            ReferenceGame::from_san(headers, &sans).unwrap()
        })
        .collect();
    OpeningNames::ready(OpeningNameIndex::from_games(&games))
}

pub struct ContextBuilder {
    coordinator: EvaluationCoordinator,
    book: Arc<dyn BookSource>,
    openings: OpeningNames,
    divergence: DivergencePolicy,
}

impl ContextBuilder {
    pub fn offline() -> Self {
        Self::with_coordinator(EvaluationCoordinator::offline(Handle::current()))
    }

    pub fn scripted(engine: ScriptedEngine) -> Self {
        Self::with_coordinator(EvaluationCoordinator::new(engine, Handle::current()))
    }

    pub fn with_coordinator(coordinator: EvaluationCoordinator) -> Self {
        Self {
            coordinator,
            book: Arc::new(EmptyBook),
            openings: OpeningNames::default(),
            divergence: DivergencePolicy::default(),
        }
    }

    pub fn book(mut self, book: PositionBook) -> Self {
        self.book = Arc::new(book);
        self
    }

    pub fn openings(mut self, openings: OpeningNames) -> Self {
        self.openings = openings;
        self
    }

    pub fn divergence(mut self, policy: DivergencePolicy) -> Self {
        self.divergence = policy;
        self
    }

    pub fn build(self) -> CoachContext {
        CoachContext {
            book: self.book,
            openings: self.openings,
            coordinator: self.coordinator,
            time_budget: Duration::from_millis(5),
            divergence: self.divergence,
        }
    }
}
