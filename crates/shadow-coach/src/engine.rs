//! Position evaluation engines: the backend trait and a UCI process driver (async I/O)

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::error::CoachError;

/// Magnitude every forced mate is normalized to, whatever its distance.
pub const MATE_SCORE: i32 = 100_000;

/// One search to run on the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub fen: String,
    /// Number of principal variations to report
    pub multipv: u32,
    pub movetime: Duration,
    /// Restrict the search to these moves (UCI); empty means all legal moves
    pub searchmoves: Vec<String>,
}

/// A single PV line from multi-PV analysis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PvLine {
    /// Principal variation moves
    pub pv: Vec<String>,
    /// Centipawn score, side to move
    pub cp: Option<i32>,
    /// Mate in N (negative: side to move gets mated)
    pub mate: Option<i32>,
}

impl PvLine {
    pub fn first_move(&self) -> Option<&str> {
        self.pv.first().map(String::as_str)
    }

    /// Score from the side to move, mates folded into `±MATE_SCORE`.
    pub fn score(&self) -> Option<i32> {
        match (self.mate, self.cp) {
            (Some(m), _) if m > 0 => Some(MATE_SCORE),
            (Some(_), _) => Some(-MATE_SCORE),
            (None, Some(cp)) => Some(cp),
            (None, None) => None,
        }
    }
}

/// A backend able to run restricted multi-PV searches.
///
/// Implementations are driven by one caller at a time; serialization is the
/// coordinator's job.
#[async_trait]
pub trait EvaluationEngine: Send {
    /// Run one search and return its lines ordered by multipv index.
    async fn analyse(&mut self, request: &SearchRequest) -> Result<Vec<PvLine>, CoachError>;

    /// Release the backend. Called once, after the last search.
    async fn shutdown(&mut self) {}
}

/// Process options: UCI settings applied after the handshake, plus read deadlines.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub threads: u32,
    pub hash_mb: u32,
    /// Extra time allowed past the search budget before an engine counts as stalled
    pub read_grace: Duration,
    /// How long a stalled engine gets to answer `stop` with its `bestmove`
    pub stop_grace: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 256,
            read_grace: Duration::from_secs(2),
            stop_grace: Duration::from_secs(2),
        }
    }
}

/// UCI engine process (Stockfish or compatible)
pub struct UciEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    multipv: u32,
    read_grace: Duration,
    stop_grace: Duration,
    /// Set once the engine's output can no longer be matched to our requests.
    dead: bool,
}

impl UciEngine {
    /// Spawn the engine process and initialize UCI
    pub async fn spawn(path: &str, options: EngineOptions) -> Result<Self, CoachError> {
        Self::spawn_command(Command::new(path), options).await
    }

    /// Like [`UciEngine::spawn`], for an engine that needs arguments or a wrapper.
    pub async fn spawn_command(mut command: Command, options: EngineOptions) -> Result<Self, CoachError> {
        let program = command.as_std().get_program().to_string_lossy().into_owned();
        let mut process = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CoachError::Engine(format!("Failed to spawn {program}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| CoachError::Engine("engine stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| CoachError::Engine("engine stdout unavailable".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            multipv: 1,
            read_grace: options.read_grace,
            stop_grace: options.stop_grace,
            dead: false,
        };

        let handshake = Instant::now() + Duration::from_secs(10);
        engine.send("uci").await?;
        engine.wait_for("uciok", handshake).await?;

        engine
            .send(&format!("setoption name Threads value {}", options.threads))
            .await?;
        engine
            .send(&format!("setoption name Hash value {}", options.hash_mb))
            .await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok", handshake).await?;

        Ok(engine)
    }

    /// Send a command to the engine
    async fn send(&mut self, cmd: &str) -> Result<(), CoachError> {
        debug!(cmd, "SF <");
        let written = match self.stdin.write_all(format!("{cmd}\n").as_bytes()).await {
            Ok(()) => self.stdin.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| {
            self.dead = true;
            CoachError::Engine(format!("Failed to write to engine: {e}"))
        })
    }

    /// Read one line, giving up at `deadline`. `None` means the engine closed its output.
    async fn read_line(&mut self, deadline: Instant) -> Result<Option<String>, CoachError> {
        let mut line = String::new();
        let read = timeout_at(deadline, self.stdout.read_line(&mut line))
            .await
            .map_err(|_| CoachError::Engine("engine did not answer in time".into()))?
            .map_err(|e| CoachError::Engine(format!("Failed to read from engine: {e}")))?;
        if read == 0 {
            return Ok(None);
        }
        let trimmed = line.trim().to_string();
        debug!(line = %trimmed, "SF >");
        Ok(Some(trimmed))
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str, deadline: Instant) -> Result<(), CoachError> {
        loop {
            match self.read_line(deadline).await? {
                Some(line) if line == expected => return Ok(()),
                Some(_) => continue,
                None => {
                    return Err(CoachError::Engine(format!(
                        "engine exited before sending {expected}"
                    )))
                }
            }
        }
    }

    /// Stop an overrunning search and discard its output up to `bestmove`, so the
    /// next search reads only its own lines. An engine that never gets there is killed.
    async fn recover(&mut self) {
        let deadline = Instant::now() + self.stop_grace;
        let mut drained = self.send("stop").await;
        while drained.is_ok() {
            match self.read_line(deadline).await {
                Ok(Some(line)) if line.starts_with("bestmove") => break,
                Ok(Some(_)) => continue,
                Ok(None) => drained = Err(CoachError::Engine("engine closed its output".into())),
                Err(e) => drained = Err(e),
            }
        }

        if let Err(e) = drained {
            warn!(error = %e, "Engine ignored stop, shutting it down");
            self.dead = true;
            let _ = self.process.start_kill();
        }
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<PvLine>, CoachError> {
        if self.dead {
            return Err(CoachError::Engine("engine stopped responding earlier".into()));
        }

        let multipv = request.multipv.max(1);
        if multipv != self.multipv {
            self.send(&format!("setoption name MultiPV value {multipv}"))
                .await?;
            self.multipv = multipv;
        }
        self.send(&format!("position fen {}", request.fen)).await?;

        let mut go = format!("go movetime {}", request.movetime.as_millis());
        if !request.searchmoves.is_empty() {
            go.push_str(" searchmoves ");
            go.push_str(&request.searchmoves.join(" "));
        }
        self.send(&go).await?;

        let deadline = Instant::now() + request.movetime + self.read_grace;
        let mut lines = vec![PvLine::default(); multipv as usize];

        loop {
            let line = match self.read_line(deadline).await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.dead = true;
                    return Err(CoachError::Engine("engine closed its output".into()));
                }
                Err(e) => {
                    self.recover().await;
                    return Err(e);
                }
            };

            if line.starts_with("info") && line.contains(" pv ") {
                let pv_idx = parse_multipv_index(&line).unwrap_or(1).max(1) - 1;
                if let Some(entry) = lines.get_mut(pv_idx as usize) {
                    entry.cp = parse_cp(&line);
                    entry.mate = parse_mate(&line);
                    entry.pv = parse_pv(&line);
                }
            } else if line.starts_with("bestmove") {
                break;
            }
        }

        lines.retain(|l| !l.pv.is_empty());
        Ok(lines)
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        if self.dead {
            let _ = self.process.start_kill();
        } else {
            let _ = self.send("quit").await;
        }
        let _ = self.process.wait().await;
    }
}

#[async_trait]
impl EvaluationEngine for UciEngine {
    async fn analyse(&mut self, request: &SearchRequest) -> Result<Vec<PvLine>, CoachError> {
        self.search(request).await.map_err(|e| match e {
            CoachError::Engine(msg) => {
                warn!(error = %msg, "Engine search failed");
                CoachError::EvaluationUnavailable(msg)
            }
            other => other,
        })
    }

    async fn shutdown(&mut self) {
        self.quit().await;
    }
}

/// Value following `keyword` in an info line
fn parse_after<T: std::str::FromStr>(line: &str, keyword: &str) -> Option<T> {
    let mut parts = line.split_whitespace();
    while let Some(part) = parts.next() {
        if part == keyword {
            return parts.next()?.parse().ok();
        }
        // Everything after `pv` is moves, never keywords.
        if part == "pv" {
            return None;
        }
    }
    None
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    parse_after(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    parse_after(line, "mate")
}

/// Parse multipv index from info line
fn parse_multipv_index(line: &str) -> Option<u32> {
    parse_after(line, "multipv")
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    line.split_whitespace()
        .skip_while(|part| *part != "pv")
        .skip(1)
        .take_while(|part| !part.starts_with("bmc") && *part != "string")
        .map(str::to_string)
        .collect()
}
