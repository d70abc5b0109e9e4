//! Shadow-play chess coach
//!
//! Replays a recorded game while the learner plays one side, scoring
//! departures from the game with a UCI engine.
//!
//! Commands on stdin: a move (SAN or UCI), `analyze`, `report`, `quit`.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use shakmaty::Color;
use tokio::io::{AsyncBufReadExt, BufReader as AsyncBufReader};
use tracing::{info, warn};

use chess_core::pgn;
use shadow_coach::book::PositionBook;
use shadow_coach::config::CoachConfig;
use shadow_coach::engine::{EngineOptions, UciEngine};
use shadow_coach::evaluation::EvaluationCoordinator;
use shadow_coach::host::{SessionHost, TrainerInput};
use shadow_coach::openings::OpeningNames;
use shadow_coach::quiz::CoordinateQuiz;
use shadow_coach::session::{CoachContext, Session};

#[derive(Debug, Default)]
struct CliArgs {
    game: Option<usize>,
    editor: bool,
    quiz: bool,
    play_as: Option<Color>,
}

/// Parse `--game N`, `--editor`, `--quiz` and `--as white|black` from CLI args
fn parse_args() -> anyhow::Result<CliArgs> {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--game" => {
                let n = args.get(i + 1).context("--game needs a number")?;
                cli.game = Some(n.parse().with_context(|| format!("invalid game number {n:?}"))?);
                i += 2;
            }
            "--as" => {
                cli.play_as = match args.get(i + 1).map(String::as_str) {
                    Some("white") => Some(Color::White),
                    Some("black") => Some(Color::Black),
                    other => anyhow::bail!("--as expects white or black, got {other:?}"),
                };
                i += 2;
            }
            "--editor" => {
                cli.editor = true;
                i += 1;
            }
            "--quiz" => {
                cli.quiz = true;
                i += 1;
            }
            other => {
                warn!(arg = other, "Ignoring unknown argument");
                i += 1;
            }
        }
    }
    Ok(cli)
}

fn print_lines(lines: &[String]) {
    // Narration arrives newest first; print it in reading order.
    for line in lines.iter().rev() {
        println!("{line}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only narration
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let cli = parse_args()?;
    let config = CoachConfig::from_env()?;
    info!(
        stockfish_path = %config.stockfish_path,
        movetime_ms = config.engine_movetime.as_millis() as u64,
        policy = ?config.divergence_policy,
        "Coach config loaded"
    );

    if !cli.editor && !cli.quiz && cli.game.is_none() {
        let file = File::open(&config.games_pgn)
            .with_context(|| format!("cannot open games collection {}", config.games_pgn))?;
        for listing in pgn::scan_headers(BufReader::new(file))? {
            println!("{:>4}  {}", listing.index, listing.label());
        }
        println!("Pick a game with --game N, or use --editor / --quiz");
        return Ok(());
    }

    let coordinator = match UciEngine::spawn(
        &config.stockfish_path,
        EngineOptions {
            threads: config.engine_threads,
            hash_mb: config.engine_hash_mb,
            ..EngineOptions::default()
        },
    )
    .await
    {
        Ok(engine) => {
            info!("Engine ready");
            EvaluationCoordinator::new(engine, tokio::runtime::Handle::current())
        }
        Err(e) => {
            warn!(error = %e, "Engine unavailable, moves will not be scored");
            EvaluationCoordinator::offline(tokio::runtime::Handle::current())
        }
    };

    let (openings, openings_task) = OpeningNames::spawn_from_pgn(&config.openings_pgn);
    tokio::spawn(async move {
        match openings_task.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "Opening names unavailable"),
            Err(e) => warn!(error = %e, "Opening index task failed"),
        }
    });

    let context = CoachContext {
        book: Arc::new(PositionBook::load_or_empty(&config.book_path)),
        openings,
        coordinator: coordinator.clone(),
        time_budget: config.engine_movetime,
        divergence: config.divergence_policy,
    };

    let mut host = SessionHost::new();
    if let Some(index) = cli.game {
        let file = File::open(&config.games_pgn)
            .with_context(|| format!("cannot open games collection {}", config.games_pgn))?;
        let game = pgn::read_game_at(BufReader::new(file), index)?
            .with_context(|| format!("no game {index} in {}", config.games_pgn))?;
        let session = match cli.play_as {
            Some(color) => Session::shadow_as(game, color, context.clone()),
            None => Session::shadow(game, context.clone()),
        };
        host.open(Box::new(session));
        print_lines(&host.take_unread());
    }
    if cli.editor {
        host.open(Box::new(Session::editor(context.clone())));
    }
    if cli.quiz {
        let quiz = CoordinateQuiz::new();
        println!("{}", quiz.prompt());
        host.open(Box::new(quiz));
    }

    // Background evaluations write narration between commands
    let mut poll = tokio::time::interval(Duration::from_millis(200));
    let mut stdin = AsyncBufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = poll.tick() => print_lines(&host.take_unread()),
            line = stdin.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match line.trim() {
                    "" => {}
                    "quit" => break,
                    "report" => {
                        if let Some(tab) = host.active() {
                            println!("{}", serde_json::to_string_pretty(&tab.report())?);
                        }
                    }
                    "analyze" => {
                        if let Err(e) = host.analyze() {
                            println!("{e}");
                        }
                    }
                    text => match host.submit(TrainerInput::Move(text.to_string())) {
                        Ok(lines) => print_lines(&lines),
                        Err(e) if e.is_recoverable() => println!("{e}"),
                        Err(e) => return Err(e.into()),
                    },
                }
            }
        }
    }

    info!("Waiting for in-flight evaluations...");
    host.settle_all().await;
    print_lines(&host.take_unread());
    if let Some(tab) = host.active() {
        println!("{}", serde_json::to_string_pretty(&tab.report())?);
    }
    coordinator.shutdown().await;
    info!("Coach finished");
    Ok(())
}
