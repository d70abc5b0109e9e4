//! Build the binary opening book from a PGN collection.
//!
//! Usage: cargo run --release --bin build-book -- <pgn_file> [--min-games 2] [--max-ply 30] [--min-elo 0] [--out data/opening_book.bin]

use std::env;
use std::fs;
use std::path::Path;
use std::time::Instant;

use chess_core::pgn;
use shadow_coach::book::PositionBook;
use shadow_coach::config::CoachConfig;

const DEFAULT_MIN_GAMES: i32 = 2;
const DEFAULT_MAX_PLY: usize = 30;
const DEFAULT_MIN_ELO: u16 = 0;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
    let _ = dotenvy::dotenv();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <pgn_file> [--min-games N] [--max-ply N] [--min-elo N] [--out PATH]",
            args[0]
        );
        std::process::exit(1);
    }

    let pgn_path = &args[1];
    let mut min_games = DEFAULT_MIN_GAMES;
    let mut max_ply = DEFAULT_MAX_PLY;
    let mut min_elo = DEFAULT_MIN_ELO;
    let mut out = CoachConfig::from_env()?.book_path;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--min-games" => {
                min_games = args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_MIN_GAMES);
                i += 2;
            }
            "--max-ply" => {
                max_ply = args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_MAX_PLY);
                i += 2;
            }
            "--min-elo" => {
                min_elo = args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_MIN_ELO);
                i += 2;
            }
            "--out" => {
                if let Some(path) = args.get(i + 1) {
                    out = path.clone();
                }
                i += 2;
            }
            _ => i += 1,
        }
    }

    println!("Building opening book:");
    println!("  PGN file: {pgn_path}");
    println!("  Min Elo: {min_elo}");
    println!("  Max ply: {} ({} moves per side)", max_ply, max_ply / 2);
    println!("  Min games: {min_games}");
    println!();

    let start = Instant::now();
    let collection = pgn::read_games_from_path(pgn_path)?;
    let scanned = collection.games.len();

    let games: Vec<_> = collection
        .games
        .into_iter()
        .filter(|game| {
            let headers = game.headers();
            min_elo == 0
                || (headers.white_elo.unwrap_or(0) >= min_elo && headers.black_elo.unwrap_or(0) >= min_elo)
        })
        .collect();

    println!("Parsing complete in {:.1}s", start.elapsed().as_secs_f64());
    println!("  Total scanned: {scanned}");
    println!("  Skipped (unreadable): {}", collection.skipped);
    println!("  Used ({min_elo}+ Elo): {}", games.len());

    let book = PositionBook::from_games(&games, max_ply, min_games);

    if let Some(parent) = Path::new(&out).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    book.save(&out)?;
    let file_size = fs::metadata(&out)?.len();

    println!();
    println!("Done!");
    println!("  Output: {out}");
    println!("  Size: {} KB", file_size / 1024);
    println!("  Positions: {}", book.position_count());
    println!("  Moves: {}", book.move_count());

    Ok(())
}
