//! PGN ingestion for reference games and opening collections.
//!
//! Only mainlines are kept. Every visitor skips variations; comments are ignored.

use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::ControlFlow;
use std::path::Path;

use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};

use crate::game_data::{GameHeaders, GameResult, ReferenceGame};

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("illegal or unparsable move {san:?} at ply {ply}")]
    IllegalSan { ply: usize, san: String },

    #[error("PGN read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Header-only view of a game, for building a list to choose from.
#[derive(Debug, Clone)]
pub struct GameListing {
    /// Zero-based position of the game in its collection.
    pub index: usize,
    pub headers: GameHeaders,
}

impl GameListing {
    pub fn label(&self) -> String {
        self.headers.label()
    }
}

/// Games read from a collection, plus how many were dropped for bad movetext.
#[derive(Debug, Default)]
pub struct Collection {
    pub games: Vec<ReferenceGame>,
    pub skipped: usize,
}

/// Movetext state for one game.
struct GameState {
    headers: GameHeaders,
    sans: Vec<String>,
}

/// Visitor that collects full mainline games.
#[derive(Default)]
struct GameCollector {
    collection: Collection,
}

/// Visitor that only records headers and skips movetext.
#[derive(Default)]
struct HeaderScanner {
    listings: Vec<GameListing>,
}

/// Visitor that skips to one game by position and collects only that one.
struct GamePicker {
    target: usize,
    seen: usize,
    picked: Option<Result<ReferenceGame, PgnError>>,
}

fn read_tag(headers: &mut GameHeaders, name: &[u8], value: RawTag<'_>) {
    let value = value.decode_utf8_lossy();
    match name {
        b"White" => headers.white = value.to_string(),
        b"Black" => headers.black = value.to_string(),
        b"WhiteElo" => headers.white_elo = value.parse().ok(),
        b"BlackElo" => headers.black_elo = value.parse().ok(),
        b"Result" => headers.result = GameResult::from_tag(&value),
        b"Event" => headers.event = Some(value.to_string()),
        _ => {}
    }
}

impl Visitor for GameCollector {
    type Tags = GameHeaders;
    type Movetext = GameState;
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<(), GameHeaders> {
        ControlFlow::Continue(GameHeaders::default())
    }

    fn tag(&mut self, tags: &mut GameHeaders, name: &[u8], value: RawTag<'_>) -> ControlFlow<()> {
        read_tag(tags, name, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: GameHeaders) -> ControlFlow<(), GameState> {
        ControlFlow::Continue(GameState {
            headers: tags,
            sans: Vec::new(),
        })
    }

    fn san(&mut self, state: &mut GameState, san_plus: SanPlus) -> ControlFlow<()> {
        state.sans.push(san_plus.san.to_string());
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _state: &mut GameState) -> ControlFlow<(), Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, state: GameState) {
        match ReferenceGame::from_san(state.headers, &state.sans) {
            Ok(game) => self.collection.games.push(game),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping game with bad movetext");
                self.collection.skipped += 1;
            }
        }
    }
}

impl Visitor for HeaderScanner {
    type Tags = GameHeaders;
    type Movetext = ();
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<(), GameHeaders> {
        ControlFlow::Continue(GameHeaders::default())
    }

    fn tag(&mut self, tags: &mut GameHeaders, name: &[u8], value: RawTag<'_>) -> ControlFlow<()> {
        read_tag(tags, name, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: GameHeaders) -> ControlFlow<(), ()> {
        self.listings.push(GameListing {
            index: self.listings.len(),
            headers: tags,
        });
        ControlFlow::Break(())
    }

    fn san(&mut self, _state: &mut (), _san_plus: SanPlus) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _state: &mut ()) -> ControlFlow<(), Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, _state: ()) {}
}

impl Visitor for GamePicker {
    type Tags = GameHeaders;
    type Movetext = GameState;
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<(), GameHeaders> {
        ControlFlow::Continue(GameHeaders::default())
    }

    fn tag(&mut self, tags: &mut GameHeaders, name: &[u8], value: RawTag<'_>) -> ControlFlow<()> {
        read_tag(tags, name, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: GameHeaders) -> ControlFlow<(), GameState> {
        let index = self.seen;
        self.seen += 1;
        if index != self.target {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(GameState {
            headers: tags,
            sans: Vec::new(),
        })
    }

    fn san(&mut self, state: &mut GameState, san_plus: SanPlus) -> ControlFlow<()> {
        state.sans.push(san_plus.san.to_string());
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _state: &mut GameState) -> ControlFlow<(), Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, state: GameState) {
        self.picked = Some(ReferenceGame::from_san(state.headers, &state.sans));
    }
}

/// Read every game of a PGN stream.
pub fn read_games<R: Read>(input: R) -> Result<Collection, PgnError> {
    let mut reader = Reader::new(input);
    let mut collector = GameCollector::default();
    while reader.read_game(&mut collector)?.is_some() {}
    Ok(collector.collection)
}

/// Read every game of a PGN file.
pub fn read_games_from_path<P: AsRef<Path>>(path: P) -> Result<Collection, PgnError> {
    let file = File::open(path)?;
    read_games(BufReader::new(file))
}

/// Scan only the headers of every game in a PGN stream.
pub fn scan_headers<R: Read>(input: R) -> Result<Vec<GameListing>, PgnError> {
    let mut reader = Reader::new(input);
    let mut scanner = HeaderScanner::default();
    while reader.read_game(&mut scanner)?.is_some() {}
    Ok(scanner.listings)
}

/// Read the game at zero-based `index`, as numbered by [`scan_headers`].
///
/// `Ok(None)` when the stream has fewer games; an error when that game's
/// movetext is illegal.
pub fn read_game_at<R: Read>(input: R, index: usize) -> Result<Option<ReferenceGame>, PgnError> {
    let mut reader = Reader::new(input);
    let mut picker = GamePicker {
        target: index,
        seen: 0,
        picked: None,
    };
    while picker.picked.is_none() && reader.read_game(&mut picker)?.is_some() {}
    picker.picked.transpose()
}
