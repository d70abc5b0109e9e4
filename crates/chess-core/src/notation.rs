//! Move notation helpers: parse learner input, render SAN and whole move sequences.

use shakmaty::{
    fen::Fen,
    san::{San, SanPlus},
    uci::UciMove,
    CastlingMode, Chess, EnPassantMode, Move, Position,
};

/// Resolve move text (UCI such as `g1f3` or SAN such as `Nf3+`) to a legal move.
/// Returns `None` for unparsable text or a move that is not legal in `pos`.
pub fn parse_move(pos: &Chess, text: &str) -> Option<Move> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(uci) = text.parse::<UciMove>() {
        if let Ok(mv) = uci.to_move(pos) {
            return Some(mv);
        }
    }

    let cleaned = text.trim_end_matches(['!', '?']);
    let san_plus: SanPlus = cleaned.parse().ok()?;
    san_plus.san.to_move(pos).ok()
}

/// SAN of `mv` played from `pos`, with `+` or `#` appended when it checks or mates.
pub fn san_plus(pos: &Chess, mv: &Move) -> String {
    let mut san = San::from_move(pos, mv.clone()).to_string();
    let mut after = pos.clone();
    after.play_unchecked(mv.clone());
    if after.is_checkmate() {
        san.push('#');
    } else if after.is_check() {
        san.push('+');
    }
    san
}

/// UCI text of a move, standard castling notation (`e1g1`).
pub fn uci(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// Full FEN of a position.
pub fn fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// FEN without move counters: placement, side, castling and en passant.
pub fn normalized_fen(pos: &Chess) -> String {
    normalize_fen(&fen(pos))
}

/// Strips move counters from FEN, keeping only position + side + castling + ep.
pub fn normalize_fen(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Render a move sequence played from the standard start position,
/// numbered like `1. e4 e5 2. Nf3`.
///
/// The sequence must be legal from the start; rendering stops at the first
/// move that is not.
pub fn render_line<'a, I>(moves: I) -> String
where
    I: IntoIterator<Item = &'a Move>,
{
    let mut pos = Chess::default();
    let mut line = String::new();

    for (ply, mv) in moves.into_iter().enumerate() {
        if !pos.legal_moves().contains(mv) {
            break;
        }
        if ply % 2 == 0 {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&format!("{}.", ply / 2 + 1));
        }
        line.push(' ');
        line.push_str(&san_plus(&pos, mv));
        pos.play_unchecked(mv.clone());
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_from_san(sans: &[&str]) -> Vec<Move> {
        let mut pos = Chess::default();
        let mut moves = Vec::new();
        for s in sans {
            let mv = parse_move(&pos, s).unwrap();
            pos.play_unchecked(mv.clone());
            moves.push(mv);
        }
        moves
    }

    #[test]
    fn test_parse_uci_and_san() {
        let pos = Chess::default();
        let by_uci = parse_move(&pos, "g1f3").unwrap();
        let by_san = parse_move(&pos, "Nf3").unwrap();
        assert_eq!(by_uci, by_san);
        assert_eq!(uci(&by_san), "g1f3");
    }

    #[test]
    fn test_parse_rejects_illegal_and_garbage() {
        let pos = Chess::default();
        assert!(parse_move(&pos, "e2e5").is_none());
        assert!(parse_move(&pos, "Ke2").is_none());
        assert!(parse_move(&pos, "hello").is_none());
        assert!(parse_move(&pos, "").is_none());
    }

    #[test]
    fn test_parse_accepts_annotations() {
        let pos = Chess::default();
        assert!(parse_move(&pos, "e4!?").is_some());
    }

    #[test]
    fn test_normalize_fen() {
        let moves = line_from_san(&["e4"]);
        let mut pos = Chess::default();
        pos.play_unchecked(moves[0].clone());
        assert_eq!(
            normalized_fen(&pos),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq -"
        );
        assert_eq!(
            normalize_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3"
        );
    }

    #[test]
    fn test_render_line() {
        let moves = line_from_san(&["e4", "e5", "Nf3"]);
        assert_eq!(render_line(&moves), "1. e4 e5 2. Nf3");
        assert_eq!(render_line(&moves[..2]), "1. e4 e5");
        assert_eq!(render_line(std::iter::empty()), "");
    }

    #[test]
    fn test_render_line_marks_check() {
        let moves = line_from_san(&["e4", "f5", "Qh5"]);
        assert_eq!(render_line(&moves), "1. e4 f5 2. Qh5+");
    }
}
