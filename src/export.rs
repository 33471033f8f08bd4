use crate::game::Game;
use cozy_chess::{Color, GameStatus};

const LINE_WIDTH: usize = 80;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PgnHeaders {
    pub event: String,
    pub site: String,
    pub date: String,
    pub round: String,
    pub white: String,
    pub black: String,
}

impl Default for PgnHeaders {
    fn default() -> Self {
        Self {
            event: "Board watch".to_string(),
            site: "?".to_string(),
            date: "????.??.??".to_string(),
            round: "-".to_string(),
            white: "?".to_string(),
            black: "?".to_string(),
        }
    }
}

/// "1-0", "0-1", "1/2-1/2" or "*" for the current position.
pub fn result_token(game: &Game) -> &'static str {
    let pos = game.position();
    match pos.status() {
        GameStatus::Won => match pos.side_to_move() {
            Color::White => "0-1",
            Color::Black => "1-0",
        },
        GameStatus::Drawn => "1/2-1/2",
        GameStatus::Ongoing => "*",
    }
}

fn escape(value: &str) -> String { value.replace('\\', "\\\\").replace('"', "\\\"") }

/// Renders the game as PGN: the seven-tag roster, `SetUp`/`FEN` when the
/// record does not start from the standard position, then SAN movetext.
pub fn pgn(game: &Game, headers: &PgnHeaders) -> String {
    let result = result_token(game);
    let mut out = String::new();
    let tags = [
        ("Event", headers.event.as_str()),
        ("Site", headers.site.as_str()),
        ("Date", headers.date.as_str()),
        ("Round", headers.round.as_str()),
        ("White", headers.white.as_str()),
        ("Black", headers.black.as_str()),
        ("Result", result),
    ];
    for (name, value) in tags {
        out.push_str(&format!("[{name} \"{}\"]\n", escape(value)));
    }
    let initial = game.initial();
    if !initial.is_startpos() {
        out.push_str("[SetUp \"1\"]\n");
        out.push_str(&format!("[FEN \"{}\"]\n", initial.fen()));
    }
    out.push('\n');

    let mut tokens = Vec::with_capacity(game.ply() * 3 / 2 + 1);
    let mut number = initial.fen().split_whitespace().nth(5).and_then(|n| n.parse::<usize>().ok()).unwrap_or(1);
    let mut side = initial.side_to_move();
    for (i, played) in game.history().enumerate() {
        match side {
            Color::White => tokens.push(format!("{number}.")),
            Color::Black if i == 0 => tokens.push(format!("{number}...")),
            Color::Black => {}
        }
        tokens.push(played.san.clone());
        if side == Color::Black { number += 1; }
        side = !side;
    }
    tokens.push(result.to_string());

    let mut line = String::new();
    for token in tokens {
        if !line.is_empty() && line.len() + 1 + token.len() > LINE_WIDTH {
            out.push_str(&line);
            out.push('\n');
            line.clear();
        }
        if !line.is_empty() { line.push(' '); }
        line.push_str(&token);
    }
    out.push_str(&line);
    out.push('\n');
    out
}
