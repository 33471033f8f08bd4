use super::cozy::{castle_squares, is_castle, is_en_passant};
use cozy_chess::{Board, File, Move, Piece, Square};

pub fn piece_letter(piece: Piece) -> Option<char> {
    match piece {
        Piece::Pawn => None,
        Piece::Knight => Some('N'),
        Piece::Bishop => Some('B'),
        Piece::Rook => Some('R'),
        Piece::Queen => Some('Q'),
        Piece::King => Some('K'),
    }
}

fn file_char(sq: Square) -> char { (b'a' + sq.file() as u8) as char }

fn rank_char(sq: Square) -> char { (b'1' + sq.rank() as u8) as char }

/// Standard algebraic notation for a legal move on `board`.
pub fn format_san(board: &Board, mv: Move) -> String {
    let mut out = String::new();
    if is_castle(board, mv) {
        let (king_to, _, _) = castle_squares(mv);
        out.push_str(if king_to.file() == File::G { "O-O" } else { "O-O-O" });
    } else {
        let piece = board.piece_on(mv.from).unwrap_or(Piece::Pawn);
        let capture = board.piece_on(mv.to).is_some() || is_en_passant(board, mv);
        match piece_letter(piece) {
            None => {
                if capture { out.push(file_char(mv.from)); }
            }
            Some(letter) => {
                out.push(letter);
                out.push_str(&disambiguation(board, mv, piece));
            }
        }
        if capture { out.push('x'); }
        out.push_str(&mv.to.to_string());
        if let Some(promo) = mv.promotion.and_then(piece_letter) {
            out.push('=');
            out.push(promo);
        }
    }
    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        let has_reply = after.generate_moves(|ml| !ml.is_empty());
        out.push(if has_reply { '+' } else { '#' });
    }
    out
}

fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    if piece == Piece::King { return String::new(); }
    let mut rivals: Vec<Square> = Vec::new();
    board.generate_moves(|ml| {
        if ml.piece == piece && ml.from != mv.from && ml.to.has(mv.to) {
            rivals.push(ml.from);
        }
        false
    });
    if rivals.is_empty() {
        String::new()
    } else if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
        file_char(mv.from).to_string()
    } else if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
        rank_char(mv.from).to_string()
    } else {
        mv.from.to_string()
    }
}
