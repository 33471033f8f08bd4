// Manual correction requests: square-by-square edits applied as one batch.

use crate::error::InferenceError;
use cozy_chess::{
    get_bishop_moves, get_king_moves, get_knight_moves, get_pawn_attacks, get_rook_moves, Board, BoardBuilder, CastleRights,
    Color, File, Piece, Rank, Square,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occupant {
    Empty,
    Piece(Piece, Color),
}

impl Occupant {
    fn cell(self) -> Option<(Piece, Color)> {
        match self {
            Occupant::Empty => None,
            Occupant::Piece(p, c) => Some((p, c)),
        }
    }

    /// FEN letter (`P`, `n`, ...) or `.`/`-` for an empty square.
    pub fn from_fen_char(c: char) -> Option<Self> {
        let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
        let piece = match c.to_ascii_lowercase() {
            '.' | '-' => return Some(Occupant::Empty),
            'p' => Piece::Pawn,
            'n' => Piece::Knight,
            'b' => Piece::Bishop,
            'r' => Piece::Rook,
            'q' => Piece::Queen,
            'k' => Piece::King,
            _ => return None,
        };
        Some(Occupant::Piece(piece, color))
    }
}

/// Edits collected by the operator. Later edits of a square replace earlier ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CorrectionBatch {
    edits: Vec<(Square, Occupant)>,
    side_to_move: Option<Color>,
}

impl CorrectionBatch {
    pub fn new() -> Self { Self::default() }

    pub fn set(&mut self, square: Square, occupant: Occupant) -> &mut Self {
        self.edits.retain(|(sq, _)| *sq != square);
        self.edits.push((square, occupant));
        self
    }

    pub fn with_side_to_move(&mut self, color: Color) -> &mut Self {
        self.side_to_move = Some(color);
        self
    }

    pub fn edits(&self) -> &[(Square, Occupant)] { &self.edits }
    pub fn side_to_move(&self) -> Option<Color> { self.side_to_move }
    pub fn is_empty(&self) -> bool { self.edits.is_empty() && self.side_to_move.is_none() }
    pub fn touches(&self, square: Square) -> bool { self.edits.iter().any(|(sq, _)| *sq == square) }
}

/// Boundary signal closing a correction dialog.
#[derive(Clone, Debug, PartialEq)]
pub enum CorrectionRequest {
    Commit(CorrectionBatch),
    Cancel,
}

fn home_rank(color: Color) -> Rank {
    match color {
        Color::White => Rank::First,
        Color::Black => Rank::Eighth,
    }
}

fn check_placement(builder: &BoardBuilder) -> Result<(), InferenceError> {
    for color in Color::ALL {
        let kings = Square::ALL.iter().filter(|&&sq| builder.square(sq) == Some((Piece::King, color))).count();
        if kings != 1 {
            return Err(InferenceError::InconsistentPosition(format!("{color:?} has {kings} kings")));
        }
    }
    for sq in Square::ALL {
        if let Some((Piece::Pawn, _)) = builder.square(sq) {
            if sq.rank() == Rank::First || sq.rank() == Rank::Eighth {
                return Err(InferenceError::InconsistentPosition(format!("pawn on back rank at {sq}")));
            }
        }
    }
    Ok(())
}

/// Existing rights survive while king and rook stay home; an explicitly
/// placed home king/rook pair grants the right.
fn derive_rights(builder: &BoardBuilder, prior: &Board, batch: &CorrectionBatch, color: Color) -> CastleRights {
    let rank = home_rank(color);
    let king_sq = Square::new(File::E, rank);
    let king_home = builder.square(king_sq) == Some((Piece::King, color));
    let current = prior.castle_rights(color);
    let right = |file: File, had: bool| {
        let rook_sq = Square::new(file, rank);
        let rook_home = builder.square(rook_sq) == Some((Piece::Rook, color));
        let placed = batch.touches(king_sq) || batch.touches(rook_sq);
        (king_home && rook_home && (had || placed)).then_some(file)
    };
    CastleRights { short: right(File::H, current.short == Some(File::H)), long: right(File::A, current.long == Some(File::A)) }
}

/// The king of the side that just moved stands attacked.
fn waiting_king_attacked(board: &Board) -> bool {
    let mover = board.side_to_move();
    let king = board.king(!mover);
    let occupied = board.occupied();
    let diagonal = board.pieces(Piece::Bishop) | board.pieces(Piece::Queen);
    let straight = board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    let attackers = (get_knight_moves(king) & board.pieces(Piece::Knight))
        | (get_king_moves(king) & board.pieces(Piece::King))
        | (get_pawn_attacks(king, !mover) & board.pieces(Piece::Pawn))
        | (get_bishop_moves(king, occupied) & diagonal)
        | (get_rook_moves(king, occupied) & straight);
    !(attackers & board.colors(mover)).is_empty()
}

/// Applies every edit of `batch` to `prior` or none of them.
pub(crate) fn apply_batch(prior: &Board, batch: &CorrectionBatch) -> Result<Board, InferenceError> {
    let mut builder = BoardBuilder::from_board(prior);
    for &(sq, occupant) in batch.edits() {
        *builder.square_mut(sq) = occupant.cell();
    }
    if let Some(color) = batch.side_to_move() { builder.side_to_move = color; }
    builder.en_passant = None;
    builder.halfmove_clock = 0;
    check_placement(&builder)?;
    for color in Color::ALL {
        *builder.castle_rights_mut(color) = derive_rights(&builder, prior, batch, color);
    }
    let board = builder.build().map_err(|e| InferenceError::InconsistentPosition(format!("{e:?}")))?;
    if waiting_king_attacked(&board) {
        let mover = board.side_to_move();
        return Err(InferenceError::InconsistentPosition(format!("{:?} king is in check with {mover:?} to move", !mover)));
    }
    Ok(board)
}
