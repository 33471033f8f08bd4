use crate::error::InferenceError;
use crate::frame::OccupancyFrame;
use cozy_chess::{Board, Color, File, GameStatus, Move, Piece, Square};
use std::fmt;
use std::time::Duration;

/// Authoritative legal-chess state. Only the game manager mutates it.
#[derive(Clone, Debug)]
pub struct GamePosition {
    board: Board,
}

impl GamePosition {
    pub fn startpos() -> Self { Self { board: Board::default() } }

    pub fn from_board(board: Board) -> Self { Self { board } }

    pub fn from_fen(fen: &str) -> Result<Self, InferenceError> {
        Board::from_fen(fen.trim(), false)
            .map(|b| Self { board: b })
            .map_err(|e| InferenceError::InconsistentPosition(format!("FEN error: {e:?}")))
    }

    pub fn board(&self) -> &Board { &self.board }

    pub fn side_to_move(&self) -> Color { self.board.side_to_move() }

    pub fn fen(&self) -> String { format!("{}", self.board) }

    pub fn is_startpos(&self) -> bool { self.fen() == format!("{}", Board::default()) }

    pub fn status(&self) -> GameStatus { self.board.status() }

    /// Occupancy and colours the camera should currently observe.
    pub fn expected_frame(&self, timestamp: Duration) -> OccupancyFrame { OccupancyFrame::from_board(&self.board, timestamp) }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.board.generate_moves(|ml| { moves.extend(ml); false });
        moves
    }

    pub fn is_legal(&self, mv: Move) -> bool { self.board.is_legal(mv) }

    /// Caller has checked legality.
    pub(crate) fn play(&mut self, mv: Move) { self.board.play_unchecked(mv); }

    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        Some((self.board.piece_on(sq)?, self.board.color_on(sq)?))
    }
}

impl PartialEq for GamePosition {
    fn eq(&self, other: &Self) -> bool { self.fen() == other.fen() }
}

impl Eq for GamePosition {}

impl fmt::Display for GamePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.board) }
}

/// cozy-chess encodes castling as the king capturing its own rook.
pub fn is_castle(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King) && board.color_on(mv.to) == board.color_on(mv.from)
}

/// (king destination, rook origin, rook destination) for a castling move.
pub fn castle_squares(mv: Move) -> (Square, Square, Square) {
    let rank = mv.from.rank();
    if (mv.to.file() as u8) > (mv.from.file() as u8) {
        (Square::new(File::G, rank), mv.to, Square::new(File::F, rank))
    } else {
        (Square::new(File::C, rank), mv.to, Square::new(File::D, rank))
    }
}

pub fn is_en_passant(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::Pawn) && mv.from.file() != mv.to.file() && board.piece_on(mv.to).is_none()
}
