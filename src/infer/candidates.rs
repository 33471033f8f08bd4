use crate::board::cozy::{castle_squares, is_castle, is_en_passant};
use crate::board::san::piece_letter;
use crate::board::GamePosition;
use crate::detect::{SquareChange, SquareDiff};
use crate::error::InferenceError;
use crate::frame::SquareState;
use cozy_chess::{Board, Color, File, Move, Piece, Square};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastleSide {
    Short,
    Long,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Simple,
    Capture { captured: Piece },
    Castle { side: CastleSide, rook_from: Square, rook_to: Square },
    EnPassant { captured_on: Square },
}

/// Promotion piece. Occupancy cannot tell a queen from a knight, so the
/// choice starts out `Pending` and is supplied from outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Promotion {
    Pending,
    Piece(Piece),
}

/// A legal move in the current position, described by its board geometry.
/// For castling `to` is the king's destination (g1/c1), not the rook square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MoveCandidate {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub color: Color,
    pub kind: MoveKind,
    pub promotion: Option<Promotion>,
}

impl MoveCandidate {
    pub(crate) fn from_move(board: &Board, mv: Move) -> Option<Self> {
        let piece = board.piece_on(mv.from)?;
        let color = board.color_on(mv.from)?;
        let (to, kind) = if is_castle(board, mv) {
            let (king_to, rook_from, rook_to) = castle_squares(mv);
            let side = if king_to.file() == File::G { CastleSide::Short } else { CastleSide::Long };
            (king_to, MoveKind::Castle { side, rook_from, rook_to })
        } else if is_en_passant(board, mv) {
            (mv.to, MoveKind::EnPassant { captured_on: Square::new(mv.to.file(), mv.from.rank()) })
        } else if let Some(captured) = board.piece_on(mv.to) {
            (mv.to, MoveKind::Capture { captured })
        } else {
            (mv.to, MoveKind::Simple)
        };
        let promotion = mv.promotion.map(|_| Promotion::Pending);
        Some(Self { from: mv.from, to, piece, color, kind, promotion })
    }

    pub fn captured(&self) -> Option<Piece> {
        match self.kind {
            MoveKind::Capture { captured } => Some(captured),
            MoveKind::EnPassant { .. } => Some(Piece::Pawn),
            _ => None,
        }
    }

    pub fn is_promotion(&self) -> bool { self.promotion.is_some() }

    pub fn promotion_pending(&self) -> bool { self.promotion == Some(Promotion::Pending) }

    pub fn with_promotion(mut self, piece: Piece) -> Self {
        if self.is_promotion() { self.promotion = Some(Promotion::Piece(piece)); }
        self
    }

    /// The oracle's move, or `None` while the promotion piece is pending.
    pub fn to_move(&self) -> Option<Move> {
        let to = match self.kind {
            MoveKind::Castle { rook_from, .. } => rook_from,
            _ => self.to,
        };
        let promotion = match self.promotion {
            None => None,
            Some(Promotion::Pending) => return None,
            Some(Promotion::Piece(p)) => Some(p),
        };
        Some(Move { from: self.from, to, promotion })
    }

    /// Square transitions the camera should see if this move is played.
    pub fn transitions(&self) -> Vec<SquareChange> {
        let own = SquareState::occupied_by(self.color);
        let theirs = SquareState::occupied_by(!self.color);
        let vacate = |sq| SquareChange { square: sq, from: own, to: SquareState::Empty };
        let fill = |sq| SquareChange { square: sq, from: SquareState::Empty, to: own };
        match self.kind {
            MoveKind::Simple => vec![vacate(self.from), fill(self.to)],
            MoveKind::Capture { .. } => vec![vacate(self.from), SquareChange { square: self.to, from: theirs, to: own }],
            MoveKind::Castle { rook_from, rook_to, .. } => {
                vec![vacate(self.from), vacate(rook_from), fill(self.to), fill(rook_to)]
            }
            MoveKind::EnPassant { captured_on } => vec![
                vacate(self.from),
                fill(self.to),
                SquareChange { square: captured_on, from: theirs, to: SquareState::Empty },
            ],
        }
    }

    /// UCI-like text with the king's destination for castling.
    pub fn uci(&self) -> String { self.to_string() }
}

impl fmt::Display for MoveCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        match self.promotion {
            Some(Promotion::Piece(p)) => {
                let c = piece_letter(p).map_or('q', |c| c.to_ascii_lowercase());
                write!(f, "{c}")
            }
            Some(Promotion::Pending) => write!(f, "=?"),
            None => Ok(()),
        }
    }
}

/// Does `cand` produce exactly the observed transitions?
///
/// Every observed change must be predicted with consistent states. Predicted
/// changes may be missing from the diff only when they are invisible: a
/// capture's destination stays occupied, so without colour labels on both
/// frames its colour flip cannot be seen.
fn explains(cand: &MoveCandidate, diff: &SquareDiff) -> bool {
    let predicted = cand.transitions();
    for change in diff.changes() {
        match predicted.iter().find(|t| t.square == change.square) {
            Some(t) if change.from.consistent_with(t.from) && change.to.consistent_with(t.to) => {}
            _ => return false,
        }
    }
    predicted
        .iter()
        .all(|t| diff.get(t.square).is_some() || (!diff.color_aware() && t.recolored()))
}

/// A capture whose destination never showed up in `diff`: the only visible
/// trace is the vacated origin, which a lifted piece leaves too.
pub fn capture_unseen_on_target(cand: &MoveCandidate, diff: &SquareDiff) -> bool {
    matches!(cand.kind, MoveKind::Capture { .. }) && diff.get(cand.to).is_none()
}

/// Every legal move in `position` whose geometry matches `diff`, ordered by
/// from-square then to-square. Promotions are folded into one candidate per
/// from/to pair. An empty diff has nothing to explain and yields no candidates.
pub fn candidates(diff: &SquareDiff, position: &GamePosition) -> Result<Vec<MoveCandidate>, InferenceError> {
    if diff.is_empty() { return Ok(Vec::new()); }
    let board = position.board();
    let mut found: Vec<MoveCandidate> = Vec::new();
    for mv in position.legal_moves() {
        let Some(cand) = MoveCandidate::from_move(board, mv) else { continue };
        if found.contains(&cand) { continue; }
        if explains(&cand, diff) { found.push(cand); }
    }
    if found.is_empty() {
        return Err(InferenceError::NoLegalCandidate { squares: diff.squares() });
    }
    found.sort_by_key(|c| (c.from as usize, c.to as usize));
    log::debug!("{} candidate(s) for diff on {:?}: {:?}", found.len(), diff.squares(), found.iter().map(|c| c.uci()).collect::<Vec<_>>());
    Ok(found)
}

/// Legal moves `diff` could be the visible first part of: every observed
/// change belongs to the move (a square may also read empty while its piece
/// is in the hand), yet the move is not complete.
pub fn partial_matches(diff: &SquareDiff, position: &GamePosition) -> Vec<MoveCandidate> {
    if diff.is_empty() { return Vec::new(); }
    let board = position.board();
    let mut found: Vec<MoveCandidate> = Vec::new();
    for mv in position.legal_moves() {
        let Some(cand) = MoveCandidate::from_move(board, mv) else { continue };
        if found.contains(&cand) || explains(&cand, diff) { continue; }
        let predicted = cand.transitions();
        let within = diff.changes().iter().all(|change| {
            predicted.iter().any(|t| {
                t.square == change.square
                    && change.from.consistent_with(t.from)
                    && (change.to.consistent_with(t.to) || change.to == SquareState::Empty)
            })
        });
        if within { found.push(cand); }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::diff;
    use crate::frame::OccupancyFrame;
    use std::time::Duration;

    fn frames_for(fen: &str, edits: &[(Square, SquareState)]) -> (GamePosition, SquareDiff) {
        let pos = GamePosition::from_fen(fen).expect("valid fen");
        let before = pos.expected_frame(Duration::ZERO);
        let mut after = before.clone();
        for &(sq, st) in edits { after.set(sq, st); }
        let d = diff(&before, &after).expect("complete frames");
        (pos, d)
    }

    const W: SquareState = SquareState::Occupied(crate::frame::ColorLabel::White);
    const E: SquareState = SquareState::Empty;

    #[test]
    fn en_passant_needs_three_squares() {
        let fen = "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2";
        let (pos, d) = frames_for(fen, &[(Square::E5, E), (Square::D6, W), (Square::D5, E)]);
        let c = candidates(&d, &pos).expect("en passant matches");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].kind, MoveKind::EnPassant { captured_on: Square::D5 });
        assert_eq!(c[0].captured(), Some(Piece::Pawn));

        // Without the captured pawn disappearing it is just an impossible diagonal step.
        let (pos, d) = frames_for(fen, &[(Square::E5, E), (Square::D6, W)]);
        assert!(matches!(candidates(&d, &pos), Err(InferenceError::NoLegalCandidate { .. })));
    }

    #[test]
    fn promotion_is_one_pending_candidate() {
        let (pos, d) = frames_for("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1", &[(Square::B7, E), (Square::B8, W)]);
        let c = candidates(&d, &pos).expect("promotion matches");
        assert_eq!(c.len(), 1);
        assert!(c[0].promotion_pending());
        assert_eq!(c[0].to_move(), None);
        let queen = c[0].with_promotion(Piece::Queen);
        assert_eq!(queen.to_move().map(|m| m.to_string()), Some("b7b8q".to_string()));
        assert_eq!(queen.uci(), "b7b8q");
    }

    #[test]
    fn colour_aware_capture_needs_the_recolour() {
        let fen = "4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1";
        let (pos, d) = frames_for(fen, &[(Square::E4, E), (Square::D5, W)]);
        let c = candidates(&d, &pos).expect("capture matches");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].kind, MoveKind::Capture { captured: Piece::Pawn });

        // Labelled frames where the destination keeps its black label: not a capture.
        let (pos, d) = frames_for(fen, &[(Square::E4, E)]);
        assert!(candidates(&d, &pos).is_err());
    }

    #[test]
    fn wrong_side_moving_matches_nothing() {
        let (pos, d) = frames_for(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            &[(Square::E7, E), (Square::E5, SquareState::occupied_by(Color::Black))],
        );
        let err = candidates(&d, &pos).unwrap_err();
        assert_eq!(err, InferenceError::NoLegalCandidate { squares: vec![Square::E5, Square::E7] });
    }

    #[test]
    fn lifted_piece_is_a_partial_move() {
        let (pos, d) = frames_for("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", &[(Square::G1, E)]);
        assert!(candidates(&d, &pos).is_err());
        let partial = partial_matches(&d, &pos);
        assert_eq!(partial.len(), 2);
        assert!(partial.iter().all(|c| c.from == Square::G1));

        // A black piece vanishing at the start is nobody's move in progress.
        let (pos, d) = frames_for("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", &[(Square::D7, E)]);
        assert!(partial_matches(&d, &pos).is_empty());
    }

    #[test]
    fn blind_capture_is_also_a_lifted_piece() {
        let fen = "4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1";
        let pos = GamePosition::from_fen(fen).expect("valid fen");
        let before = pos.expected_frame(Duration::ZERO).occupancy_only();
        let mut after = before.clone();
        after.set(Square::E4, E);
        let d = diff(&before, &after).expect("complete frames");
        assert!(!d.color_aware());
        let c = candidates(&d, &pos).expect("capture explains the vacated square");
        assert_eq!(c.len(), 1);
        assert!(capture_unseen_on_target(&c[0], &d));
        assert_eq!(partial_matches(&d, &pos).iter().map(|m| m.uci()).collect::<Vec<_>>(), vec!["e4e5"]);

        let (_, labelled) = frames_for(fen, &[(Square::E4, E), (Square::D5, W)]);
        let c = candidates(&labelled, &pos).expect("capture matches");
        assert!(!capture_unseen_on_target(&c[0], &labelled));
    }

    #[test]
    fn empty_diff_has_no_candidates() {
        let pos = GamePosition::startpos();
        let f = OccupancyFrame::from_board(pos.board(), Duration::ZERO);
        let d = diff(&f, &f).expect("complete frames");
        assert_eq!(candidates(&d, &pos), Ok(Vec::new()));
    }
}
