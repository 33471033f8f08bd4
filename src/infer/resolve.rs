use super::candidates::MoveCandidate;
use cozy_chess::{Piece, Square};
use serde::{Deserialize, Serialize};

/// Material values used to rank captures. A king is never captured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceValues {
    pub pawn: u32,
    pub knight: u32,
    pub bishop: u32,
    pub rook: u32,
    pub queen: u32,
}

impl Default for PieceValues {
    fn default() -> Self { Self { pawn: 1, knight: 3, bishop: 3, rook: 5, queen: 9 } }
}

impl PieceValues {
    pub fn value(&self, piece: Option<Piece>) -> u32 {
        match piece {
            Some(Piece::Pawn) => self.pawn,
            Some(Piece::Knight) => self.knight,
            Some(Piece::Bishop) => self.bishop,
            Some(Piece::Rook) => self.rook,
            Some(Piece::Queen) => self.queen,
            Some(Piece::King) | None => 0,
        }
    }
}

/// When the piece now standing on a square last moved, as a ply index.
/// `None` means it has not moved since the position was set up.
pub trait MoveRecency {
    fn last_moved(&self, square: Square) -> Option<usize>;
}

/// No move history at all: every piece counts as never moved.
pub struct NoRecency;

impl MoveRecency for NoRecency {
    fn last_moved(&self, _square: Square) -> Option<usize> { None }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TieBreak {
    Unique,
    Material,
    Recency,
    SquareOrder,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub chosen: MoveCandidate,
    pub considered: usize,
    pub decided_by: TieBreak,
}

impl Resolution {
    pub fn is_ambiguous(&self) -> bool { self.considered > 1 }
}

#[derive(Clone, Debug, Default)]
pub struct Resolver {
    values: PieceValues,
}

impl Resolver {
    pub fn new(values: PieceValues) -> Self { Self { values } }

    pub fn values(&self) -> &PieceValues { &self.values }

    /// Deterministic pick: highest captured value, then the piece that has
    /// stood still longest, then the smallest from-square (to-square after).
    pub fn resolve(&self, candidates: &[MoveCandidate], recency: &dyn MoveRecency) -> Option<Resolution> {
        let considered = candidates.len();
        match candidates {
            [] => return None,
            [only] => return Some(Resolution { chosen: *only, considered, decided_by: TieBreak::Unique }),
            _ => {}
        }

        let best_value = candidates.iter().map(|c| self.values.value(c.captured())).max().unwrap_or(0);
        let mut pool: Vec<MoveCandidate> =
            candidates.iter().copied().filter(|c| self.values.value(c.captured()) == best_value).collect();
        let mut decided_by = TieBreak::Material;

        if pool.len() > 1 {
            // Never moved sorts before any ply.
            let stillness = |c: &MoveCandidate| recency.last_moved(c.from).map_or(0, |ply| ply + 1);
            let oldest = pool.iter().map(|c| stillness(c)).min().unwrap_or(0);
            pool.retain(|c| stillness(c) == oldest);
            decided_by = TieBreak::Recency;
        }
        if pool.len() > 1 {
            pool.sort_by_key(|c| (c.from as usize, c.to as usize));
            decided_by = TieBreak::SquareOrder;
        }

        let chosen = *pool.first()?;
        log::warn!(
            "ambiguous change: {} legal moves fit ({}), chose {} by {:?}",
            considered,
            candidates.iter().map(|c| c.uci()).collect::<Vec<_>>().join(" "),
            chosen,
            decided_by
        );
        Some(Resolution { chosen, considered, decided_by })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::candidates::MoveKind;
    use cozy_chess::Color;
    use std::collections::HashMap;

    fn knight(from: Square, to: Square, kind: MoveKind) -> MoveCandidate {
        MoveCandidate { from, to, piece: Piece::Knight, color: Color::White, kind, promotion: None }
    }

    struct Plies(HashMap<Square, usize>);

    impl MoveRecency for Plies {
        fn last_moved(&self, square: Square) -> Option<usize> { self.0.get(&square).copied() }
    }

    #[test]
    fn single_candidate_is_unique() {
        let c = knight(Square::G1, Square::F3, MoveKind::Simple);
        let r = Resolver::default().resolve(&[c], &NoRecency).expect("one candidate");
        assert_eq!(r.decided_by, TieBreak::Unique);
        assert!(!r.is_ambiguous());
        assert!(Resolver::default().resolve(&[], &NoRecency).is_none());
    }

    #[test]
    fn highest_capture_wins() {
        let bishop = knight(Square::D4, Square::E6, MoveKind::Capture { captured: Piece::Bishop });
        let rook = knight(Square::D4, Square::C6, MoveKind::Capture { captured: Piece::Rook });
        let r = Resolver::default().resolve(&[bishop, rook], &NoRecency).expect("two candidates");
        assert_eq!(r.chosen, rook);
        assert_eq!(r.decided_by, TieBreak::Material);
        assert!(r.is_ambiguous());
    }

    #[test]
    fn stationary_piece_then_square_order() {
        let from_b5 = knight(Square::B5, Square::D4, MoveKind::Simple);
        let from_f3 = knight(Square::F3, Square::D4, MoveKind::Simple);
        let moved = Plies(HashMap::from([(Square::B5, 1), (Square::F3, 4)]));
        let r = Resolver::default().resolve(&[from_f3, from_b5], &moved).expect("two candidates");
        assert_eq!(r.chosen, from_b5);
        assert_eq!(r.decided_by, TieBreak::Recency);

        let r1 = Resolver::default().resolve(&[from_f3, from_b5], &NoRecency).expect("two candidates");
        let r2 = Resolver::default().resolve(&[from_b5, from_f3], &NoRecency).expect("two candidates");
        assert_eq!(r1.chosen, from_f3);
        assert_eq!(r1, r2);
        assert_eq!(r1.decided_by, TieBreak::SquareOrder);
    }

    #[test]
    fn custom_values_change_the_pick() {
        let values = PieceValues { bishop: 6, ..PieceValues::default() };
        let bishop = knight(Square::D4, Square::E6, MoveKind::Capture { captured: Piece::Bishop });
        let rook = knight(Square::D4, Square::C6, MoveKind::Capture { captured: Piece::Rook });
        let r = Resolver::new(values).resolve(&[rook, bishop], &NoRecency).expect("two candidates");
        assert_eq!(r.chosen, bishop);
    }
}
