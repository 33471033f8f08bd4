// Change detector: reduces two consecutive frames to the squares that changed.

use crate::error::InferenceError;
use crate::frame::{OccupancyFrame, SquareState};
use cozy_chess::Square;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SquareChange {
    pub square: Square,
    pub from: SquareState,
    pub to: SquareState,
}

impl SquareChange {
    pub fn vacated(&self) -> bool { self.from.is_occupied() && !self.to.is_occupied() }
    pub fn filled(&self) -> bool { !self.from.is_occupied() && self.to.is_occupied() }
    /// Occupied before and after, colour flipped (a visible capture).
    pub fn recolored(&self) -> bool { self.from.is_occupied() && self.to.is_occupied() }
}

/// Sparse set of genuine transitions, ordered a1..h8.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SquareDiff {
    changes: Vec<SquareChange>,
    color_aware: bool,
}

impl SquareDiff {
    pub fn changes(&self) -> &[SquareChange] { &self.changes }
    pub fn is_empty(&self) -> bool { self.changes.is_empty() }
    pub fn len(&self) -> usize { self.changes.len() }
    pub fn squares(&self) -> Vec<Square> { self.changes.iter().map(|c| c.square).collect() }
    pub fn get(&self, sq: Square) -> Option<&SquareChange> { self.changes.iter().find(|c| c.square == sq) }

    /// Both frames labelled every occupied square, so a capture must show up
    /// as a colour flip on the destination.
    pub fn color_aware(&self) -> bool { self.color_aware }
}

/// Pure, combinatorial diff. Debouncing is the frame producer's job.
pub fn diff(previous: &OccupancyFrame, current: &OccupancyFrame) -> Result<SquareDiff, InferenceError> {
    previous.ensure_complete()?;
    current.ensure_complete()?;
    let mut changes = Vec::new();
    for sq in Square::ALL {
        if let (Some(from), Some(to)) = (previous.get(sq), current.get(sq)) {
            if from.differs_from(to) {
                changes.push(SquareChange { square: sq, from, to });
            }
        }
    }
    Ok(SquareDiff { changes, color_aware: previous.fully_labeled() && current.fully_labeled() })
}
