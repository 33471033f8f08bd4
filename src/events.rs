// Values handed back to the boundary after each call into the core.

use crate::confidence::{DesyncReason, SyncState};
use crate::error::SquareList;
use crate::infer::TieBreak;
use cozy_chess::Square;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryAction {
    UndoLast,
    ManualCorrection,
    Reset,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveApplied {
    pub san: String,
    pub uci: String,
    /// 1-based half-move number.
    pub ply: usize,
    pub confidence: f32,
    pub sync: SyncState,
    /// How many legal moves fit the observed change.
    pub candidates: usize,
    pub decided_by: TieBreak,
    /// The promotion piece was assumed (queen) rather than chosen.
    pub auto_promoted: bool,
    pub fen: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PromotionRequest {
    pub from: Square,
    pub to: Square,
    pub candidates: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DesyncAlert {
    pub reason: DesyncReason,
    pub squares: Vec<Square>,
    pub confidence: f32,
    pub candidate_count: usize,
    /// SAN of the move in the record when the alert fired.
    pub last_move: Option<String>,
    pub recommended: Vec<RecoveryAction>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CoreEvent {
    MoveApplied(MoveApplied),
    PromotionRequired(PromotionRequest),
    Desync(DesyncAlert),
    PositionCorrected { fen: String },
    MoveUndone { san: String, fen: String },
    GameReset,
}

impl fmt::Display for CoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreEvent::MoveApplied(m) => {
                write!(f, "{}. {} ({}) confidence {:.2} {:?}", m.ply, m.san, m.uci, m.confidence, m.sync)?;
                if m.candidates > 1 { write!(f, " [{} candidates, {:?}]", m.candidates, m.decided_by)?; }
                if m.auto_promoted { write!(f, " [auto-queen]")?; }
                Ok(())
            }
            CoreEvent::PromotionRequired(p) => write!(f, "promotion {}{} needs a piece choice", p.from, p.to),
            CoreEvent::Desync(a) => {
                write!(f, "DESYNC {:?} on [{}] confidence {:.2}", a.reason, SquareList(&a.squares), a.confidence)?;
                if let Some(san) = &a.last_move { write!(f, " after {san}")?; }
                write!(f, "; try {:?}", a.recommended)
            }
            CoreEvent::PositionCorrected { fen } => write!(f, "position corrected: {fen}"),
            CoreEvent::MoveUndone { san, fen } => write!(f, "undid {san}: {fen}"),
            CoreEvent::GameReset => write!(f, "new game"),
        }
    }
}
