// Game state manager: the only owner of the authoritative position.

use crate::board::san::format_san;
use crate::board::GamePosition;
use crate::correction::{apply_batch, CorrectionBatch, Occupant};
use crate::error::InferenceError;
use crate::infer::{MoveCandidate, MoveKind, MoveRecency};
use cozy_chess::{Move, Square};
use log::info;

/// A move accepted into the game record.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayedMove {
    pub candidate: MoveCandidate,
    pub mv: Move,
    pub san: String,
    /// 0-based half-move index since the game's starting position.
    pub ply: usize,
}

#[derive(Clone, Debug)]
struct UndoEntry {
    played: PlayedMove,
    prior: GamePosition,
    prior_recency: [Option<usize>; Square::NUM],
}

#[derive(Clone, Debug)]
pub struct Game {
    initial: GamePosition,
    position: GamePosition,
    history: Vec<UndoEntry>,
    recency: [Option<usize>; Square::NUM],
}

impl Default for Game {
    fn default() -> Self { Self::from_position(GamePosition::startpos()) }
}

impl Game {
    pub fn new() -> Self { Self::default() }

    pub fn from_position(position: GamePosition) -> Self {
        Self { initial: position.clone(), position, history: Vec::new(), recency: [None; Square::NUM] }
    }

    pub fn position(&self) -> &GamePosition { &self.position }

    /// Where the current move record starts (standard start, or the last correction).
    pub fn initial(&self) -> &GamePosition { &self.initial }

    pub fn history(&self) -> impl Iterator<Item = &PlayedMove> + '_ { self.history.iter().map(|e| &e.played) }

    pub fn last_move(&self) -> Option<&PlayedMove> { self.history.last().map(|e| &e.played) }

    pub fn ply(&self) -> usize { self.history.len() }

    pub fn san_moves(&self) -> Vec<String> { self.history().map(|p| p.san.clone()).collect() }

    /// Plays a fully resolved candidate. Fails closed: on error nothing changes.
    pub fn apply(&mut self, candidate: &MoveCandidate) -> Result<&GamePosition, InferenceError> {
        let mv = candidate.to_move().ok_or(InferenceError::PromotionPending { square: candidate.to })?;
        let fits = MoveCandidate::from_move(self.position.board(), mv)
            .map_or(false, |c| c.kind == candidate.kind && c.piece == candidate.piece && c.to == candidate.to);
        if !self.position.is_legal(mv) || !fits {
            return Err(InferenceError::IllegalMove {
                uci: candidate.uci(),
                reason: format!("not a legal move in {}", self.position.fen()),
            });
        }
        let ply = self.history.len();
        let played = PlayedMove { candidate: *candidate, mv, san: format_san(self.position.board(), mv), ply };
        let entry = UndoEntry { played, prior: self.position.clone(), prior_recency: self.recency };

        self.position.play(mv);
        self.recency[candidate.from as usize] = None;
        match candidate.kind {
            MoveKind::Castle { rook_from, rook_to, .. } => {
                self.recency[rook_from as usize] = None;
                self.recency[rook_to as usize] = Some(ply);
            }
            MoveKind::EnPassant { captured_on } => self.recency[captured_on as usize] = None,
            _ => {}
        }
        self.recency[candidate.to as usize] = Some(ply);

        info!("ply {}: {} ({})", ply + 1, entry.played.san, self.position.fen());
        self.history.push(entry);
        Ok(&self.position)
    }

    /// Reverts exactly one applied move.
    pub fn undo(&mut self) -> Result<&GamePosition, InferenceError> {
        let entry = self.history.pop().ok_or(InferenceError::NoHistory)?;
        self.position = entry.prior;
        self.recency = entry.prior_recency;
        info!("undid {} ({})", entry.played.san, self.position.fen());
        Ok(&self.position)
    }

    /// Applies a whole correction batch or rejects it; the corrected position
    /// starts a fresh move record.
    pub fn correct(&mut self, batch: &CorrectionBatch) -> Result<&GamePosition, InferenceError> {
        let board = apply_batch(self.position.board(), batch).map_err(|e| {
            log::warn!("correction rejected: {e}");
            e
        })?;
        self.replace(GamePosition::from_board(board));
        info!("corrected {} square(s): {}", batch.edits().len(), self.position.fen());
        Ok(&self.position)
    }

    /// Single-square correction, validated like a one-edit batch.
    pub fn correct_square(&mut self, square: Square, occupant: Occupant) -> Result<&GamePosition, InferenceError> {
        let mut batch = CorrectionBatch::new();
        batch.set(square, occupant);
        self.correct(&batch)
    }

    /// Wholesale correction from a FEN string.
    pub fn correct_fen(&mut self, fen: &str) -> Result<&GamePosition, InferenceError> {
        let position = GamePosition::from_fen(fen)?;
        self.replace(position);
        info!("position set from FEN: {}", self.position.fen());
        Ok(&self.position)
    }

    pub fn reset(&mut self) {
        self.replace(GamePosition::startpos());
        info!("game reset");
    }

    fn replace(&mut self, position: GamePosition) {
        self.initial = position.clone();
        self.position = position;
        self.history.clear();
        self.recency = [None; Square::NUM];
    }
}

impl MoveRecency for Game {
    fn last_moved(&self, square: Square) -> Option<usize> { self.recency[square as usize] }
}
