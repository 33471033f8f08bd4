// Per-frame pipeline: detect, generate, resolve, apply, score.
// The watcher is single-writer: callers serialize every call into it.

use crate::config::{PromotionPolicy, WatchConfig};
use crate::confidence::{ConfidenceTracker, DesyncReason, Observation, SyncState};
use crate::correction::CorrectionRequest;
use crate::detect;
use crate::error::InferenceError;
use crate::events::{CoreEvent, DesyncAlert, MoveApplied, PromotionRequest, RecoveryAction};
use crate::export::{self, PgnHeaders};
use crate::frame::OccupancyFrame;
use crate::game::Game;
use crate::infer::{self, Resolution, Resolver};
use cozy_chess::{Piece, Square};
use log::{debug, info};
use std::time::Duration;

#[derive(Clone, Debug)]
struct PendingPromotion {
    resolution: Resolution,
    frame: OccupancyFrame,
}

pub struct BoardWatcher {
    config: WatchConfig,
    game: Game,
    tracker: ConfidenceTracker,
    resolver: Resolver,
    /// Last frame accepted as matching the game; diffs are taken against it.
    last_frame: OccupancyFrame,
    /// Most recent frame received, accepted or not.
    last_input: Option<OccupancyFrame>,
    pending: Option<PendingPromotion>,
}

impl BoardWatcher {
    pub fn new(config: WatchConfig) -> Self { Self::with_game(config, Game::new()) }

    pub fn with_game(config: WatchConfig, game: Game) -> Self {
        let last_frame = game.position().expected_frame(Duration::ZERO);
        Self {
            tracker: ConfidenceTracker::new(config.confidence),
            resolver: Resolver::new(config.piece_values),
            config,
            game,
            last_frame,
            last_input: None,
            pending: None,
        }
    }

    pub fn config(&self) -> &WatchConfig { &self.config }
    pub fn game(&self) -> &Game { &self.game }
    pub fn tracker(&self) -> &ConfidenceTracker { &self.tracker }
    pub fn sync_state(&self) -> SyncState { self.tracker.state() }
    pub fn confidence(&self) -> f32 { self.tracker.score() }
    pub fn last_frame(&self) -> &OccupancyFrame { &self.last_frame }

    pub fn pending_promotion(&self) -> Option<PromotionRequest> {
        self.pending.as_ref().map(|p| PromotionRequest {
            from: p.resolution.chosen.from,
            to: p.resolution.chosen.to,
            candidates: p.resolution.considered,
        })
    }

    /// Feeds one stable frame. Returns nothing when the frame changes nothing.
    pub fn process_frame(&mut self, frame: OccupancyFrame) -> Result<Option<CoreEvent>, InferenceError> {
        frame.ensure_complete()?;
        if let Some(prev) = &self.last_input {
            if frame.timestamp <= prev.timestamp {
                if frame.same_squares(prev) {
                    debug!("duplicate frame at {:?} ignored", frame.timestamp);
                    return Ok(None);
                }
                return Err(InferenceError::StaleFrame { at: frame.timestamp, last: prev.timestamp });
            }
        }
        self.last_input = Some(frame.clone());

        if self.tracker.is_desynced() {
            debug!("frame at {:?} ignored: desynced until undo, correction or reset", frame.timestamp);
            return Ok(None);
        }
        if self.pending.is_some() {
            debug!("frame at {:?} ignored: waiting for a promotion choice", frame.timestamp);
            return Ok(None);
        }

        let diff = detect::diff(&self.last_frame, &frame)?;
        if diff.is_empty() {
            self.tracker.observe_alignment(true, frame.timestamp);
            return Ok(None);
        }
        debug!("frame at {:?}: {} square(s) changed {:?}", frame.timestamp, diff.len(), diff.squares());

        let candidates = match infer::candidates(&diff, self.game.position()) {
            Ok(c) => c,
            Err(InferenceError::NoLegalCandidate { squares }) => {
                if self.config.allow_moves_in_progress && !infer::partial_matches(&diff, self.game.position()).is_empty() {
                    debug!("move in progress on {:?}", squares);
                    let reason = self.tracker.observe_alignment(false, frame.timestamp);
                    return Ok(reason.map(|r| CoreEvent::Desync(self.alert(r, squares, 0))));
                }
                let reason = self.tracker.record_failure();
                return Ok(Some(CoreEvent::Desync(self.alert(reason, squares, 0))));
            }
            Err(e) => return Err(e),
        };
        let Some(mut resolution) = self.resolver.resolve(&candidates, &self.game) else {
            let reason = self.tracker.record_failure();
            return Ok(Some(CoreEvent::Desync(self.alert(reason, diff.squares(), 0))));
        };
        if infer::capture_unseen_on_target(&resolution.chosen, &diff) {
            // Without labels the capture looks like a piece still in the hand.
            let in_progress = infer::partial_matches(&diff, self.game.position()).len();
            if in_progress > 0 {
                debug!("{} also reads as a move in progress ({} way(s))", resolution.chosen, in_progress);
                resolution.considered += in_progress;
            }
        }

        if resolution.chosen.promotion_pending() {
            match self.config.promotion {
                PromotionPolicy::AutoQueen => {
                    resolution.chosen = resolution.chosen.with_promotion(Piece::Queen);
                    return self.commit(resolution, frame, true).map(Some);
                }
                PromotionPolicy::Ask => {
                    info!("promotion {} waits for a piece choice", resolution.chosen);
                    self.pending = Some(PendingPromotion { resolution, frame });
                    return Ok(self.pending_promotion().map(CoreEvent::PromotionRequired));
                }
            }
        }
        self.commit(resolution, frame, false).map(Some)
    }

    /// Supplies the piece for a waiting promotion.
    pub fn promote(&mut self, piece: Piece) -> Result<CoreEvent, InferenceError> {
        let pending = self.pending.take().ok_or(InferenceError::NoPendingPromotion)?;
        let mut resolution = pending.resolution.clone();
        resolution.chosen = resolution.chosen.with_promotion(piece);
        match self.commit(resolution, pending.frame.clone(), false) {
            Ok(event) => Ok(event),
            Err(e) => {
                self.pending = Some(pending);
                Err(e)
            }
        }
    }

    fn commit(&mut self, resolution: Resolution, frame: OccupancyFrame, auto_promoted: bool) -> Result<CoreEvent, InferenceError> {
        let chosen = resolution.chosen;
        self.game.apply(&chosen)?;
        let obs = Observation {
            ambiguous: resolution.is_ambiguous(),
            color_confidence: frame.color_confidence,
            settle_latency: frame.settle_latency,
        };
        let at = frame.timestamp;
        self.last_frame = frame;
        self.tracker.observe_alignment(true, at);
        if let Some(reason) = self.tracker.record_resolution(obs) {
            return Ok(CoreEvent::Desync(self.alert(reason, vec![chosen.from, chosen.to], resolution.considered)));
        }
        let played = self.game.last_move();
        Ok(CoreEvent::MoveApplied(MoveApplied {
            san: played.map(|p| p.san.clone()).unwrap_or_default(),
            uci: chosen.uci(),
            ply: self.game.ply(),
            confidence: self.tracker.score(),
            sync: self.tracker.state(),
            candidates: resolution.considered,
            decided_by: resolution.decided_by,
            auto_promoted,
            fen: self.game.position().fen(),
        }))
    }

    fn alert(&self, reason: DesyncReason, squares: Vec<Square>, candidate_count: usize) -> DesyncAlert {
        let mut recommended = Vec::with_capacity(3);
        if self.game.ply() > 0 { recommended.push(RecoveryAction::UndoLast); }
        recommended.push(RecoveryAction::ManualCorrection);
        recommended.push(RecoveryAction::Reset);
        DesyncAlert {
            reason,
            squares,
            confidence: self.tracker.score(),
            candidate_count,
            last_move: self.game.last_move().map(|p| p.san.clone()),
            recommended,
        }
    }

    /// Diffs restart from what the restored position should look like.
    fn reseed(&mut self) {
        self.pending = None;
        let at = self.last_input.as_ref().map_or(Duration::ZERO, |f| f.timestamp);
        self.last_frame = self.game.position().expected_frame(at);
    }

    /// Drops the last applied move, or the promotion still waiting for its
    /// piece. Lifts a desync only as far as `Suspect`.
    pub fn undo(&mut self) -> Result<CoreEvent, InferenceError> {
        if let Some(pending) = self.pending.take() {
            info!("waiting promotion {} discarded", pending.resolution.chosen);
            self.reseed();
            return Ok(CoreEvent::MoveUndone { san: pending.resolution.chosen.uci(), fen: self.game.position().fen() });
        }
        let san = self.game.last_move().map(|p| p.san.clone()).ok_or(InferenceError::NoHistory)?;
        self.game.undo()?;
        self.reseed();
        self.tracker.after_undo();
        Ok(CoreEvent::MoveUndone { san, fen: self.game.position().fen() })
    }

    /// Commits or cancels a manual correction. A committed batch is applied
    /// atomically and resynchronizes the tracker; an empty one is a cancel.
    pub fn correct(&mut self, request: CorrectionRequest) -> Result<Option<CoreEvent>, InferenceError> {
        match request {
            CorrectionRequest::Cancel => {
                info!("correction cancelled");
                Ok(None)
            }
            CorrectionRequest::Commit(batch) if batch.is_empty() => {
                info!("empty correction treated as cancelled");
                Ok(None)
            }
            CorrectionRequest::Commit(batch) => {
                self.game.correct(&batch)?;
                Ok(Some(self.resynced()))
            }
        }
    }

    pub fn correct_fen(&mut self, fen: &str) -> Result<CoreEvent, InferenceError> {
        self.game.correct_fen(fen)?;
        Ok(self.resynced())
    }

    fn resynced(&mut self) -> CoreEvent {
        self.reseed();
        self.tracker.reset();
        CoreEvent::PositionCorrected { fen: self.game.position().fen() }
    }

    pub fn reset(&mut self) -> CoreEvent {
        self.game.reset();
        self.reseed();
        self.tracker.reset();
        CoreEvent::GameReset
    }

    pub fn export_pgn(&self, headers: &PgnHeaders) -> String { export::pgn(&self.game, headers) }
}

impl Default for BoardWatcher {
    fn default() -> Self { Self::new(WatchConfig::default()) }
}
