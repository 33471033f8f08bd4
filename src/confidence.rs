// Confidence & desync tracker. Every scoring rule lives here.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceParams {
    /// Score after a new game or a manual correction.
    pub baseline: f32,
    pub reward: f32,
    pub ambiguity_penalty: f32,
    pub low_color_penalty: f32,
    pub slow_penalty: f32,
    /// Below this score the tracker desyncs.
    pub hard_floor: f32,
    /// Colour confidence below this counts as a low-confidence input.
    pub color_floor: f32,
    pub latency_budget_ms: u64,
    /// How long observed and expected occupancy may disagree on stable frames.
    pub mismatch_window_ms: u64,
    /// Clean resolutions needed to go from suspect back to synced.
    pub recovery_streak: usize,
    pub history_len: usize,
    /// Score restored when an undo lifts a desync.
    pub undo_resume_score: f32,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            baseline: 1.0,
            reward: 0.1,
            ambiguity_penalty: 0.2,
            low_color_penalty: 0.1,
            slow_penalty: 0.1,
            hard_floor: 0.5,
            color_floor: 0.6,
            latency_budget_ms: 2_000,
            mismatch_window_ms: 5_000,
            recovery_streak: 2,
            history_len: 8,
            undo_resume_score: 0.7,
        }
    }
}

impl ConfidenceParams {
    pub fn latency_budget(&self) -> Duration { Duration::from_millis(self.latency_budget_ms) }
    pub fn mismatch_window(&self) -> Duration { Duration::from_millis(self.mismatch_window_ms) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SyncState {
    Synced,
    Suspect,
    Desynced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Success,
    Ambiguous,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DesyncReason {
    NoLegalCandidate,
    ConfidenceFloor,
    PersistentMismatch,
}

/// What the core learned about one resolved diff.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Observation {
    pub ambiguous: bool,
    pub color_confidence: Option<f32>,
    pub settle_latency: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct ConfidenceTracker {
    params: ConfidenceParams,
    score: f32,
    state: SyncState,
    clean_streak: usize,
    history: VecDeque<Outcome>,
    mismatch_since: Option<Duration>,
}

impl ConfidenceTracker {
    pub fn new(params: ConfidenceParams) -> Self {
        Self {
            score: params.baseline.clamp(0.0, 1.0),
            params,
            state: SyncState::Synced,
            clean_streak: 0,
            history: VecDeque::with_capacity(params.history_len),
            mismatch_since: None,
        }
    }

    pub fn params(&self) -> &ConfidenceParams { &self.params }
    pub fn score(&self) -> f32 { self.score }
    pub fn state(&self) -> SyncState { self.state }
    pub fn is_desynced(&self) -> bool { self.state == SyncState::Desynced }
    pub fn history(&self) -> impl Iterator<Item = Outcome> + '_ { self.history.iter().copied() }

    fn push_outcome(&mut self, outcome: Outcome) {
        if self.params.history_len == 0 { return; }
        while self.history.len() >= self.params.history_len { self.history.pop_front(); }
        self.history.push_back(outcome);
    }

    fn desync(&mut self, reason: DesyncReason) -> DesyncReason {
        if self.state != SyncState::Desynced {
            log::warn!("tracker desynced ({:?}) at confidence {:.2}", reason, self.score);
        }
        self.state = SyncState::Desynced;
        self.clean_streak = 0;
        reason
    }

    /// Scores one applied move. Returns the reason if this pushed the tracker into `Desynced`.
    pub fn record_resolution(&mut self, obs: Observation) -> Option<DesyncReason> {
        if self.is_desynced() { return None; }
        let low_color = obs.color_confidence.map_or(false, |c| c < self.params.color_floor);
        let slow = obs.settle_latency.map_or(false, |l| l > self.params.latency_budget());

        let mut delta = if obs.ambiguous { -self.params.ambiguity_penalty } else { self.params.reward };
        if low_color { delta -= self.params.low_color_penalty; }
        if slow { delta -= self.params.slow_penalty; }
        self.score = quantize((self.score + delta).clamp(0.0, 1.0));
        self.push_outcome(if obs.ambiguous { Outcome::Ambiguous } else { Outcome::Success });

        if self.score < self.params.hard_floor {
            return Some(self.desync(DesyncReason::ConfidenceFloor));
        }
        if obs.ambiguous || low_color {
            if self.state == SyncState::Synced {
                log::info!("tracker suspect (ambiguous={}, low_color={}) at confidence {:.2}", obs.ambiguous, low_color, self.score);
            }
            self.state = SyncState::Suspect;
            self.clean_streak = 0;
        } else if !slow {
            self.clean_streak += 1;
            if self.state == SyncState::Suspect && self.clean_streak >= self.params.recovery_streak {
                log::info!("tracker synced again after {} clean moves", self.clean_streak);
                self.state = SyncState::Synced;
            }
        }
        None
    }

    /// A diff no legal move explains. Always desyncs.
    pub fn record_failure(&mut self) -> DesyncReason {
        self.push_outcome(Outcome::Failed);
        self.desync(DesyncReason::NoLegalCandidate)
    }

    /// Feeds the result of comparing expected with observed occupancy on a
    /// stable frame. Desyncs once a mismatch outlives the window.
    pub fn observe_alignment(&mut self, aligned: bool, at: Duration) -> Option<DesyncReason> {
        if self.is_desynced() { return None; }
        if aligned {
            self.mismatch_since = None;
            return None;
        }
        let since = *self.mismatch_since.get_or_insert(at);
        if at.saturating_sub(since) >= self.params.mismatch_window() {
            return Some(self.desync(DesyncReason::PersistentMismatch));
        }
        None
    }

    /// Undo lifts a desync only as far as `Suspect`.
    pub fn after_undo(&mut self) {
        self.mismatch_since = None;
        if self.state == SyncState::Desynced {
            self.state = SyncState::Suspect;
            self.score = self.score.max(self.params.undo_resume_score).min(1.0);
            self.clean_streak = 0;
            log::info!("tracker suspect after undo at confidence {:.2}", self.score);
        }
    }

    /// Manual correction or new game.
    pub fn reset(&mut self) {
        self.score = self.params.baseline.clamp(0.0, 1.0);
        self.state = SyncState::Synced;
        self.clean_streak = 0;
        self.history.clear();
        self.mismatch_since = None;
    }
}

/// Four decimal places, so repeated steps land exactly on the thresholds.
fn quantize(score: f32) -> f32 { (score * 10_000.0).round() / 10_000.0 }

impl Default for ConfidenceTracker {
    fn default() -> Self { Self::new(ConfidenceParams::default()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean() -> Observation { Observation::default() }
    fn ambiguous() -> Observation { Observation { ambiguous: true, ..Observation::default() } }

    #[test]
    fn ambiguity_makes_suspect_and_clean_streak_recovers() {
        let mut t = ConfidenceTracker::default();
        assert_eq!(t.record_resolution(ambiguous()), None);
        assert_eq!(t.state(), SyncState::Suspect);
        assert!((t.score() - 0.8).abs() < 1e-6);
        t.record_resolution(clean());
        assert_eq!(t.state(), SyncState::Suspect);
        t.record_resolution(clean());
        assert_eq!(t.state(), SyncState::Synced);
        assert!((t.score() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn repeated_ambiguity_breaks_the_floor() {
        let mut t = ConfidenceTracker::default();
        assert_eq!(t.record_resolution(ambiguous()), None);
        assert_eq!(t.record_resolution(ambiguous()), None);
        assert_eq!(t.record_resolution(ambiguous()), Some(DesyncReason::ConfidenceFloor));
        assert!(t.is_desynced());
        // Terminal until someone intervenes.
        assert_eq!(t.record_resolution(clean()), None);
        assert!(t.is_desynced());
    }

    #[test]
    fn low_colour_and_slow_inputs_cost_score() {
        let mut t = ConfidenceTracker::new(ConfidenceParams { baseline: 0.8, ..ConfidenceParams::default() });
        let obs = Observation { ambiguous: false, color_confidence: Some(0.3), settle_latency: Some(Duration::from_secs(3)) };
        t.record_resolution(obs);
        // +0.1 - 0.1 - 0.1
        assert!((t.score() - 0.7).abs() < 1e-6);
        assert_eq!(t.state(), SyncState::Suspect);
    }

    #[test]
    fn landing_exactly_on_the_floor_stays_suspect() {
        let mut t = ConfidenceTracker::default();
        let obs = Observation { ambiguous: false, color_confidence: Some(0.3), settle_latency: Some(Duration::from_secs(3)) };
        for _ in 0..5 {
            assert_eq!(t.record_resolution(obs), None);
        }
        assert_eq!(t.score(), 0.5);
        assert_eq!(t.state(), SyncState::Suspect);
        assert_eq!(t.record_resolution(obs), Some(DesyncReason::ConfidenceFloor));
    }

    #[test]
    fn failure_desyncs_and_reset_restores_baseline() {
        let mut t = ConfidenceTracker::default();
        assert_eq!(t.record_failure(), DesyncReason::NoLegalCandidate);
        assert_eq!(t.state(), SyncState::Desynced);
        assert_eq!(t.history().collect::<Vec<_>>(), vec![Outcome::Failed]);
        t.reset();
        assert_eq!(t.state(), SyncState::Synced);
        assert_eq!(t.score(), 1.0);
        assert_eq!(t.history().count(), 0);
    }

    #[test]
    fn mismatch_must_persist_for_the_window() {
        let mut t = ConfidenceTracker::default();
        assert_eq!(t.observe_alignment(false, Duration::from_secs(10)), None);
        assert_eq!(t.observe_alignment(false, Duration::from_secs(12)), None);
        assert_eq!(t.observe_alignment(true, Duration::from_secs(13)), None);
        assert_eq!(t.observe_alignment(false, Duration::from_secs(14)), None);
        assert_eq!(t.observe_alignment(false, Duration::from_secs(19)), Some(DesyncReason::PersistentMismatch));
    }

    #[test]
    fn undo_only_reaches_suspect() {
        let mut t = ConfidenceTracker::default();
        t.record_failure();
        t.after_undo();
        assert_eq!(t.state(), SyncState::Suspect);
        assert!(t.score() >= 0.7);
    }

    #[test]
    fn history_is_bounded() {
        let mut t = ConfidenceTracker::new(ConfidenceParams { history_len: 3, ..ConfidenceParams::default() });
        for _ in 0..5 { t.record_resolution(clean()); }
        assert_eq!(t.history().count(), 3);
    }
}
