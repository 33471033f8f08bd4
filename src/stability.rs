// Turns a raw camera stream into stable frames for the core.

use crate::frame::OccupancyFrame;
use std::time::Duration;

/// Emits a frame once the same square states have been read `required`
/// times in a row and differ from what was last emitted.
#[derive(Clone, Debug)]
pub struct Debouncer {
    required: usize,
    candidate: Option<OccupancyFrame>,
    first_seen: Duration,
    count: usize,
    emitted: Option<OccupancyFrame>,
}

impl Debouncer {
    pub fn new(required: usize) -> Self {
        Self { required: required.max(1), candidate: None, first_seen: Duration::ZERO, count: 0, emitted: None }
    }

    /// Starts from a frame already known to the core, so it is not re-emitted.
    pub fn with_baseline(required: usize, baseline: OccupancyFrame) -> Self {
        Self { emitted: Some(baseline), ..Self::new(required) }
    }

    pub fn required(&self) -> usize { self.required }

    /// Consecutive samples agreeing with the current candidate.
    pub fn streak(&self) -> usize { self.count }

    pub fn push(&mut self, sample: OccupancyFrame) -> Option<OccupancyFrame> {
        match &self.candidate {
            Some(c) if c.same_squares(&sample) => self.count += 1,
            _ => {
                self.first_seen = sample.timestamp;
                self.count = 1;
            }
        }
        let at = sample.timestamp;
        self.candidate = Some(sample);
        if self.count < self.required { return None; }

        let candidate = self.candidate.as_ref()?;
        if self.emitted.as_ref().map_or(false, |e| e.same_squares(candidate)) { return None; }
        let stable = candidate.clone().with_settle_latency(at.saturating_sub(self.first_seen));
        log::debug!("stable after {} samples at {:?}", self.count, at);
        self.emitted = Some(stable.clone());
        Some(stable)
    }
}
