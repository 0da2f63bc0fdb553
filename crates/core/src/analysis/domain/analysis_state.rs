use std::collections::HashMap;

use crate::analysis::domain::sliding_window::SlidingWindowAverage;
use crate::identity::domain::identity_key::IdentityKey;

struct TrackedIdentity {
    window: SlidingWindowAverage,
    last_seen_tick: u64,
}

/// Smoothing state of one analysis session.
///
/// Holds the global window and one window per identity, created on first
/// sighting. Without `max_idle_frames` identities are never dropped, so the
/// map grows for the whole session. With it, [`AnalysisState::end_frame`]
/// evicts identities not updated during the last `max_idle_frames` frames.
/// Ticks count `end_frame` calls, not frame indices.
pub struct AnalysisState {
    window_size: usize,
    max_idle_frames: Option<usize>,
    global: SlidingWindowAverage,
    identities: HashMap<IdentityKey, TrackedIdentity>,
    tick: u64,
}

impl AnalysisState {
    pub fn new(window_size: usize, max_idle_frames: Option<usize>) -> Self {
        Self {
            window_size,
            max_idle_frames,
            global: SlidingWindowAverage::new(window_size),
            identities: HashMap::new(),
            tick: 0,
        }
    }

    /// Pushes a sample into `identity`'s window, creating it if needed, and
    /// returns the window mean.
    pub fn record_identity(&mut self, identity: &IdentityKey, rate: f64) -> f64 {
        let tick = self.tick;
        let window_size = self.window_size;
        let tracked = self
            .identities
            .entry(identity.clone())
            .or_insert_with(|| TrackedIdentity {
                window: SlidingWindowAverage::new(window_size),
                last_seen_tick: tick,
            });
        tracked.window.push(rate);
        tracked.last_seen_tick = tick;
        tracked.window.mean_or(rate)
    }

    /// Current mean of `identity`'s window, if it has one with samples.
    pub fn identity_mean(&self, identity: &IdentityKey) -> Option<f64> {
        self.identities
            .get(identity)
            .and_then(|tracked| tracked.window.mean())
    }

    /// Pushes the frame-level rate into the global window and returns its mean.
    pub fn record_global(&mut self, rate: f64) -> f64 {
        self.global.push(rate);
        self.global.mean_or(rate)
    }

    /// Closes the current frame, evicting idle identities when configured.
    pub fn end_frame(&mut self) {
        if let Some(max_idle) = self.max_idle_frames {
            let tick = self.tick;
            let before = self.identities.len();
            self.identities
                .retain(|_, tracked| tick - tracked.last_seen_tick < max_idle as u64);
            let evicted = before - self.identities.len();
            if evicted > 0 {
                log::debug!("Evicted {evicted} idle identities");
            }
        }
        self.tick += 1;
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    pub fn contains(&self, identity: &IdentityKey) -> bool {
        self.identities.contains_key(identity)
    }
}
