use crate::particle::{ParticleId, PhaseState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub id: ParticleId,
    pub from: PhaseState,
    pub to: PhaseState,
    /// Simulated time of the transition.
    pub time_ms: f64,
    pub dwell_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    pub scenario: String,
    pub escaped_count: usize,
    /// Every particle that took part, escaped or still active.
    pub total_seen: usize,
    pub gas_count: usize,
    pub elapsed_s: f64,
}

impl TrialSummary {
    pub fn escaped_fraction(&self) -> f64 {
        if self.total_seen == 0 {
            0.0
        } else {
            self.escaped_count as f64 / self.total_seen as f64
        }
    }
}

/// Callbacks fired from inside `step`. Both default to no-ops.
pub trait TrialObserver {
    fn on_state_change(&mut self, _change: &StateChange) {}

    fn on_trial_end(&mut self, _summary: &TrialSummary) {}
}
