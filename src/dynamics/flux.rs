use std::collections::HashMap;

use crate::state::{CrossingDirection, SoluteType};

/// One membrane-crossing event. Ephemeral: entries are pruned once older
/// than the smoothing window and are only ever consumed in aggregate.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug)]
pub struct FluxEntry {
    pub kind: SoluteType,
    pub t: f64,
    pub direction: CrossingDirection,
}

/// Smoothed net crossing rate per solute type. The raw rate is the signed
/// crossing count over the retention window; an exponential filter with
/// `alpha = dt / (tau + dt)` turns it into a continuously decaying signal
/// (positive = net inward) usable for display without per-step jitter.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
pub struct FluxTracker {
    entries: Vec<FluxEntry>,
    smoothed: HashMap<SoluteType, f64>,
    tau: f64,
    max_age: f64,
}

impl FluxTracker {
    pub fn new(tau: f64, max_age: f64) -> Self {
        FluxTracker {
            entries: Vec::new(),
            smoothed: HashMap::new(),
            tau,
            max_age,
        }
    }

    pub fn record(&mut self, kind: SoluteType, t: f64, direction: CrossingDirection) {
        self.entries.push(FluxEntry { kind, t, direction });
    }

    /// Prunes stale entries and advances the smoothed signals. Called once
    /// per step after all particles have moved.
    pub fn step(&mut self, t_now: f64, dt: f64) {
        let cutoff = t_now - self.max_age;
        self.entries.retain(|e| e.t >= cutoff);
        let alpha = dt / (self.tau + dt);
        for kind in SoluteType::ALL {
            let signed: f64 = self
                .entries
                .iter()
                .filter(|e| e.kind == kind)
                .map(|e| match e.direction {
                    CrossingDirection::Inward => 1.0,
                    CrossingDirection::Outward => -1.0,
                })
                .sum();
            let raw = signed / self.max_age;
            let s = self.smoothed.entry(kind).or_insert(0.0);
            *s += alpha * (raw - *s);
        }
    }

    /// Smoothed net inward rate for a solute type, crossings per second.
    pub fn smoothed(&self, kind: SoluteType) -> f64 {
        self.smoothed.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
