use super::common::WorldConfig;

/// Every tunable constant of the simulation, passed explicitly into the step
/// functions. There is deliberately no global mutable configuration.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SimParams {
    // Time step of the headless run loop. Interactive hosts drive
    // `dynamics::update` with their own frame dt instead.
    pub dt: f64,
    // System.
    pub world: WorldConfig,
    pub slot_count: usize,
    pub slot_spacing: f64,
    // Particle motion.
    pub particle_speed: f64,
    /// How close to a slot a random-walking particle must be for a transport
    /// protein to capture it.
    pub capture_radius: f64,
    /// Minimum time after a crossing before a particle can interact with a
    /// protein again.
    pub crossing_cooldown: f64,
    /// Per-step chance that a gas touching the membrane starts diffusing
    /// through instead of bouncing.
    pub passive_diffusion_probability: f64,
    // Protein timing.
    /// Immobile pause at the channel entrance while caged water is shed.
    pub water_shedding_duration: f64,
    /// Dwell required in each pump conformation before the next timed
    /// transition may fire.
    pub pump_state_transition_interval: f64,
    /// How long a ligand stays bound to a ligand-gated channel.
    pub ligand_binding_duration: f64,
    pub ligand_count: usize,
    // Flux statistics.
    pub flux_smoothing_time_constant: f64,
    pub flux_entry_max_age: f64,
    // Fading and removal.
    /// Delay between a phosphate's crossing (or release from the pump) and
    /// the start of its fade-out.
    pub phosphate_linger_duration: f64,
    /// Opacity lost per second once a fade has started.
    pub fade_rate: f64,
    /// When enabled, glucose that is fully inside the cell is metabolized:
    /// it fades out and is removed.
    pub glucose_metabolism: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            dt: 1.0 / 60.0,
            world: WorldConfig::default(),
            slot_count: 7,
            slot_spacing: 25.0,
            particle_speed: 10.0,
            capture_radius: 25.0,
            crossing_cooldown: 1.0,
            passive_diffusion_probability: 0.9,
            water_shedding_duration: 0.5,
            pump_state_transition_interval: 0.5,
            ligand_binding_duration: 5.0,
            ligand_count: 10,
            flux_smoothing_time_constant: 0.25,
            flux_entry_max_age: 1.0,
            phosphate_linger_duration: 2.0,
            fade_rate: 0.5,
            glucose_metabolism: false,
        }
    }
}

impl SimParams {
    pub fn to_steps(&self, t: f64) -> usize {
        (t / self.dt).ceil() as usize
    }

    /// The x position of each slot, equally spaced and centered on x = 0.
    pub fn slot_positions(&self) -> Vec<f64> {
        let mid = (self.slot_count - 1) as f64 / 2.0;
        (0..self.slot_count)
            .map(|i| (i as f64 - mid) * self.slot_spacing)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_slot_positions_centered() {
        let params = SimParams::default();
        let xs = params.slot_positions();
        assert_eq!(xs.len(), 7);
        assert_relative_eq!(xs[0], -75.0);
        assert_relative_eq!(xs[3], 0.0);
        assert_relative_eq!(xs[6], 75.0);
    }

    #[test]
    fn test_to_steps_rounds_up() {
        let params = SimParams {
            dt: 0.1,
            ..SimParams::default()
        };
        assert_eq!(params.to_steps(1.0), 10);
        assert_eq!(params.to_steps(1.01), 11);
    }
}
