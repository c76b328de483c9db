use log::debug;

/// Conformational states of the sodium-potassium pump, in cycle order. The
/// pump only ever advances one state at a time; the defensive backward
/// transitions exist solely to cope with user-removed particles.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    derive_more::Display,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Default,
)]
pub enum PumpState {
    #[default]
    OpenToInsideEmpty,
    OpenToInsideSodiumBound,
    OpenToInsideSodiumAndAtpBound,
    OpenToInsideSodiumAndPhosphateBound,
    OpenToOutsideAwaitingPotassium,
    OpenToOutsidePotassiumBound,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default)]
pub struct SodiumPotassiumPump {
    pub state: PumpState,
    /// Time spent in the current state, gating the dwell-delayed transitions.
    pub time_in_state: f64,
}

impl SodiumPotassiumPump {
    pub fn set_state(&mut self, state: PumpState) {
        debug!("pump {} -> {}", self.state, state);
        self.state = state;
        self.time_in_state = 0.0;
    }
}
