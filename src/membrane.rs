pub mod occupancy;
pub mod protein;
pub mod pump;
pub mod slot;

pub use occupancy::{BindingSite, OccupancyMap, Reservation};
pub use protein::{
    LigandGatedChannel, ProteinType, SodiumGlucoseCotransporter, TransportProtein,
};
pub use pump::{PumpState, SodiumPotassiumPump};
pub use slot::Slot;

/// Which side of the membrane a particle is on. The membrane centerline is
/// y = 0; extracellular space is above it.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    derive_more::Display,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
)]
pub enum Side {
    Outside,
    Inside,
}

impl Side {
    /// A particle is counted on its side until its y-coordinate fully crosses
    /// zero; y = 0 itself counts as inside.
    pub fn of(y: f64) -> Side {
        if y > 0.0 {
            Side::Outside
        } else {
            Side::Inside
        }
    }

    /// Sign of y-coordinates on this side.
    pub fn sign(self) -> f64 {
        match self {
            Side::Outside => 1.0,
            Side::Inside => -1.0,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Outside => Side::Inside,
            Side::Inside => Side::Outside,
        }
    }
}

/// The three membrane potentials the user can select.
#[derive(
    serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
)]
pub enum MembranePotential {
    /// Resting potential, -70 mV.
    #[default]
    RestingMinus70,
    /// Depolarized, -50 mV; opens sodium voltage-gated channels.
    DepolarizedMinus50,
    /// Repolarization overshoot, +30 mV; opens potassium voltage-gated channels.
    Plus30,
}

impl MembranePotential {
    pub fn millivolts(self) -> f64 {
        match self {
            MembranePotential::RestingMinus70 => -70.0,
            MembranePotential::DepolarizedMinus50 => -50.0,
            MembranePotential::Plus30 => 30.0,
        }
    }
}

/// The membrane and everything embedded in it: the fixed slots, the binding
/// site reservation table, the selected potential, and whether ligands are
/// currently present in the extracellular space.
#[derive(serde::Serialize, serde::Deserialize, Clone)]
pub struct Membrane {
    pub slots: Vec<Slot>,
    // Rebuilt from particle modes after deserialization.
    #[serde(skip)]
    pub occupancy: OccupancyMap,
    pub potential: MembranePotential,
    pub ligands_enabled: bool,
}

impl Membrane {
    pub fn new(slot_positions: Vec<f64>) -> Self {
        Membrane {
            slots: slot_positions.into_iter().map(Slot::new).collect(),
            occupancy: OccupancyMap::default(),
            potential: MembranePotential::default(),
            ligands_enabled: false,
        }
    }

    pub fn leftmost_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.protein.is_none())
    }

    /// The empty slot nearest to `x`, used when the user drops a protein onto
    /// the membrane between slots.
    pub fn nearest_empty_slot(&self, x: f64) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.protein.is_none())
            .min_by(|(_, a), (_, b)| {
                (a.x - x).abs().partial_cmp(&(b.x - x).abs()).unwrap()
            })
            .map(|(i, _)| i)
    }
}
