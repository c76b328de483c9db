use log::debug;
use nalgebra::{Point2, Vector2};
use rand::Rng;
use rand_pcg::Pcg64Mcg;

use crate::config::setup::parameters::simulation::SimParams;
use crate::dynamics::flux::FluxTracker;
use crate::geometry::{random_point_in, random_unit_vector, random_unit_vector_away};
use crate::membrane::{
    BindingSite, Membrane, MembranePotential, ProteinType, Reservation, Side,
    TransportProtein,
};

#[derive(
    serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct ParticleId(pub u64);

/// The closed set of diffusible species. Ligands are particles too: they
/// random-walk in the extracellular space and bind ligand-gated channels, but
/// never cross the membrane.
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
pub enum SoluteType {
    Oxygen,
    CarbonDioxide,
    Sodium,
    Potassium,
    Glucose,
    Atp,
    Adp,
    Phosphate,
    LigandA,
    LigandB,
}

impl SoluteType {
    pub const ALL: [SoluteType; 10] = [
        SoluteType::Oxygen,
        SoluteType::CarbonDioxide,
        SoluteType::Sodium,
        SoluteType::Potassium,
        SoluteType::Glucose,
        SoluteType::Atp,
        SoluteType::Adp,
        SoluteType::Phosphate,
        SoluteType::LigandA,
        SoluteType::LigandB,
    ];

    /// Display radius in model units, fixed at construction from the type.
    pub fn radius(self) -> f64 {
        match self {
            SoluteType::Oxygen => 3.0,
            SoluteType::CarbonDioxide => 3.5,
            SoluteType::Sodium => 2.0,
            SoluteType::Potassium => 2.5,
            SoluteType::Glucose => 4.0,
            SoluteType::Atp => 5.0,
            SoluteType::Adp => 4.5,
            SoluteType::Phosphate => 2.5,
            SoluteType::LigandA | SoluteType::LigandB => 3.5,
        }
    }

    /// Gases diffuse passively through the lipid bilayer; everything else
    /// needs a transport protein.
    pub fn is_gas(self) -> bool {
        matches!(self, SoluteType::Oxygen | SoluteType::CarbonDioxide)
    }

    pub fn is_ligand(self) -> bool {
        matches!(self, SoluteType::LigandA | SoluteType::LigandB)
    }
}

/// Which way a particle is headed across the membrane. Inward is from the
/// extracellular side (y > 0) into the cell.
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
pub enum CrossingDirection {
    Inward,
    Outward,
}

impl CrossingDirection {
    /// Sign of the vertical velocity while crossing.
    pub fn y_sign(self) -> f64 {
        match self {
            CrossingDirection::Inward => -1.0,
            CrossingDirection::Outward => 1.0,
        }
    }

    /// The side the crossing starts from.
    pub fn origin(self) -> Side {
        match self {
            CrossingDirection::Inward => Side::Outside,
            CrossingDirection::Outward => Side::Inside,
        }
    }

    pub fn destination(self) -> Side {
        self.origin().opposite()
    }

    pub fn from_side(side: Side) -> CrossingDirection {
        match side {
            Side::Outside => CrossingDirection::Inward,
            Side::Inside => CrossingDirection::Outward,
        }
    }
}

// Random-walk heading resampling: how long a blend toward the new heading
// takes, and how long until the next heading is drawn.
pub const TURN_DURATION_RANGE: (f64, f64) = (0.3, 1.2);
pub const TURN_INTERVAL_RANGE: (f64, f64) = (0.5, 2.0);

/// Per-particle motion mode. Exactly one variant is active at a time, and
/// every slot-referencing variant is mirrored by a reservation in the
/// occupancy table the instant the mode is assigned.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum ParticleMode {
    RandomWalk {
        direction: Vector2<f64>,
        target: Vector2<f64>,
        turn_duration: f64,
        time_until_turn: f64,
    },
    PassiveDiffusion {
        direction: CrossingDirection,
    },
    MoveToChannelCenter {
        slot: usize,
    },
    MoveToLigandBindingSite {
        slot: usize,
    },
    LigandBound {
        slot: usize,
    },
    MoveToCotransporter {
        slot: usize,
        site: BindingSite,
    },
    WaitingInCotransporter {
        slot: usize,
        site: BindingSite,
    },
    MoveToPump {
        slot: usize,
        site: BindingSite,
    },
    WaitingInPump {
        slot: usize,
        site: BindingSite,
    },
    EnteringProtein {
        slot: usize,
        direction: CrossingDirection,
    },
    SheddingCagedWater {
        slot: usize,
        direction: CrossingDirection,
        remaining: f64,
    },
    MovingThroughProtein {
        slot: usize,
        direction: CrossingDirection,
        offset: f64,
    },
    UserControlled,
    UserOver,
}

impl ParticleMode {
    /// A fresh random walk with a randomly sampled heading.
    pub fn random_walk<R: Rng>(rng: &mut R) -> ParticleMode {
        let direction = random_unit_vector(rng);
        ParticleMode::random_walk_with(rng, direction)
    }

    /// A random walk starting from the given heading, e.g. biased away from
    /// the membrane after a crossing.
    pub fn random_walk_with<R: Rng>(rng: &mut R, direction: Vector2<f64>) -> ParticleMode {
        ParticleMode::RandomWalk {
            direction,
            target: random_unit_vector(rng),
            turn_duration: rng.gen_range(TURN_DURATION_RANGE.0..TURN_DURATION_RANGE.1),
            time_until_turn: rng.gen_range(TURN_INTERVAL_RANGE.0..TURN_INTERVAL_RANGE.1),
        }
    }

    /// The slot this mode is associated with, if any.
    pub fn slot(&self) -> Option<usize> {
        match *self {
            ParticleMode::MoveToChannelCenter { slot }
            | ParticleMode::MoveToLigandBindingSite { slot }
            | ParticleMode::LigandBound { slot }
            | ParticleMode::MoveToCotransporter { slot, .. }
            | ParticleMode::WaitingInCotransporter { slot, .. }
            | ParticleMode::MoveToPump { slot, .. }
            | ParticleMode::WaitingInPump { slot, .. }
            | ParticleMode::EnteringProtein { slot, .. }
            | ParticleMode::SheddingCagedWater { slot, .. }
            | ParticleMode::MovingThroughProtein { slot, .. } => Some(slot),
            _ => None,
        }
    }

    /// What this mode holds on the membrane, mirrored into the occupancy
    /// table by `Particle::set_mode`.
    pub fn reservation(&self) -> Option<Reservation> {
        match *self {
            ParticleMode::MoveToChannelCenter { slot }
            | ParticleMode::EnteringProtein { slot, .. }
            | ParticleMode::SheddingCagedWater { slot, .. }
            | ParticleMode::MovingThroughProtein { slot, .. } => {
                Some(Reservation::Traversal(slot))
            }
            ParticleMode::MoveToLigandBindingSite { slot }
            | ParticleMode::LigandBound { slot } => {
                Some(Reservation::Site(slot, BindingSite::Ligand))
            }
            ParticleMode::MoveToCotransporter { slot, site }
            | ParticleMode::WaitingInCotransporter { slot, site }
            | ParticleMode::MoveToPump { slot, site }
            | ParticleMode::WaitingInPump { slot, site } => {
                Some(Reservation::Site(slot, site))
            }
            _ => None,
        }
    }

    /// Waiting modes hold a filled binding site.
    pub fn is_waiting_at(&self, in_slot: usize, in_site: BindingSite) -> bool {
        matches!(
            *self,
            ParticleMode::WaitingInPump { slot, site }
            | ParticleMode::WaitingInCotransporter { slot, site }
                if slot == in_slot && site == in_site
        )
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
pub struct Particle {
    pub id: ParticleId,
    pub kind: SoluteType,
    pub position: Point2<f64>,
    /// Fades to zero ahead of removal (metabolized glucose, spent phosphate).
    pub opacity: f64,
    /// Time since this particle last crossed the membrane; `None` until the
    /// first crossing. Gates re-capture by transport proteins.
    pub time_since_crossing: Option<f64>,
    /// Once set, counts down to the start of the opacity fade.
    pub fade_countdown: Option<f64>,
    pub mode: ParticleMode,
}

impl Particle {
    /// Assigns a new mode, transactionally moving any occupancy reservation
    /// from the old mode to the new one.
    pub fn set_mode(&mut self, mode: ParticleMode, occupancy: &mut crate::membrane::OccupancyMap) {
        if let Some(res) = self.mode.reservation() {
            occupancy.release(res, self.id);
        }
        if let Some(res) = mode.reservation() {
            occupancy.reserve(res, self.id);
        }
        self.mode = mode;
    }

    pub fn side(&self) -> Side {
        Side::of(self.position.y)
    }

    pub fn crossing_cooldown_elapsed(&self, cooldown: f64) -> bool {
        self.time_since_crossing.map_or(true, |t| t >= cooldown)
    }
}

/// A discrete thing that happened during one step, consumed by the sound and
/// description layers.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub enum SimEvent {
    WallBounce { particle: ParticleId },
    MembraneReflect { particle: ParticleId },
    SoluteCrossed { kind: SoluteType, direction: CrossingDirection },
    LigandBound { slot: usize },
    LigandReleased { slot: usize },
    AtpSplit { slot: usize },
    PumpStateChanged { slot: usize, state: crate::membrane::PumpState },
    CotransporterOpened { slot: usize },
    CotransporterClosed { slot: usize },
}

/// A summary of what happened during a single step.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default)]
pub struct StepSummary {
    pub events: Vec<SimEvent>,
}

#[derive(serde::Serialize, serde::Deserialize, Clone)]
pub struct SimState {
    pub particles: Vec<Particle>,
    pub membrane: Membrane,
    pub flux: FluxTracker,
    pub t: f64,
    pub step: usize,
    pub paused: bool,
    pub time_speed: f64,
    pub next_particle_id: u64,
    pub rng: Pcg64Mcg,
}

impl SimState {
    pub fn new(params: &SimParams, rng: Pcg64Mcg) -> SimState {
        SimState {
            particles: Vec::new(),
            membrane: Membrane::new(params.slot_positions()),
            flux: FluxTracker::new(
                params.flux_smoothing_time_constant,
                params.flux_entry_max_age,
            ),
            t: 0.0,
            step: 0,
            paused: false,
            time_speed: 1.0,
            next_particle_id: 0,
            rng,
        }
    }

    pub fn spawn_particle(
        &mut self,
        kind: SoluteType,
        position: Point2<f64>,
        mode: ParticleMode,
    ) -> ParticleId {
        let id = ParticleId(self.next_particle_id);
        self.next_particle_id += 1;
        let particle = Particle {
            id,
            kind,
            position,
            opacity: 1.0,
            time_since_crossing: None,
            fade_countdown: None,
            mode,
        };
        if let Some(res) = particle.mode.reservation() {
            self.membrane.occupancy.reserve(res, id);
        }
        self.particles.push(particle);
        id
    }

    /// Adds `count` solutes of a kind, uniformly placed on one side.
    pub fn add_solutes(&mut self, params: &SimParams, kind: SoluteType, side: Side, count: usize) {
        debug!("add_solutes({kind}, {side}, {count})");
        let region = params.world.region(side).shrink(kind.radius());
        for _ in 0..count {
            let position = random_point_in(&mut self.rng, &region);
            let mode = ParticleMode::random_walk(&mut self.rng);
            self.spawn_particle(kind, position, mode);
        }
    }

    /// Removes up to `count` solutes of a kind from one side, newest first.
    /// Particles holding no binding-site or pore reservation go first;
    /// protein-bound cargo is only taken once no free particle of that kind
    /// is left on that side.
    pub fn remove_solutes(&mut self, kind: SoluteType, side: Side, count: usize) {
        let mut ids: Vec<ParticleId> = self
            .particles
            .iter()
            .rev()
            .filter(|p| p.kind == kind && p.side() == side && p.mode.reservation().is_none())
            .map(|p| p.id)
            .collect();
        if ids.len() < count {
            ids.extend(
                self.particles
                    .iter()
                    .rev()
                    .filter(|p| {
                        p.kind == kind && p.side() == side && p.mode.reservation().is_some()
                    })
                    .map(|p| p.id),
            );
        }
        for id in ids.into_iter().take(count) {
            self.remove_particle(id);
        }
    }

    /// Removes one particle, releasing any binding-site reservation it holds
    /// and unbinding it from a ligand-gated channel if it is a bound ligand.
    /// The pump's defensive backward transitions observe the freed site on
    /// the next step.
    pub fn remove_particle(&mut self, id: ParticleId) {
        let idx = match self.particles.iter().position(|p| p.id == id) {
            Some(idx) => idx,
            None => return,
        };
        let mode = self.particles[idx].mode;
        if let Some(res) = mode.reservation() {
            self.membrane.occupancy.release(res, id);
        }
        if let ParticleMode::LigandBound { slot } | ParticleMode::MoveToLigandBindingSite { slot } =
            mode
        {
            if let Some(TransportProtein::LigandGated(channel)) =
                self.membrane.slots[slot].protein.as_mut()
            {
                if channel.bound.map_or(false, |b| b.ligand == id) {
                    channel.bound = None;
                }
            }
        }
        self.particles.remove(idx);
    }

    /// Toggles ligand presence: spawns the fixed ligand population outside,
    /// or removes every ligand particle (unbinding any bound ones).
    pub fn set_ligands_enabled(&mut self, params: &SimParams, enabled: bool) {
        if enabled == self.membrane.ligands_enabled {
            return;
        }
        self.membrane.ligands_enabled = enabled;
        if enabled {
            self.add_solutes(params, SoluteType::LigandA, Side::Outside, params.ligand_count);
            self.add_solutes(params, SoluteType::LigandB, Side::Outside, params.ligand_count);
        } else {
            let ids: Vec<ParticleId> = self
                .particles
                .iter()
                .filter(|p| p.kind.is_ligand())
                .map(|p| p.id)
                .collect();
            for id in ids {
                self.remove_particle(id);
            }
        }
    }

    /// Replaces (or clears) the protein in a slot. Any particle interacting
    /// with the old protein is released back to a random walk pointed away
    /// from the membrane on its current side; a pump mid-cycle is discarded
    /// along with its conformational state.
    pub fn set_slot_protein(&mut self, slot: usize, kind: Option<ProteinType>) {
        let occupants = self.membrane.occupancy.slot_occupants(slot);
        for (_, id) in occupants {
            self.release_to_random_walk(id);
        }
        let traversing: Vec<ParticleId> = self
            .particles
            .iter()
            .filter(|p| p.mode.slot() == Some(slot) && p.mode.reservation().is_some())
            .map(|p| p.id)
            .collect();
        for id in traversing {
            self.release_to_random_walk(id);
        }
        self.membrane.slots[slot].protein = kind.map(TransportProtein::new);
    }

    fn release_to_random_walk(&mut self, id: ParticleId) {
        if let Some(idx) = self.particles.iter().position(|p| p.id == id) {
            let y_sign = self.particles[idx].side().sign();
            let direction = random_unit_vector_away(&mut self.rng, y_sign);
            let mode = ParticleMode::random_walk_with(&mut self.rng, direction);
            let particle = &mut self.particles[idx];
            particle.set_mode(mode, &mut self.membrane.occupancy);
        }
    }

    /// Takes a particle out of the simulation's control while the user drags
    /// it. Any reservation it held is released, so a pump or cotransporter
    /// waiting on it reacts as if the particle left.
    pub fn begin_user_control(&mut self, id: ParticleId) {
        if let Some(idx) = self.particles.iter().position(|p| p.id == id) {
            let p = &mut self.particles[idx];
            p.set_mode(ParticleMode::UserControlled, &mut self.membrane.occupancy);
        }
    }

    /// Marks a particle as hovered by the pointer: it holds still until the
    /// drag starts or `end_user_control` hands it back.
    pub fn set_user_over(&mut self, id: ParticleId) {
        if let Some(idx) = self.particles.iter().position(|p| p.id == id) {
            let p = &mut self.particles[idx];
            p.set_mode(ParticleMode::UserOver, &mut self.membrane.occupancy);
        }
    }

    /// Drops a dragged (or hovered) particle at a position and hands it back
    /// to the simulation as a random walker.
    pub fn end_user_control(&mut self, id: ParticleId, position: Point2<f64>) {
        if let Some(idx) = self.particles.iter().position(|p| p.id == id) {
            self.particles[idx].position = position;
            self.release_to_random_walk(id);
        }
    }

    pub fn set_membrane_potential(&mut self, potential: MembranePotential) {
        self.membrane.potential = potential;
    }

    pub fn is_slot_solute_free(&self, slot: usize) -> bool {
        self.membrane.occupancy.is_solute_free(slot)
    }

    pub fn count_solutes(&self, kind: SoluteType, side: Side) -> usize {
        self.particles
            .iter()
            .filter(|p| p.kind == kind && p.side() == side)
            .count()
    }

    pub fn total_solutes(&self, kind: SoluteType) -> usize {
        self.particles.iter().filter(|p| p.kind == kind).count()
    }

    /// Restores the initial empty configuration, keeping the RNG stream.
    pub fn reset(&mut self, params: &SimParams) {
        self.particles.clear();
        self.membrane = Membrane::new(params.slot_positions());
        self.flux = FluxTracker::new(
            params.flux_smoothing_time_constant,
            params.flux_entry_max_age,
        );
        self.t = 0.0;
        self.step = 0;
        self.paused = false;
        self.time_speed = 1.0;
    }

    /// Rebuilds the occupancy table from particle modes, used after
    /// deserializing a checkpoint (the table itself is not persisted).
    pub fn rebuild_occupancy(&mut self) {
        self.membrane.occupancy.clear();
        for p in &self.particles {
            if let Some(res) = p.mode.reservation() {
                self.membrane.occupancy.reserve(res, p.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::setup::parameters::simulation::SimParams;
    use rand::SeedableRng;

    fn new_state() -> (SimParams, SimState) {
        let params = SimParams::default();
        let state = SimState::new(&params, Pcg64Mcg::seed_from_u64(42));
        (params, state)
    }

    #[test]
    fn test_counting_partitions_all_particles() {
        let (params, mut state) = new_state();
        state.add_solutes(&params, SoluteType::Sodium, Side::Outside, 20);
        state.add_solutes(&params, SoluteType::Sodium, Side::Inside, 15);
        state.add_solutes(&params, SoluteType::Glucose, Side::Inside, 5);
        assert_eq!(
            state.count_solutes(SoluteType::Sodium, Side::Outside)
                + state.count_solutes(SoluteType::Sodium, Side::Inside),
            state.total_solutes(SoluteType::Sodium)
        );
        assert_eq!(state.total_solutes(SoluteType::Sodium), 35);
        assert_eq!(state.count_solutes(SoluteType::Glucose, Side::Inside), 5);
        // A particle exactly on the centerline counts as inside, never both.
        let id = state.spawn_particle(
            SoluteType::Oxygen,
            nalgebra::Point2::new(0.0, 0.0),
            ParticleMode::random_walk(&mut Pcg64Mcg::seed_from_u64(1)),
        );
        assert_eq!(state.count_solutes(SoluteType::Oxygen, Side::Inside), 1);
        assert_eq!(state.count_solutes(SoluteType::Oxygen, Side::Outside), 0);
        state.remove_particle(id);
        assert_eq!(state.total_solutes(SoluteType::Oxygen), 0);
    }

    #[test]
    fn test_remove_solutes_respects_side_and_count() {
        let (params, mut state) = new_state();
        state.add_solutes(&params, SoluteType::Potassium, Side::Outside, 10);
        state.add_solutes(&params, SoluteType::Potassium, Side::Inside, 10);
        state.remove_solutes(SoluteType::Potassium, Side::Outside, 4);
        assert_eq!(state.count_solutes(SoluteType::Potassium, Side::Outside), 6);
        assert_eq!(state.count_solutes(SoluteType::Potassium, Side::Inside), 10);
        // Removing more than exist is clamped.
        state.remove_solutes(SoluteType::Potassium, Side::Outside, 100);
        assert_eq!(state.count_solutes(SoluteType::Potassium, Side::Outside), 0);
    }

    #[test]
    fn test_slot_protein_replacement_is_exclusive() {
        let (_, mut state) = new_state();
        state.set_slot_protein(3, Some(ProteinType::SodiumLeakageChannel));
        assert_eq!(
            state.membrane.slots[3].protein.as_ref().map(|p| p.kind()),
            Some(ProteinType::SodiumLeakageChannel)
        );
        state.set_slot_protein(3, Some(ProteinType::SodiumPotassiumPump));
        assert_eq!(
            state.membrane.slots[3].protein.as_ref().map(|p| p.kind()),
            Some(ProteinType::SodiumPotassiumPump)
        );
        state.set_slot_protein(3, None);
        assert!(state.membrane.slots[3].protein.is_none());
        assert_eq!(state.membrane.leftmost_empty_slot(), Some(0));
    }

    #[test]
    fn test_ligand_toggle_round_trip() {
        let (params, mut state) = new_state();
        state.set_ligands_enabled(&params, true);
        assert_eq!(state.total_solutes(SoluteType::LigandA), params.ligand_count);
        assert_eq!(state.total_solutes(SoluteType::LigandB), params.ligand_count);
        assert!(state
            .particles
            .iter()
            .filter(|p| p.kind.is_ligand())
            .all(|p| p.side() == Side::Outside));
        state.set_ligands_enabled(&params, false);
        assert_eq!(state.total_solutes(SoluteType::LigandA), 0);
        assert_eq!(state.total_solutes(SoluteType::LigandB), 0);
    }

    #[test]
    fn test_user_drag_releases_binding_site() {
        let (_, mut state) = new_state();
        state.set_slot_protein(4, Some(ProteinType::SodiumPotassiumPump));
        let id = state.spawn_particle(
            SoluteType::Sodium,
            nalgebra::Point2::new(25.0, -7.0),
            ParticleMode::WaitingInPump {
                slot: 4,
                site: BindingSite::PumpSodium1,
            },
        );
        assert!(!state.membrane.occupancy.is_site_free(4, BindingSite::PumpSodium1));
        state.set_user_over(id);
        assert!(state.membrane.occupancy.is_site_free(4, BindingSite::PumpSodium1));
        assert_eq!(state.particles[0].mode, ParticleMode::UserOver);
        state.begin_user_control(id);
        assert_eq!(state.particles[0].mode, ParticleMode::UserControlled);
        state.end_user_control(id, nalgebra::Point2::new(0.0, -50.0));
        assert!(matches!(state.particles[0].mode, ParticleMode::RandomWalk { .. }));
        assert_eq!(state.particles[0].position, nalgebra::Point2::new(0.0, -50.0));
    }

    #[test]
    fn test_rebuild_occupancy_matches_modes() {
        let (_, mut state) = new_state();
        state.set_slot_protein(2, Some(ProteinType::SodiumPotassiumPump));
        state.spawn_particle(
            SoluteType::Sodium,
            nalgebra::Point2::new(-25.0, -20.0),
            ParticleMode::MoveToPump {
                slot: 2,
                site: BindingSite::PumpSodium1,
            },
        );
        assert!(!state.membrane.occupancy.is_site_free(2, BindingSite::PumpSodium1));
        state.rebuild_occupancy();
        assert!(!state.membrane.occupancy.is_site_free(2, BindingSite::PumpSodium1));
        assert!(state.membrane.occupancy.is_site_free(2, BindingSite::PumpSodium2));
    }
}
