pub mod parameters;

use std::{error::Error, fs::File, io::Read, path::Path};

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crate::membrane::{ProteinType, Side};
use crate::state::{SimState, SoluteType};

use self::parameters::simulation::SimParams;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct InitialSolutes {
    pub kind: SoluteType,
    pub side: Side,
    pub count: usize,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct InitialProtein {
    pub slot: usize,
    pub protein: ProteinType,
}

/// A scenario file: physics parameters, RNG seed, and the initial membrane
/// and solute population.
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SetupConfig {
    pub parameters: SimParams,
    pub seed: u64,
    #[serde(default)]
    pub solutes: Vec<InitialSolutes>,
    #[serde(default)]
    pub proteins: Vec<InitialProtein>,
    #[serde(default)]
    pub ligands_enabled: bool,
}

impl SetupConfig {
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let config: SetupConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn Error>> {
        for p in &self.proteins {
            if p.slot >= self.parameters.slot_count {
                return Err(format!(
                    "protein assigned to slot {} but there are only {} slots",
                    p.slot, self.parameters.slot_count
                )
                .into());
            }
        }
        Ok(())
    }

    /// Builds the initial simulation state the scenario describes.
    pub fn build_state(&self) -> SimState {
        let rng = Pcg64Mcg::seed_from_u64(self.seed);
        let mut state = SimState::new(&self.parameters, rng);
        for p in &self.proteins {
            state.set_slot_protein(p.slot, Some(p.protein));
        }
        for s in &self.solutes {
            state.add_solutes(&self.parameters, s.kind, s.side, s.count);
        }
        state.set_ligands_enabled(&self.parameters, self.ligands_enabled);
        state
    }

    pub fn print(&self) {
        let p = &self.parameters;
        println!(
            "\
Environment:
  World half-extent: {hw} x {hh}
  Membrane half-thickness: {mh}
  Slots: {slots} (spacing {spacing})

Particles:
  Speed: {speed}
  Capture radius: {capture}
  Crossing cooldown: {cooldown} s

Seed: {seed}",
            hw = p.world.half_width,
            hh = p.world.half_height,
            mh = p.world.membrane_half_thickness,
            slots = p.slot_count,
            spacing = p.slot_spacing,
            speed = p.particle_speed,
            capture = p.capture_radius,
            cooldown = p.crossing_cooldown,
            seed = self.seed,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let config = SetupConfig {
            parameters: SimParams::default(),
            seed: 7,
            solutes: vec![InitialSolutes {
                kind: SoluteType::Sodium,
                side: Side::Outside,
                count: 30,
            }],
            proteins: vec![InitialProtein {
                slot: 3,
                protein: ProteinType::SodiumLeakageChannel,
            }],
            ligands_enabled: true,
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: SetupConfig = serde_yaml::from_str(&yaml).unwrap();
        let state = parsed.build_state();
        assert_eq!(state.total_solutes(SoluteType::Sodium), 30);
        assert_eq!(
            state.membrane.slots[3].protein.as_ref().map(|p| p.kind()),
            Some(ProteinType::SodiumLeakageChannel)
        );
        assert_eq!(
            state.total_solutes(SoluteType::LigandA),
            parsed.parameters.ligand_count
        );
    }

    #[test]
    fn test_validate_rejects_bad_slot() {
        let config = SetupConfig {
            parameters: SimParams::default(),
            seed: 0,
            solutes: vec![],
            proteins: vec![InitialProtein {
                slot: 99,
                protein: ProteinType::SodiumPotassiumPump,
            }],
            ligands_enabled: false,
        };
        assert!(config.validate().is_err());
    }
}
