use log::debug;

use super::{all_waiting, waiting_particle, ProteinCtx};
use crate::geometry::random_unit_vector_away;
use crate::membrane::occupancy::COTRANSPORTER_SODIUM_SITES;
use crate::membrane::{BindingSite, LigandGatedChannel, Side, SodiumGlucoseCotransporter};
use crate::state::{CrossingDirection, ParticleMode, SimEvent};

/// Counts down a bound ligand's hold time and releases it back into the
/// extracellular space when it expires. If the bound ligand particle was
/// deleted out from under the channel, the channel just closes.
pub fn step_ligand_gated(
    channel: &mut LigandGatedChannel,
    slot: usize,
    dt: f64,
    ctx: &mut ProteinCtx,
) {
    let Some(bound) = channel.bound.as_mut() else {
        return;
    };
    let idx = match ctx.particles.iter().position(|p| p.id == bound.ligand) {
        Some(idx) => idx,
        None => {
            debug!("bound ligand vanished from channel at slot {slot}");
            channel.bound = None;
            return;
        }
    };
    bound.remaining -= dt;
    if bound.remaining > 0.0 {
        return;
    }
    let away = random_unit_vector_away(ctx.rng, Side::Outside.sign());
    let mode = ParticleMode::random_walk_with(ctx.rng, away);
    ctx.particles[idx].set_mode(mode, ctx.occupancy);
    channel.bound = None;
    debug!("ligand released from channel at slot {slot}");
    ctx.events.push(SimEvent::LigandReleased { slot });
}

/// Opens the cotransporter once both sodium sites and the glucose site are
/// filled, sending all three cargo particles through together. It stays open
/// until the last of them exits on the far side, which the traversal logic
/// observes via the traversal count.
pub fn step_cotransporter(
    cotransporter: &mut SodiumGlucoseCotransporter,
    slot: usize,
    ctx: &mut ProteinCtx,
) {
    if cotransporter.open {
        return;
    }
    let mut sites = COTRANSPORTER_SODIUM_SITES.to_vec();
    sites.push(BindingSite::CotransporterGlucose);
    if !all_waiting(ctx, slot, &sites) {
        return;
    }
    cotransporter.open = true;
    debug!("cotransporter at slot {slot} opening");
    ctx.events.push(SimEvent::CotransporterOpened { slot });
    for site in sites {
        if let Some(idx) = waiting_particle(ctx, slot, site) {
            let offset = match site {
                BindingSite::CotransporterSodium1 => -2.0,
                BindingSite::CotransporterSodium2 => 2.0,
                _ => 0.0,
            };
            let p = &mut ctx.particles[idx];
            p.set_mode(
                ParticleMode::MovingThroughProtein {
                    slot,
                    direction: CrossingDirection::Inward,
                    offset,
                },
                ctx.occupancy,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::setup::parameters::simulation::SimParams;
    use crate::membrane::{ProteinType, TransportProtein};
    use crate::state::{SimState, SoluteType};
    use nalgebra::Point2;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    fn step(params: &SimParams, state: &mut SimState, dt: f64) -> Vec<SimEvent> {
        crate::dynamics::update(params, state, dt).events
    }

    #[test]
    fn test_ligand_bind_opens_channel_then_releases() {
        let params = SimParams {
            ligand_binding_duration: 0.5,
            ..SimParams::default()
        };
        let mut state = SimState::new(&params, Pcg64Mcg::seed_from_u64(3));
        state.set_slot_protein(3, Some(ProteinType::SodiumLigandGatedChannel));
        // A ligand already at the binding site's doorstep.
        state.spawn_particle(
            SoluteType::LigandA,
            Point2::new(0.0, 8.0),
            ParticleMode::MoveToLigandBindingSite { slot: 3 },
        );
        state.rebuild_occupancy();

        let dt = 0.05;
        let mut bound_at = None;
        let mut released_at = None;
        for i in 0..100 {
            let events = step(&params, &mut state, dt);
            if events.contains(&SimEvent::LigandBound { slot: 3 }) {
                bound_at = Some(i);
                // While bound, the channel is open to sodium.
                assert!(state.membrane.slots[3]
                    .protein
                    .as_ref()
                    .unwrap()
                    .is_open_to(SoluteType::Sodium, state.membrane.potential));
            }
            if events.contains(&SimEvent::LigandReleased { slot: 3 }) {
                released_at = Some(i);
                break;
            }
        }
        let (bound_at, released_at) = (bound_at.unwrap(), released_at.unwrap());
        let held = (released_at - bound_at) as f64 * dt;
        assert!(held >= params.ligand_binding_duration - 1e-9);
        // Closed again, ligand free and walking.
        assert!(!state.membrane.slots[3]
            .protein
            .as_ref()
            .unwrap()
            .is_open_to(SoluteType::Sodium, state.membrane.potential));
        assert!(matches!(
            state.particles[0].mode,
            ParticleMode::RandomWalk { .. }
        ));
        assert!(state.membrane.occupancy.is_site_free(3, BindingSite::Ligand));
    }

    #[test]
    fn test_deleting_bound_ligand_closes_channel() {
        let params = SimParams::default();
        let mut state = SimState::new(&params, Pcg64Mcg::seed_from_u64(4));
        state.set_slot_protein(2, Some(ProteinType::PotassiumLigandGatedChannel));
        let id = state.spawn_particle(
            SoluteType::LigandB,
            Point2::new(-25.0, 6.5),
            ParticleMode::MoveToLigandBindingSite { slot: 2 },
        );
        state.rebuild_occupancy();
        for _ in 0..40 {
            let events = step(&params, &mut state, 0.05);
            if events.contains(&SimEvent::LigandBound { slot: 2 }) {
                break;
            }
        }
        state.remove_particle(id);
        step(&params, &mut state, 0.05);
        match state.membrane.slots[2].protein.as_ref() {
            Some(TransportProtein::LigandGated(c)) => assert!(c.bound.is_none()),
            _ => panic!("channel missing"),
        }
    }

    #[test]
    fn test_cotransporter_full_cycle() {
        let params = SimParams::default();
        let mut state = SimState::new(&params, Pcg64Mcg::seed_from_u64(5));
        state.set_slot_protein(3, Some(ProteinType::SodiumGlucoseCotransporter));
        let slot_x = state.membrane.slots[3].x;
        for site in [
            BindingSite::CotransporterSodium1,
            BindingSite::CotransporterSodium2,
        ] {
            state.spawn_particle(
                SoluteType::Sodium,
                Point2::new(slot_x, 0.0) + site.offset(),
                ParticleMode::WaitingInCotransporter { slot: 3, site },
            );
        }
        // Two of three sites filled: stays closed.
        step(&params, &mut state, 0.05);
        match state.membrane.slots[3].protein.as_ref() {
            Some(TransportProtein::Cotransporter(c)) => assert!(!c.open),
            _ => panic!("cotransporter missing"),
        }

        state.spawn_particle(
            SoluteType::Glucose,
            Point2::new(slot_x, 0.0) + BindingSite::CotransporterGlucose.offset(),
            ParticleMode::WaitingInCotransporter {
                slot: 3,
                site: BindingSite::CotransporterGlucose,
            },
        );
        let events = step(&params, &mut state, 0.05);
        assert!(events.contains(&SimEvent::CotransporterOpened { slot: 3 }));
        for p in &state.particles {
            assert!(matches!(
                p.mode,
                ParticleMode::MovingThroughProtein {
                    slot: 3,
                    direction: CrossingDirection::Inward,
                    ..
                }
            ));
        }

        // Run until every passenger is out; the last one closes the door.
        let mut closed = false;
        for _ in 0..2000 {
            let events = step(&params, &mut state, 0.05);
            if events.contains(&SimEvent::CotransporterClosed { slot: 3 }) {
                closed = true;
                break;
            }
        }
        assert!(closed);
        assert_eq!(state.count_solutes(SoluteType::Sodium, Side::Inside), 2);
        assert_eq!(state.count_solutes(SoluteType::Glucose, Side::Inside), 1);
        assert!(state.membrane.occupancy.is_solute_free(3));
        match state.membrane.slots[3].protein.as_ref() {
            Some(TransportProtein::Cotransporter(c)) => assert!(!c.open),
            _ => panic!("cotransporter missing"),
        }
    }
}
