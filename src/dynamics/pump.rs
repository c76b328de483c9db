use log::debug;
use nalgebra::Point2;

use super::{all_waiting, any_vacant, spawn_into, waiting_particle, ProteinCtx};
use crate::membrane::occupancy::{PUMP_POTASSIUM_SITES, PUMP_SODIUM_SITES};
use crate::membrane::{BindingSite, PumpState, SodiumPotassiumPump};
use crate::state::{CrossingDirection, ParticleMode, SimEvent, SoluteType};

/// Advances the pump's conformational cycle by one step. Forward transitions
/// require their binding-site precondition, and all but the two
/// site-completion transitions additionally require the dwell interval in the
/// current state. Backward transitions only exist to recover from the user
/// deleting a particle out of a required site.
pub fn step_pump(
    pump: &mut SodiumPotassiumPump,
    slot: usize,
    slot_x: f64,
    dt: f64,
    ctx: &mut ProteinCtx,
) {
    pump.time_in_state += dt;
    let dwell_ok = pump.time_in_state >= ctx.params.pump_state_transition_interval;

    let next = match pump.state {
        PumpState::OpenToInsideEmpty => {
            // Fires the same step the third sodium settles in.
            all_waiting(ctx, slot, &PUMP_SODIUM_SITES)
                .then_some(PumpState::OpenToInsideSodiumBound)
        }
        PumpState::OpenToInsideSodiumBound => {
            if any_vacant(ctx, slot, &PUMP_SODIUM_SITES) {
                Some(PumpState::OpenToInsideEmpty)
            } else if dwell_ok && waiting_particle(ctx, slot, BindingSite::PumpAtp).is_some() {
                Some(PumpState::OpenToInsideSodiumAndAtpBound)
            } else {
                None
            }
        }
        PumpState::OpenToInsideSodiumAndAtpBound => {
            if ctx.occupancy.occupant(slot, BindingSite::PumpAtp).is_none() {
                Some(PumpState::OpenToInsideSodiumBound)
            } else if dwell_ok && split_atp(ctx, slot, slot_x) {
                Some(PumpState::OpenToInsideSodiumAndPhosphateBound)
            } else {
                None
            }
        }
        PumpState::OpenToInsideSodiumAndPhosphateBound => {
            if dwell_ok
                && waiting_particle(ctx, slot, BindingSite::PumpPhosphate).is_some()
            {
                release_sodium(ctx, slot);
                Some(PumpState::OpenToOutsideAwaitingPotassium)
            } else {
                None
            }
        }
        PumpState::OpenToOutsideAwaitingPotassium => {
            all_waiting(ctx, slot, &PUMP_POTASSIUM_SITES)
                .then_some(PumpState::OpenToOutsidePotassiumBound)
        }
        PumpState::OpenToOutsidePotassiumBound => {
            if any_vacant(ctx, slot, &PUMP_POTASSIUM_SITES) {
                Some(PumpState::OpenToOutsideAwaitingPotassium)
            } else if dwell_ok {
                release_potassium_and_phosphate(ctx, slot);
                Some(PumpState::OpenToInsideEmpty)
            } else {
                None
            }
        }
    };

    if let Some(state) = next {
        pump.set_state(state);
        ctx.events.push(SimEvent::PumpStateChanged { slot, state });
    }
}

/// Splits the waiting ATP into ADP (released free) and phosphate (bound at
/// the phosphate site). Returns false if the ATP has not arrived yet.
fn split_atp(ctx: &mut ProteinCtx, slot: usize, slot_x: f64) -> bool {
    let atp_idx = match waiting_particle(ctx, slot, BindingSite::PumpAtp) {
        Some(idx) => idx,
        None => return false,
    };
    let atp = ctx.particles.remove(atp_idx);
    debug_assert_eq!(atp.kind, SoluteType::Atp);
    ctx.occupancy
        .release(crate::membrane::Reservation::Site(slot, BindingSite::PumpAtp), atp.id);

    let adp_mode = ParticleMode::random_walk(ctx.rng);
    spawn_into(ctx, SoluteType::Adp, atp.position, adp_mode);
    let phosphate_pos = Point2::new(slot_x, 0.0) + BindingSite::PumpPhosphate.offset();
    spawn_into(
        ctx,
        SoluteType::Phosphate,
        phosphate_pos,
        ParticleMode::WaitingInPump {
            slot,
            site: BindingSite::PumpPhosphate,
        },
    );
    debug!("pump at slot {slot} split ATP");
    ctx.events.push(SimEvent::AtpSplit { slot });
    true
}

/// Releases the three bound sodiums outward through the pump, with small
/// lateral offsets so they do not overlap perfectly.
fn release_sodium(ctx: &mut ProteinCtx, slot: usize) {
    for (k, site) in PUMP_SODIUM_SITES.iter().enumerate() {
        if let Some(idx) = waiting_particle(ctx, slot, *site) {
            let offset = (k as f64 - 1.0) * 2.0;
            let p = &mut ctx.particles[idx];
            p.set_mode(
                ParticleMode::MovingThroughProtein {
                    slot,
                    direction: CrossingDirection::Outward,
                    offset,
                },
                ctx.occupancy,
            );
        }
    }
}

/// Releases the two bound potassiums inward and lets the spent phosphate go,
/// nudged away from the pump to float off and fade.
fn release_potassium_and_phosphate(ctx: &mut ProteinCtx, slot: usize) {
    for (k, site) in PUMP_POTASSIUM_SITES.iter().enumerate() {
        if let Some(idx) = waiting_particle(ctx, slot, *site) {
            let offset = (k as f64 - 0.5) * 3.0;
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
    if let Some(idx) = waiting_particle(ctx, slot, BindingSite::PumpPhosphate) {
        let linger = ctx.params.phosphate_linger_duration;
        let away = crate::geometry::random_unit_vector_away(ctx.rng, -1.0);
        let mode = ParticleMode::random_walk_with(ctx.rng, away);
        let p = &mut ctx.particles[idx];
        p.set_mode(mode, ctx.occupancy);
        p.fade_countdown = Some(linger);
    }
}
