pub mod flux;
pub mod particle;
pub mod protein;
pub mod pump;

use log::debug;
use nalgebra::Point2;
use rand_pcg::Pcg64Mcg;

use crate::checkpoint::CheckpointWriter;
use crate::config::run::RunConfig;
use crate::config::setup::parameters::simulation::SimParams;
use crate::membrane::{BindingSite, OccupancyMap, TransportProtein};
use crate::state::{
    CrossingDirection, Particle, ParticleId, ParticleMode, SimEvent, SimState, SoluteType,
    StepSummary,
};

use particle::ParticleCtx;

/// What a protein step function is allowed to touch: the particle population
/// (to move waiters through, consume ATP, spawn products), the reservation
/// table, and the event sink. Deliberately not the whole state.
pub struct ProteinCtx<'a> {
    pub params: &'a SimParams,
    pub particles: &'a mut Vec<Particle>,
    pub occupancy: &'a mut OccupancyMap,
    pub next_particle_id: &'a mut u64,
    pub rng: &'a mut Pcg64Mcg,
    pub events: &'a mut Vec<SimEvent>,
}

/// Spawns a particle from within a protein step, mirroring
/// `SimState::spawn_particle`.
pub(crate) fn spawn_into(
    ctx: &mut ProteinCtx,
    kind: SoluteType,
    position: Point2<f64>,
    mode: ParticleMode,
) -> ParticleId {
    let id = ParticleId(*ctx.next_particle_id);
    *ctx.next_particle_id += 1;
    if let Some(res) = mode.reservation() {
        ctx.occupancy.reserve(res, id);
    }
    ctx.particles.push(Particle {
        id,
        kind,
        position,
        opacity: 1.0,
        time_since_crossing: None,
        fade_countdown: None,
        mode,
    });
    id
}

/// Index of the particle waiting in a site, if the site's reservation holder
/// has actually arrived (a particle still moving toward the site does not
/// satisfy a protein's precondition).
pub(crate) fn waiting_particle(ctx: &ProteinCtx, slot: usize, site: BindingSite) -> Option<usize> {
    let id = ctx.occupancy.occupant(slot, site)?;
    let idx = ctx.particles.iter().position(|p| p.id == id)?;
    ctx.particles[idx]
        .mode
        .is_waiting_at(slot, site)
        .then_some(idx)
}

pub(crate) fn all_waiting(ctx: &ProteinCtx, slot: usize, sites: &[BindingSite]) -> bool {
    sites.iter().all(|&s| waiting_particle(ctx, slot, s).is_some())
}

/// A site with no reservation at all, i.e. its occupant was deleted.
pub(crate) fn any_vacant(ctx: &ProteinCtx, slot: usize, sites: &[BindingSite]) -> bool {
    sites.iter().any(|&s| ctx.occupancy.occupant(slot, s).is_none())
}

/// Advances the whole simulation by one frame: particles first, then the
/// proteins, then the aggregates. `frame_dt` is wall-clock frame time; the
/// state's time-speed factor and pause flag are applied here.
pub fn update(params: &SimParams, state: &mut SimState, frame_dt: f64) -> StepSummary {
    let mut summary = StepSummary::default();
    if state.paused || frame_dt <= 0.0 {
        return summary;
    }
    let dt = frame_dt * state.time_speed;

    // Particle phase. Crossings are detected as a side change over the step
    // so that every path across (channel, pump, passive diffusion) feeds the
    // flux tracker through the same observation.
    {
        let SimState {
            particles,
            membrane,
            flux,
            t,
            rng,
            ..
        } = state;
        let t_now = *t;
        let mut ctx = ParticleCtx {
            params,
            membrane,
            rng,
            events: &mut summary.events,
        };
        for p in particles.iter_mut() {
            let side_before = p.side();
            particle::step_particle(p, dt, &mut ctx);
            let side_after = p.side();
            if side_after != side_before {
                let direction = CrossingDirection::from_side(side_before);
                debug!("particle {} crossed {direction}", p.id.0);
                flux.record(p.kind, t_now, direction);
                ctx.events.push(SimEvent::SoluteCrossed {
                    kind: p.kind,
                    direction,
                });
                p.time_since_crossing = Some(0.0);
                // Spent phosphate lingers briefly, then fades out.
                if p.kind == SoluteType::Phosphate && p.fade_countdown.is_none() {
                    p.fade_countdown = Some(params.phosphate_linger_duration);
                }
            }
        }
    }

    // Protein phase. Each protein is lifted out of its slot so its step
    // function can freely inspect and mutate the rest of the state.
    {
        let SimState {
            particles,
            membrane,
            rng,
            next_particle_id,
            ..
        } = state;
        for i in 0..membrane.slots.len() {
            let mut lifted = match membrane.slots[i].protein.take() {
                Some(p) => p,
                None => continue,
            };
            let slot_x = membrane.slots[i].x;
            let mut ctx = ProteinCtx {
                params,
                particles: &mut *particles,
                occupancy: &mut membrane.occupancy,
                next_particle_id: &mut *next_particle_id,
                rng: &mut *rng,
                events: &mut summary.events,
            };
            match &mut lifted {
                TransportProtein::Pump(pump) => pump::step_pump(pump, i, slot_x, dt, &mut ctx),
                TransportProtein::LigandGated(channel) => {
                    protein::step_ligand_gated(channel, i, dt, &mut ctx)
                }
                TransportProtein::Cotransporter(cotransporter) => {
                    protein::step_cotransporter(cotransporter, i, &mut ctx)
                }
                TransportProtein::Leakage { .. } | TransportProtein::VoltageGated { .. } => {}
            }
            membrane.slots[i].protein = Some(lifted);
        }
    }

    // Fully faded particles are gone.
    let faded: Vec<ParticleId> = state
        .particles
        .iter()
        .filter(|p| p.opacity <= 0.0)
        .map(|p| p.id)
        .collect();
    for id in faded {
        debug!("removing faded particle {}", id.0);
        state.remove_particle(id);
    }

    state.t += dt;
    state.step += 1;
    let t = state.t;
    state.flux.step(t, dt);
    summary
}

/// Headless run loop: steps at the configured dt until `t_max`, periodically
/// writing checkpoints.
pub fn run(
    params: &SimParams,
    state: &mut SimState,
    run_config: &RunConfig,
    mut writer: Option<&mut CheckpointWriter>,
) -> std::io::Result<()> {
    while state.t < run_config.t_max {
        update(params, state, params.dt);

        if state.step % run_config.dstep_checkpoint == 0 {
            println!(
                "CHECKPOINT: step={}, t = {:.2}, particles = {}",
                state.step,
                state.t,
                state.particles.len()
            );
            if let Some(w) = writer.as_deref_mut() {
                w.write(state)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membrane::{ProteinType, Side};
    use rand::SeedableRng;

    #[test]
    fn test_paused_state_does_not_advance() {
        let params = SimParams::default();
        let mut state = SimState::new(&params, Pcg64Mcg::seed_from_u64(1));
        state.add_solutes(&params, SoluteType::Oxygen, Side::Outside, 5);
        state.paused = true;
        let positions: Vec<_> = state.particles.iter().map(|p| p.position).collect();
        let summary = update(&params, &mut state, 1.0 / 60.0);
        assert!(summary.events.is_empty());
        assert_eq!(state.step, 0);
        for (p, before) in state.particles.iter().zip(&positions) {
            assert_eq!(p.position, *before);
        }
    }

    #[test]
    fn test_time_speed_scales_the_step() {
        let params = SimParams::default();
        let mut state = SimState::new(&params, Pcg64Mcg::seed_from_u64(2));
        state.time_speed = 0.5;
        update(&params, &mut state, 1.0 / 60.0);
        approx::assert_relative_eq!(state.t, 0.5 / 60.0);
        assert_eq!(state.step, 1);
    }

    #[test]
    fn test_update_is_deterministic_for_a_seed() {
        let params = SimParams::default();
        let build = || {
            let mut s = SimState::new(&params, Pcg64Mcg::seed_from_u64(1234));
            s.set_slot_protein(3, Some(ProteinType::SodiumLeakageChannel));
            s.add_solutes(&params, SoluteType::Sodium, Side::Outside, 40);
            s.add_solutes(&params, SoluteType::Oxygen, Side::Outside, 20);
            s
        };
        let mut a = build();
        let mut b = build();
        for _ in 0..600 {
            update(&params, &mut a, 1.0 / 60.0);
            update(&params, &mut b, 1.0 / 60.0);
        }
        assert_eq!(a.particles.len(), b.particles.len());
        for (pa, pb) in a.particles.iter().zip(&b.particles) {
            assert_eq!(pa.id, pb.id);
            assert_eq!(pa.position, pb.position);
            assert_eq!(pa.mode, pb.mode);
        }
    }
}
