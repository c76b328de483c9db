use log::debug;
use nalgebra::{Point2, Vector2};
use rand::Rng;
use rand_pcg::Pcg64Mcg;

use crate::config::setup::parameters::simulation::SimParams;
use crate::geometry::{blend_direction, random_unit_vector, random_unit_vector_away};
use crate::membrane::occupancy::{COTRANSPORTER_SODIUM_SITES, PUMP_POTASSIUM_SITES, PUMP_SODIUM_SITES};
use crate::membrane::{
    BindingSite, Membrane, PumpState, Side, TransportProtein,
};
use crate::state::{
    CrossingDirection, Particle, ParticleMode, SimEvent, SoluteType, TURN_DURATION_RANGE,
    TURN_INTERVAL_RANGE,
};

// How far a traversing particle may stray from the protein center line.
const TRAVERSAL_LATERAL_BAND: f64 = 1.5;
// Horizontal jitter while diffusing or traversing, as a fraction of speed.
const TRAVERSAL_JITTER: f64 = 0.35;
// Extra clearance past the membrane band before a crossing counts as done.
const CLEAR_MARGIN: f64 = 1.0;

pub struct ParticleCtx<'a> {
    pub params: &'a SimParams,
    pub membrane: &'a mut Membrane,
    pub rng: &'a mut Pcg64Mcg,
    pub events: &'a mut Vec<SimEvent>,
}

/// Advances one particle by `dt`, consulting the membrane for interaction
/// eligibility. Mode transitions happen synchronously here, so a binding
/// site claimed by this particle is visible to every particle stepped after
/// it within the same tick.
pub fn step_particle(p: &mut Particle, dt: f64, ctx: &mut ParticleCtx) {
    if let Some(t) = p.time_since_crossing.as_mut() {
        *t += dt;
    }
    step_fade(p, dt, ctx.params);
    match p.mode {
        ParticleMode::RandomWalk { .. } => step_random_walk(p, dt, ctx),
        ParticleMode::PassiveDiffusion { direction } => {
            step_crossing(p, dt, None, direction, 0.0, ctx)
        }
        ParticleMode::MovingThroughProtein { slot, direction, offset } => {
            step_crossing(p, dt, Some(slot), direction, offset, ctx)
        }
        ParticleMode::MoveToChannelCenter { slot } => step_move_to_channel(p, dt, slot, ctx),
        ParticleMode::EnteringProtein { slot, direction } => {
            let target = Point2::new(
                ctx.membrane.slots[slot].x,
                direction.origin().sign() * ctx.params.world.membrane_half_thickness * 0.6,
            );
            if move_toward(p, target, ctx.params.particle_speed * dt) {
                p.set_mode(
                    ParticleMode::SheddingCagedWater {
                        slot,
                        direction,
                        remaining: ctx.params.water_shedding_duration,
                    },
                    &mut ctx.membrane.occupancy,
                );
            }
        }
        ParticleMode::SheddingCagedWater { slot, direction, remaining } => {
            // Immobile while the hydration shell comes off.
            let remaining = remaining - dt;
            if remaining <= 0.0 {
                p.set_mode(
                    ParticleMode::MovingThroughProtein { slot, direction, offset: 0.0 },
                    &mut ctx.membrane.occupancy,
                );
            } else {
                p.mode = ParticleMode::SheddingCagedWater { slot, direction, remaining };
            }
        }
        ParticleMode::MoveToLigandBindingSite { slot } => {
            step_move_to_ligand_site(p, dt, slot, ctx)
        }
        ParticleMode::MoveToCotransporter { slot, site } => {
            if step_move_to_site(p, dt, slot, site, ctx) {
                p.set_mode(
                    ParticleMode::WaitingInCotransporter { slot, site },
                    &mut ctx.membrane.occupancy,
                );
            }
        }
        ParticleMode::MoveToPump { slot, site } => {
            if step_move_to_site(p, dt, slot, site, ctx) {
                p.set_mode(
                    ParticleMode::WaitingInPump { slot, site },
                    &mut ctx.membrane.occupancy,
                );
            }
        }
        // Held in place; the owning protein decides what happens next.
        ParticleMode::LigandBound { .. }
        | ParticleMode::WaitingInCotransporter { .. }
        | ParticleMode::WaitingInPump { .. } => {}
        // Position is controlled externally while the user drags.
        ParticleMode::UserControlled | ParticleMode::UserOver => {}
    }
}

fn step_fade(p: &mut Particle, dt: f64, params: &SimParams) {
    if let Some(c) = p.fade_countdown.as_mut() {
        *c -= dt;
        if *c <= 0.0 {
            p.opacity = (p.opacity - params.fade_rate * dt).max(0.0);
        }
    } else if params.glucose_metabolism
        && p.kind == SoluteType::Glucose
        && p.position.y < 0.0
        && params
            .world
            .clear_of_membrane(p.position.y, p.kind.radius(), 0.0)
    {
        debug!("glucose {} metabolizing", p.id.0);
        p.fade_countdown = Some(0.0);
    }
}

fn step_random_walk(p: &mut Particle, dt: f64, ctx: &mut ParticleCtx) {
    let ParticleMode::RandomWalk {
        mut direction,
        mut target,
        mut turn_duration,
        mut time_until_turn,
    } = p.mode
    else {
        return;
    };

    time_until_turn -= dt;
    if time_until_turn <= 0.0 {
        target = random_unit_vector(ctx.rng);
        turn_duration = ctx.rng.gen_range(TURN_DURATION_RANGE.0..TURN_DURATION_RANGE.1);
        time_until_turn = ctx.rng.gen_range(TURN_INTERVAL_RANGE.0..TURN_INTERVAL_RANGE.1);
    }
    direction = blend_direction(direction, target, dt / turn_duration);

    // Transport proteins capture walkers first; the membrane barrier only
    // applies if nothing claimed the particle.
    if p.crossing_cooldown_elapsed(ctx.params.crossing_cooldown) {
        if let Some(mode) = find_interaction(p, ctx) {
            debug!("particle {} captured: {:?}", p.id.0, mode);
            p.set_mode(mode, &mut ctx.membrane.occupancy);
            return;
        }
    }

    let side = p.side();
    let r = p.kind.radius();
    let world = &ctx.params.world;
    if world.touches_membrane(p.position.y, r) {
        if p.kind.is_gas()
            && ctx.rng.gen::<f64>() < ctx.params.passive_diffusion_probability
        {
            p.set_mode(
                ParticleMode::PassiveDiffusion {
                    direction: CrossingDirection::from_side(side),
                },
                &mut ctx.membrane.occupancy,
            );
            return;
        }
        // The membrane is a barrier to everything else: push the particle
        // back out and flip its vertical heading.
        let edge = side.sign() * (world.membrane_half_thickness + r);
        p.position.y = 2.0 * edge - p.position.y;
        direction.y = direction.y.abs() * side.sign();
        ctx.events.push(SimEvent::MembraneReflect { particle: p.id });
    }

    p.position += direction * ctx.params.particle_speed * dt;

    // Reflect off the outer three walls of this side's region; the membrane
    // face is handled by the barrier logic above, so it is left open here.
    let mut region = world.region(side).shrink(r);
    match side {
        Side::Outside => region.min.y = f64::NEG_INFINITY,
        Side::Inside => region.max.y = f64::INFINITY,
    }
    if region.reflect(&mut p.position, &mut direction) {
        ctx.events.push(SimEvent::WallBounce { particle: p.id });
    }

    p.mode = ParticleMode::RandomWalk {
        direction,
        target,
        turn_duration,
        time_until_turn,
    };
}

/// Finds the first eligible protein interaction for a random-walking
/// particle, in fixed priority order: ligand binding, then channel entry,
/// then the cotransporter, then the pump's sodium, ATP, and potassium sites.
fn find_interaction(p: &Particle, ctx: &ParticleCtx) -> Option<ParticleMode> {
    let membrane = &*ctx.membrane;
    let side = p.side();
    let in_range = |slot_x: f64| {
        (p.position - Point2::new(slot_x, 0.0)).norm() <= ctx.params.capture_radius
    };

    if p.kind.is_ligand() {
        for (i, slot) in membrane.slots.iter().enumerate() {
            if !in_range(slot.x) {
                continue;
            }
            if let Some(TransportProtein::LigandGated(c)) = &slot.protein {
                if c.ligand_kind() == p.kind
                    && c.bound.is_none()
                    && membrane.occupancy.is_site_free(i, BindingSite::Ligand)
                {
                    return Some(ParticleMode::MoveToLigandBindingSite { slot: i });
                }
            }
        }
        return None;
    }

    if matches!(p.kind, SoluteType::Sodium | SoluteType::Potassium) {
        for (i, slot) in membrane.slots.iter().enumerate() {
            if !in_range(slot.x) {
                continue;
            }
            if let Some(protein) = &slot.protein {
                if protein.is_open_to(p.kind, membrane.potential)
                    && membrane.occupancy.is_solute_free(i)
                {
                    return Some(ParticleMode::MoveToChannelCenter { slot: i });
                }
            }
        }
    }

    if side == Side::Outside && matches!(p.kind, SoluteType::Sodium | SoluteType::Glucose) {
        for (i, slot) in membrane.slots.iter().enumerate() {
            if !in_range(slot.x) {
                continue;
            }
            if let Some(TransportProtein::Cotransporter(c)) = &slot.protein {
                if c.open {
                    continue;
                }
                if p.kind == SoluteType::Sodium {
                    for site in COTRANSPORTER_SODIUM_SITES {
                        if membrane.occupancy.is_site_free(i, site) {
                            return Some(ParticleMode::MoveToCotransporter { slot: i, site });
                        }
                    }
                } else if membrane
                    .occupancy
                    .is_site_free(i, BindingSite::CotransporterGlucose)
                {
                    return Some(ParticleMode::MoveToCotransporter {
                        slot: i,
                        site: BindingSite::CotransporterGlucose,
                    });
                }
            }
        }
    }

    if side == Side::Inside && p.kind == SoluteType::Sodium {
        for (i, slot) in membrane.slots.iter().enumerate() {
            if !in_range(slot.x) {
                continue;
            }
            if let Some(TransportProtein::Pump(pump)) = &slot.protein {
                if pump.state == PumpState::OpenToInsideEmpty {
                    for site in PUMP_SODIUM_SITES {
                        if membrane.occupancy.is_site_free(i, site) {
                            return Some(ParticleMode::MoveToPump { slot: i, site });
                        }
                    }
                }
            }
        }
    }

    if side == Side::Inside && p.kind == SoluteType::Atp {
        for (i, slot) in membrane.slots.iter().enumerate() {
            if !in_range(slot.x) {
                continue;
            }
            if let Some(TransportProtein::Pump(pump)) = &slot.protein {
                if pump.state == PumpState::OpenToInsideSodiumBound
                    && membrane.occupancy.is_site_free(i, BindingSite::PumpAtp)
                {
                    return Some(ParticleMode::MoveToPump {
                        slot: i,
                        site: BindingSite::PumpAtp,
                    });
                }
            }
        }
    }

    if side == Side::Outside && p.kind == SoluteType::Potassium {
        for (i, slot) in membrane.slots.iter().enumerate() {
            if !in_range(slot.x) {
                continue;
            }
            if let Some(TransportProtein::Pump(pump)) = &slot.protein {
                if pump.state == PumpState::OpenToOutsideAwaitingPotassium {
                    for site in PUMP_POTASSIUM_SITES {
                        if membrane.occupancy.is_site_free(i, site) {
                            return Some(ParticleMode::MoveToPump { slot: i, site });
                        }
                    }
                }
            }
        }
    }

    None
}

/// Shared motion for passive diffusion (no slot) and protein traversal
/// (clamped to the protein's center line): mostly vertical, with horizontal
/// jitter. Ends on the far side once fully clear of the band.
fn step_crossing(
    p: &mut Particle,
    dt: f64,
    slot: Option<usize>,
    direction: CrossingDirection,
    offset: f64,
    ctx: &mut ParticleCtx,
) {
    let speed = ctx.params.particle_speed;
    let r = p.kind.radius();
    p.position.y += direction.y_sign() * speed * dt;
    let jitter: f64 = ctx.rng.gen_range(-1.0..1.0) * speed * TRAVERSAL_JITTER;
    p.position.x += jitter * dt;
    match slot {
        Some(i) => {
            let cx = ctx.membrane.slots[i].x + offset;
            p.position.x = p
                .position
                .x
                .clamp(cx - TRAVERSAL_LATERAL_BAND, cx + TRAVERSAL_LATERAL_BAND);
        }
        None => {
            let hw = ctx.params.world.half_width;
            p.position.x = p.position.x.clamp(-hw + r, hw - r);
        }
    }

    let dest = direction.destination();
    if Side::of(p.position.y) == dest
        && ctx.params.world.clear_of_membrane(p.position.y, r, CLEAR_MARGIN)
    {
        let away = random_unit_vector_away(ctx.rng, dest.sign());
        p.set_mode(
            ParticleMode::random_walk_with(ctx.rng, away),
            &mut ctx.membrane.occupancy,
        );
        // The last particle out closes the cotransporter behind it.
        if let Some(i) = slot {
            if ctx.membrane.occupancy.traversal_count(i) == 0 {
                if let Some(TransportProtein::Cotransporter(c)) =
                    ctx.membrane.slots[i].protein.as_mut()
                {
                    if c.open {
                        c.open = false;
                        ctx.events.push(SimEvent::CotransporterClosed { slot: i });
                    }
                }
            }
        }
    }
}

fn step_move_to_channel(p: &mut Particle, dt: f64, slot: usize, ctx: &mut ParticleCtx) {
    let side = p.side();
    let r = p.kind.radius();
    let target = Point2::new(
        ctx.membrane.slots[slot].x,
        side.sign() * (ctx.params.world.membrane_half_thickness + r),
    );
    if !move_toward(p, target, ctx.params.particle_speed * dt) {
        return;
    }
    // The channel may have closed on the way in (voltage change, ligand
    // release); re-check before committing to entry.
    let still_open = ctx.membrane.slots[slot]
        .protein
        .as_ref()
        .map_or(false, |protein| protein.is_open_to(p.kind, ctx.membrane.potential));
    if still_open {
        p.set_mode(
            ParticleMode::EnteringProtein {
                slot,
                direction: CrossingDirection::from_side(side),
            },
            &mut ctx.membrane.occupancy,
        );
    } else {
        release_to_walk(p, ctx, side.sign());
    }
}

fn step_move_to_ligand_site(p: &mut Particle, dt: f64, slot: usize, ctx: &mut ParticleCtx) {
    let slot_x = ctx.membrane.slots[slot].x;
    let target = Point2::new(slot_x, 0.0) + BindingSite::Ligand.offset();
    if !move_toward(p, target, ctx.params.particle_speed * dt) {
        return;
    }
    let binding_duration = ctx.params.ligand_binding_duration;
    let bound = match ctx.membrane.slots[slot].protein.as_mut() {
        Some(TransportProtein::LigandGated(c)) if c.bound.is_none() => {
            c.bound = Some(crate::membrane::protein::BoundLigand {
                ligand: p.id,
                remaining: binding_duration,
            });
            true
        }
        _ => false,
    };
    if bound {
        p.set_mode(ParticleMode::LigandBound { slot }, &mut ctx.membrane.occupancy);
        ctx.events.push(SimEvent::LigandBound { slot });
    } else {
        release_to_walk(p, ctx, Side::Outside.sign());
    }
}

/// Moves toward a binding-site position; returns true on arrival.
fn step_move_to_site(
    p: &mut Particle,
    dt: f64,
    slot: usize,
    site: BindingSite,
    ctx: &mut ParticleCtx,
) -> bool {
    let target = Point2::new(ctx.membrane.slots[slot].x, 0.0) + site.offset();
    move_toward(p, target, ctx.params.particle_speed * dt)
}

fn release_to_walk(p: &mut Particle, ctx: &mut ParticleCtx, y_sign: f64) {
    let away = random_unit_vector_away(ctx.rng, y_sign);
    p.set_mode(
        ParticleMode::random_walk_with(ctx.rng, away),
        &mut ctx.membrane.occupancy,
    );
}

/// Straight-line motion toward `target`, at most `max_dist` this step.
/// Returns true once the target is reached (and snaps onto it).
fn move_toward(p: &mut Particle, target: Point2<f64>, max_dist: f64) -> bool {
    let delta: Vector2<f64> = target - p.position;
    let dist = delta.norm();
    if dist <= max_dist {
        p.position = target;
        true
    } else {
        p.position += delta * (max_dist / dist);
        false
    }
}
