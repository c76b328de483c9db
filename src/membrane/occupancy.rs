use std::collections::HashMap;

use nalgebra::Vector2;

use crate::state::ParticleId;

/// A named binding site on a transport protein. Sites are exclusive: at most
/// one particle may hold a reservation for a given `(slot, site)` pair,
/// whether it is still moving toward the site or already waiting in it.
#[derive(
    serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
)]
pub enum BindingSite {
    /// Ligand binding site at the extracellular mouth of a ligand-gated channel.
    Ligand,
    PumpSodium1,
    PumpSodium2,
    PumpSodium3,
    PumpPotassium1,
    PumpPotassium2,
    PumpAtp,
    PumpPhosphate,
    CotransporterSodium1,
    CotransporterSodium2,
    CotransporterGlucose,
}

impl BindingSite {
    /// Site position relative to the slot center on the membrane centerline.
    pub fn offset(self) -> Vector2<f64> {
        match self {
            BindingSite::Ligand => Vector2::new(0.0, 6.0),
            BindingSite::PumpSodium1 => Vector2::new(-4.0, -6.0),
            BindingSite::PumpSodium2 => Vector2::new(0.0, -7.0),
            BindingSite::PumpSodium3 => Vector2::new(4.0, -6.0),
            BindingSite::PumpPotassium1 => Vector2::new(-3.0, 7.0),
            BindingSite::PumpPotassium2 => Vector2::new(3.0, 7.0),
            BindingSite::PumpAtp => Vector2::new(7.0, -8.0),
            BindingSite::PumpPhosphate => Vector2::new(4.0, -9.0),
            BindingSite::CotransporterSodium1 => Vector2::new(-4.0, 7.0),
            BindingSite::CotransporterSodium2 => Vector2::new(4.0, 7.0),
            BindingSite::CotransporterGlucose => Vector2::new(0.0, 8.0),
        }
    }

}

pub const PUMP_SODIUM_SITES: [BindingSite; 3] = [
    BindingSite::PumpSodium1,
    BindingSite::PumpSodium2,
    BindingSite::PumpSodium3,
];

pub const PUMP_POTASSIUM_SITES: [BindingSite; 2] =
    [BindingSite::PumpPotassium1, BindingSite::PumpPotassium2];

pub const COTRANSPORTER_SODIUM_SITES: [BindingSite; 2] = [
    BindingSite::CotransporterSodium1,
    BindingSite::CotransporterSodium2,
];

/// What a particle mode holds on the membrane: either an exclusive binding
/// site, or a (shareable) passage through a protein's pore. Several particles
/// may traverse one protein at once when a pump releases its cargo, so pore
/// passage is a count, not an exclusive claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reservation {
    Site(usize, BindingSite),
    Traversal(usize),
}

/// Explicit reservation table keyed by `(slot, site)`, updated transactionally
/// whenever a particle mode is assigned or cleared. This replaces re-scanning
/// every particle's mode at each decision point while preserving the
/// at-most-one-occupant-per-site invariant.
#[derive(Clone, Debug, Default)]
pub struct OccupancyMap {
    sites: HashMap<(usize, BindingSite), ParticleId>,
    traversals: HashMap<usize, u32>,
}

impl OccupancyMap {
    pub fn reserve(&mut self, reservation: Reservation, id: ParticleId) {
        match reservation {
            Reservation::Site(slot, site) => {
                let prev = self.sites.insert((slot, site), id);
                debug_assert!(
                    prev.is_none() || prev == Some(id),
                    "binding site {:?} at slot {} already occupied",
                    site,
                    slot
                );
            }
            Reservation::Traversal(slot) => {
                *self.traversals.entry(slot).or_insert(0) += 1;
            }
        }
    }

    pub fn release(&mut self, reservation: Reservation, id: ParticleId) {
        match reservation {
            Reservation::Site(slot, site) => {
                let prev = self.sites.remove(&(slot, site));
                debug_assert_eq!(prev, Some(id));
            }
            Reservation::Traversal(slot) => {
                if let Some(n) = self.traversals.get_mut(&slot) {
                    *n = n.saturating_sub(1);
                    if *n == 0 {
                        self.traversals.remove(&slot);
                    }
                }
            }
        }
    }

    pub fn occupant(&self, slot: usize, site: BindingSite) -> Option<ParticleId> {
        self.sites.get(&(slot, site)).copied()
    }

    pub fn is_site_free(&self, slot: usize, site: BindingSite) -> bool {
        !self.sites.contains_key(&(slot, site))
    }

    pub fn traversal_count(&self, slot: usize) -> u32 {
        self.traversals.get(&slot).copied().unwrap_or(0)
    }

    /// True iff no solute references the slot: nothing is traversing the pore
    /// and no site other than the ligand site is claimed. A bound ligand does
    /// not block ions from using its channel.
    pub fn is_solute_free(&self, slot: usize) -> bool {
        self.traversal_count(slot) == 0
            && !self
                .sites
                .keys()
                .any(|&(s, site)| s == slot && site != BindingSite::Ligand)
    }

    /// Exclusive-site occupants of a slot, for slot teardown.
    pub fn slot_occupants(&self, slot: usize) -> Vec<(BindingSite, ParticleId)> {
        self.sites
            .iter()
            .filter(|&(&(s, _), _)| s == slot)
            .map(|(&(_, site), &id)| (site, id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.sites.clear();
        self.traversals.clear();
    }
}
