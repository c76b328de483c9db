use log::debug;

use super::pump::SodiumPotassiumPump;
use super::MembranePotential;
use crate::state::{ParticleId, SoluteType};

/// The transport protein kinds the user can place in a slot.
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
pub enum ProteinType {
    SodiumLeakageChannel,
    PotassiumLeakageChannel,
    SodiumVoltageGatedChannel,
    PotassiumVoltageGatedChannel,
    SodiumLigandGatedChannel,
    PotassiumLigandGatedChannel,
    SodiumGlucoseCotransporter,
    SodiumPotassiumPump,
}

/// A ligand held at a ligand-gated channel's binding site. The channel, not
/// the ligand particle, owns the release countdown.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug)]
pub struct BoundLigand {
    pub ligand: ParticleId,
    pub remaining: f64,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
pub struct LigandGatedChannel {
    pub ion: SoluteType,
    pub bound: Option<BoundLigand>,
}

impl LigandGatedChannel {
    /// The ligand species this channel binds: ligand A gates the sodium
    /// channel, ligand B the potassium channel.
    pub fn ligand_kind(&self) -> SoluteType {
        match self.ion {
            SoluteType::Sodium => SoluteType::LigandA,
            SoluteType::Potassium => SoluteType::LigandB,
            other => unreachable!("ligand-gated channel for non-ion {other}"),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default)]
pub struct SodiumGlucoseCotransporter {
    /// Open while its captured sodium and glucose are passing through.
    pub open: bool,
}

/// A protein occupying one slot. A protein removed from its slot is
/// discarded; a fresh instance is created when a type is assigned, so no
/// conformational state survives re-assignment.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
pub enum TransportProtein {
    Leakage { ion: SoluteType },
    VoltageGated { ion: SoluteType },
    LigandGated(LigandGatedChannel),
    Cotransporter(SodiumGlucoseCotransporter),
    Pump(SodiumPotassiumPump),
}

impl TransportProtein {
    pub fn new(kind: ProteinType) -> Self {
        debug!("TransportProtein::new({kind})");
        match kind {
            ProteinType::SodiumLeakageChannel => TransportProtein::Leakage {
                ion: SoluteType::Sodium,
            },
            ProteinType::PotassiumLeakageChannel => TransportProtein::Leakage {
                ion: SoluteType::Potassium,
            },
            ProteinType::SodiumVoltageGatedChannel => TransportProtein::VoltageGated {
                ion: SoluteType::Sodium,
            },
            ProteinType::PotassiumVoltageGatedChannel => TransportProtein::VoltageGated {
                ion: SoluteType::Potassium,
            },
            ProteinType::SodiumLigandGatedChannel => {
                TransportProtein::LigandGated(LigandGatedChannel {
                    ion: SoluteType::Sodium,
                    bound: None,
                })
            }
            ProteinType::PotassiumLigandGatedChannel => {
                TransportProtein::LigandGated(LigandGatedChannel {
                    ion: SoluteType::Potassium,
                    bound: None,
                })
            }
            ProteinType::SodiumGlucoseCotransporter => {
                TransportProtein::Cotransporter(SodiumGlucoseCotransporter::default())
            }
            ProteinType::SodiumPotassiumPump => {
                TransportProtein::Pump(SodiumPotassiumPump::default())
            }
        }
    }

    pub fn kind(&self) -> ProteinType {
        match self {
            TransportProtein::Leakage { ion: SoluteType::Sodium } => {
                ProteinType::SodiumLeakageChannel
            }
            TransportProtein::Leakage { .. } => ProteinType::PotassiumLeakageChannel,
            TransportProtein::VoltageGated { ion: SoluteType::Sodium } => {
                ProteinType::SodiumVoltageGatedChannel
            }
            TransportProtein::VoltageGated { .. } => ProteinType::PotassiumVoltageGatedChannel,
            TransportProtein::LigandGated(c) if c.ion == SoluteType::Sodium => {
                ProteinType::SodiumLigandGatedChannel
            }
            TransportProtein::LigandGated(_) => ProteinType::PotassiumLigandGatedChannel,
            TransportProtein::Cotransporter(_) => ProteinType::SodiumGlucoseCotransporter,
            TransportProtein::Pump(_) => ProteinType::SodiumPotassiumPump,
        }
    }

    /// Whether an ion of the given kind can enter this channel right now.
    /// Pumps and cotransporters are not channels: their entry rules are
    /// site-based and handled separately.
    pub fn is_open_to(&self, ion: SoluteType, potential: MembranePotential) -> bool {
        match self {
            TransportProtein::Leakage { ion: gated } => *gated == ion,
            TransportProtein::VoltageGated { ion: gated } => {
                *gated == ion
                    && match gated {
                        // Sodium channels open on depolarization, potassium
                        // channels on the overshoot.
                        SoluteType::Sodium => {
                            potential == MembranePotential::DepolarizedMinus50
                        }
                        SoluteType::Potassium => potential == MembranePotential::Plus30,
                        _ => false,
                    }
            }
            TransportProtein::LigandGated(c) => c.ion == ion && c.bound.is_some(),
            TransportProtein::Cotransporter(_) | TransportProtein::Pump(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leakage_always_open_to_its_ion() {
        let p = TransportProtein::new(ProteinType::SodiumLeakageChannel);
        assert!(p.is_open_to(SoluteType::Sodium, MembranePotential::RestingMinus70));
        assert!(!p.is_open_to(SoluteType::Potassium, MembranePotential::RestingMinus70));
    }

    #[test]
    fn test_voltage_gating() {
        let na = TransportProtein::new(ProteinType::SodiumVoltageGatedChannel);
        let k = TransportProtein::new(ProteinType::PotassiumVoltageGatedChannel);
        assert!(!na.is_open_to(SoluteType::Sodium, MembranePotential::RestingMinus70));
        assert!(na.is_open_to(SoluteType::Sodium, MembranePotential::DepolarizedMinus50));
        assert!(!na.is_open_to(SoluteType::Sodium, MembranePotential::Plus30));
        assert!(!k.is_open_to(SoluteType::Potassium, MembranePotential::DepolarizedMinus50));
        assert!(k.is_open_to(SoluteType::Potassium, MembranePotential::Plus30));
    }

    #[test]
    fn test_ligand_gated_requires_bound_ligand() {
        let mut p = TransportProtein::new(ProteinType::SodiumLigandGatedChannel);
        assert!(!p.is_open_to(SoluteType::Sodium, MembranePotential::RestingMinus70));
        if let TransportProtein::LigandGated(c) = &mut p {
            assert_eq!(c.ligand_kind(), SoluteType::LigandA);
            c.bound = Some(BoundLigand {
                ligand: ParticleId(1),
                remaining: 5.0,
            });
        }
        assert!(p.is_open_to(SoluteType::Sodium, MembranePotential::RestingMinus70));
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ProteinType::SodiumLeakageChannel,
            ProteinType::PotassiumLeakageChannel,
            ProteinType::SodiumVoltageGatedChannel,
            ProteinType::PotassiumVoltageGatedChannel,
            ProteinType::SodiumLigandGatedChannel,
            ProteinType::PotassiumLigandGatedChannel,
            ProteinType::SodiumGlucoseCotransporter,
            ProteinType::SodiumPotassiumPump,
        ] {
            assert_eq!(TransportProtein::new(kind).kind(), kind);
        }
    }
}
