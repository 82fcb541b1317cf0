use super::party::PartyId;
use super::serde_pairs;
use crate::error::{Result, TollError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleType(pub u32);

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scales route prices and deposits for a vehicle type. Zero is a legal,
/// toll-free multiplier; "no multiplier" is represented by absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Multiplier(u64);

impl Multiplier {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VehicleTable {
    #[serde(with = "serde_pairs")]
    types: HashMap<PartyId, VehicleType>,
    #[serde(with = "serde_pairs")]
    multipliers: HashMap<VehicleType, Multiplier>,
}

impl VehicleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_vehicle_type(&mut self, vehicle: PartyId, vehicle_type: VehicleType) {
        self.types.insert(vehicle, vehicle_type);
    }

    pub fn set_multiplier(&mut self, vehicle_type: VehicleType, multiplier: Multiplier) {
        self.multipliers.insert(vehicle_type, multiplier);
    }

    pub fn vehicle_type(&self, vehicle: &PartyId) -> Option<VehicleType> {
        self.types.get(vehicle).copied()
    }

    pub fn multiplier(&self, vehicle_type: VehicleType) -> Option<Multiplier> {
        self.multipliers.get(&vehicle_type).copied()
    }

    /// Resolves vehicle -> type -> multiplier.
    ///
    /// A vehicle without a type is [`TollError::NotRegistered`]; a type without
    /// a multiplier is [`TollError::NotAllowed`].
    pub fn multiplier_of(&self, vehicle: &PartyId) -> Result<Multiplier> {
        let vehicle_type = self
            .vehicle_type(vehicle)
            .ok_or_else(|| TollError::NotRegistered(vehicle.clone()))?;
        self.multiplier(vehicle_type)
            .ok_or_else(|| TollError::NotAllowed(vehicle.clone()))
    }
}
