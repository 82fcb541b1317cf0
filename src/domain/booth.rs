use super::party::PartyId;
use super::route::Route;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Registered toll booths.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BoothSet {
    booths: HashSet<PartyId>,
}

impl BoothSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the booth was already registered.
    pub fn add(&mut self, booth: PartyId) -> bool {
        self.booths.insert(booth)
    }

    /// Returns `false` if the booth was not registered.
    pub fn remove(&mut self, booth: &PartyId) -> bool {
        self.booths.remove(booth)
    }

    pub fn contains(&self, booth: &PartyId) -> bool {
        self.booths.contains(booth)
    }

    pub fn connects(&self, route: &Route) -> bool {
        self.contains(&route.entry) && self.contains(&route.exit)
    }
}
