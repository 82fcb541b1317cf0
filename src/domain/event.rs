use super::money::Amount;
use super::party::PartyId;
use super::secret::SecretHash;
use super::vehicle::{Multiplier, VehicleType};
use serde::{Deserialize, Serialize};

/// A fact emitted by the engine. Events are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    RoadEntered {
        vehicle: PartyId,
        entry_booth: PartyId,
        secret_hash: SecretHash,
        multiplier: Multiplier,
        deposited_amount: Amount,
    },
    RoadExited {
        exit_booth: PartyId,
        secret_hash: SecretHash,
        final_fee: Amount,
        refund_amount: Amount,
    },
    PendingPayment {
        secret_hash: SecretHash,
        entry_booth: PartyId,
        exit_booth: PartyId,
    },
    PaymentWithdrawn {
        party: PartyId,
        amount: Amount,
    },
    RoutePriceSet {
        entry_booth: PartyId,
        exit_booth: PartyId,
        price: Amount,
    },
    TollBoothAdded {
        booth: PartyId,
    },
    TollBoothRemoved {
        booth: PartyId,
    },
    VehicleTypeSet {
        vehicle: PartyId,
        vehicle_type: VehicleType,
    },
    MultiplierSet {
        vehicle_type: VehicleType,
        multiplier: Multiplier,
    },
    PausedSet {
        paused: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub sequence: u64,
    #[serde(flatten)]
    pub event: Event,
}

/// Append-only, ordered log of everything the engine emitted.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventJournal {
    events: Vec<RecordedEvent>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(mut events: Vec<RecordedEvent>) -> Self {
        events.sort_by_key(|recorded| recorded.sequence);
        Self { events }
    }

    pub fn record(&mut self, event: Event) -> u64 {
        let sequence = self.events.len() as u64;
        self.events.push(RecordedEvent { sequence, event });
        sequence
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn all(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Events with a sequence number of at least `sequence`.
    pub fn since(&self, sequence: u64) -> &[RecordedEvent] {
        let start = (sequence as usize).min(self.events.len());
        &self.events[start..]
    }
}
