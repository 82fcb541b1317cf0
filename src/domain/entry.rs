use super::money::Amount;
use super::party::PartyId;
use super::secret::SecretHash;
use super::serde_pairs;
use super::vehicle::Multiplier;
use crate::error::{Result, TollError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Funds and pricing captured at entry time, held until settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub vehicle: PartyId,
    pub multiplier: Multiplier,
    pub deposited: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    /// On the road; the exit has not been reported.
    Open { escrow: Escrow },
    /// Exit reported on a route without a price; waiting in that route's queue.
    Queued { escrow: Escrow, exit_booth: PartyId },
    /// Fee and refund credited. Terminal: the hash can never be reused.
    Settled,
}

/// A vehicle entry, keyed by its exit secret hash.
///
/// The entry booth is kept after settlement so that the record still tells
/// which route queue it belonged to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub entry_booth: PartyId,
    pub status: EntryStatus,
}

impl EntryRecord {
    pub fn escrow(&self) -> Option<&Escrow> {
        match &self.status {
            EntryStatus::Open { escrow } | EntryStatus::Queued { escrow, .. } => Some(escrow),
            EntryStatus::Settled => None,
        }
    }

    pub fn vehicle(&self) -> Option<&PartyId> {
        self.escrow().map(|escrow| &escrow.vehicle)
    }

    pub fn multiplier(&self) -> Multiplier {
        self.escrow()
            .map(|escrow| escrow.multiplier)
            .unwrap_or(Multiplier::new(0))
    }

    pub fn deposited(&self) -> Amount {
        self.escrow()
            .map(|escrow| escrow.deposited)
            .unwrap_or(Amount::ZERO)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, EntryStatus::Open { .. })
    }

    pub fn is_queued(&self) -> bool {
        matches!(self.status, EntryStatus::Queued { .. })
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.status, EntryStatus::Settled)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EntryRegistry {
    #[serde(with = "serde_pairs")]
    records: HashMap<SecretHash, EntryRecord>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if the hash was ever opened, whatever its current status.
    pub fn ensure_unused(&self, hash: &SecretHash) -> Result<()> {
        if self.records.contains_key(hash) {
            return Err(TollError::AlreadyUsed(*hash));
        }
        Ok(())
    }

    pub fn open(&mut self, hash: SecretHash, entry_booth: PartyId, escrow: Escrow) -> Result<()> {
        self.ensure_unused(&hash)?;
        self.records.insert(
            hash,
            EntryRecord {
                entry_booth,
                status: EntryStatus::Open { escrow },
            },
        );
        Ok(())
    }

    pub fn peek(&self, hash: &SecretHash) -> Option<&EntryRecord> {
        self.records.get(hash)
    }

    /// Moves an open entry into the queued state.
    pub fn mark_queued(&mut self, hash: &SecretHash, exit_booth: PartyId) -> Result<()> {
        let record = self
            .records
            .get_mut(hash)
            .ok_or(TollError::UnknownSecret(*hash))?;
        match std::mem::replace(&mut record.status, EntryStatus::Settled) {
            EntryStatus::Open { escrow } => {
                record.status = EntryStatus::Queued { escrow, exit_booth };
                Ok(())
            }
            other => {
                record.status = other;
                Err(TollError::NotOpen(*hash))
            }
        }
    }

    /// Clears the escrow of an open or queued entry and returns it.
    pub fn settle(&mut self, hash: &SecretHash) -> Result<Escrow> {
        let record = self
            .records
            .get_mut(hash)
            .ok_or(TollError::UnknownSecret(*hash))?;
        match std::mem::replace(&mut record.status, EntryStatus::Settled) {
            EntryStatus::Open { escrow } | EntryStatus::Queued { escrow, .. } => Ok(escrow),
            EntryStatus::Settled => Err(TollError::NotOpen(*hash)),
        }
    }

    pub fn queued_count(&self) -> usize {
        self.records.values().filter(|record| record.is_queued()).count()
    }

    /// Sum of deposits still held for unsettled entries.
    pub fn open_deposits(&self) -> Result<Amount> {
        Amount::checked_sum(self.records.values().map(EntryRecord::deposited))
    }
}
