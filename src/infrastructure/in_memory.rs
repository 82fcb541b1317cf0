use crate::domain::money::Amount;
use crate::domain::party::PartyId;
use crate::domain::ports::{PayoutGateway, SnapshotStore};
use crate::domain::snapshot::EngineSnapshot;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory snapshot store.
///
/// Keeps only the latest snapshot. Ideal for testing or for runs where
/// persistence is not required.
#[derive(Default, Clone)]
pub struct InMemorySnapshotStore {
    snapshot: Arc<RwLock<Option<EngineSnapshot>>>,
}

impl InMemorySnapshotStore {
    /// Creates a new, empty in-memory snapshot store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self) -> Result<Option<EngineSnapshot>> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, snapshot: &EngineSnapshot) -> Result<()> {
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(())
    }
}

/// A payout gateway that records transfers instead of moving real funds.
///
/// Clones share the same record, so a test can hand one clone to the engine
/// and inspect the other.
#[derive(Default, Clone)]
pub struct InMemoryPayoutGateway {
    transfers: Arc<RwLock<Vec<(PartyId, Amount)>>>,
}

impl InMemoryPayoutGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transfer made so far, in order.
    pub async fn transfers(&self) -> Vec<(PartyId, Amount)> {
        self.transfers.read().await.clone()
    }
}

#[async_trait]
impl PayoutGateway for InMemoryPayoutGateway {
    async fn transfer(&self, party: &PartyId, amount: Amount) -> Result<()> {
        self.transfers.write().await.push((party.clone(), amount));
        Ok(())
    }
}
