use super::money::Amount;
use super::party::PartyId;
use super::snapshot::EngineSnapshot;
use crate::error::Result;
use async_trait::async_trait;

/// Durable storage for engine snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<EngineSnapshot>>;
    async fn save(&self, snapshot: &EngineSnapshot) -> Result<()>;
}

/// Moves withdrawn funds out of the engine.
///
/// This is the one place where control leaves the engine in the middle of an
/// operation. Implementations may call back into the engine.
#[async_trait]
pub trait PayoutGateway: Send + Sync {
    async fn transfer(&self, party: &PartyId, amount: Amount) -> Result<()>;
}

pub type SnapshotStoreBox = Box<dyn SnapshotStore>;
pub type PayoutGatewayBox = Box<dyn PayoutGateway>;
