use crate::domain::event::RecordedEvent;
use crate::domain::ports::SnapshotStore;
use crate::domain::settlement::EngineState;
use crate::domain::snapshot::EngineSnapshot;
use crate::error::{Result, TollError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Column Family for the engine state.
pub const CF_STATE: &str = "state";
/// Column Family for the event journal, keyed by sequence number.
pub const CF_EVENTS: &str = "events";

const STATE_KEY: &[u8] = b"engine";

#[derive(Serialize, Deserialize)]
struct StoredState {
    engine_id: String,
    state: EngineState,
}

/// A persistent snapshot store using RocksDB.
///
/// The state is stored as a single JSON document in the `state` Column Family.
/// Events go to the `events` Column Family under their big-endian sequence
/// number, so iteration returns them in order. A save is one atomic write batch.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_state = ColumnFamilyDescriptor::new(CF_STATE, Options::default());
        let cf_events = ColumnFamilyDescriptor::new(CF_EVENTS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_state, cf_events])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            TollError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }
}

#[async_trait]
impl SnapshotStore for RocksDBStore {
    async fn load(&self) -> Result<Option<EngineSnapshot>> {
        let Some(bytes) = self.db.get_cf(self.cf(CF_STATE)?, STATE_KEY)? else {
            return Ok(None);
        };
        let stored: StoredState = serde_json::from_slice(&bytes)?;

        let mut events = Vec::new();
        for item in self
            .db
            .iterator_cf(self.cf(CF_EVENTS)?, rocksdb::IteratorMode::Start)
        {
            let (_key, value) = item?;
            let event: RecordedEvent = serde_json::from_slice(&value)?;
            events.push(event);
        }

        Ok(Some(EngineSnapshot {
            engine_id: stored.engine_id,
            state: stored.state,
            events,
        }))
    }

    async fn save(&self, snapshot: &EngineSnapshot) -> Result<()> {
        let cf_state = self.cf(CF_STATE)?;
        let cf_events = self.cf(CF_EVENTS)?;

        let stored = StoredState {
            engine_id: snapshot.engine_id.clone(),
            state: snapshot.state.clone(),
        };
        let mut batch = WriteBatch::default();
        batch.put_cf(cf_state, STATE_KEY, serde_json::to_vec(&stored)?);
        for event in &snapshot.events {
            batch.put_cf(
                cf_events,
                event.sequence.to_be_bytes(),
                serde_json::to_vec(event)?,
            );
        }
        self.db.write(batch)?;
        Ok(())
    }
}
