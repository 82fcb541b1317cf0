use super::event::RecordedEvent;
use super::settlement::EngineState;
use serde::{Deserialize, Serialize};

/// Everything needed to resume an engine: its identity, its state, and the
/// events it has emitted so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub engine_id: String,
    pub state: EngineState,
    pub events: Vec<RecordedEvent>,
}
