//! Domain layer: value types, the tables the engine keeps, and the settlement
//! state machine that ties them together. Nothing in here performs I/O.

pub mod booth;
pub mod entry;
pub mod event;
pub mod ledger;
pub mod money;
pub mod party;
pub mod ports;
pub mod queue;
pub mod route;
pub mod secret;
mod serde_pairs;
pub mod settlement;
pub mod snapshot;
pub mod vehicle;
