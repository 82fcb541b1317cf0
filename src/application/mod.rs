//! Application layer containing the engine orchestration.
//!
//! This module defines the `TollEngine`, the entry point for every toll-road
//! operation. It serializes access to the domain state behind a `tokio` mutex
//! and drives the payout port for withdrawals.

pub mod command;
pub mod engine;
