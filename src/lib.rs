//! Toll-road settlement engine.
//!
//! Vehicles escrow a deposit when they enter at a booth and commit to an exit
//! secret. Reporting the secret at the exit booth settles the trip against the
//! route price, or queues it until the route is priced. Fees accrue to the
//! configured beneficiary and refunds to the vehicle, both withdrawable.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
