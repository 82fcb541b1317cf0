use super::engine::TollEngine;
use crate::domain::money::Amount;
use crate::domain::party::PartyId;
use crate::domain::route::Route;
use crate::domain::settlement::ExitOutcome;
use crate::domain::vehicle::{Multiplier, VehicleType};
use crate::error::Result;

/// A request against the engine, already attributed to an authenticated party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddBooth {
        booth: PartyId,
    },
    RemoveBooth {
        booth: PartyId,
    },
    SetVehicleType {
        vehicle: PartyId,
        vehicle_type: VehicleType,
    },
    SetMultiplier {
        vehicle_type: VehicleType,
        multiplier: Multiplier,
    },
    SetPaused {
        paused: bool,
    },
    /// `secret` is the clear exit secret; it is committed before it reaches
    /// the engine.
    Enter {
        vehicle: PartyId,
        entry_booth: PartyId,
        secret: String,
        paid: Amount,
    },
    Exit {
        exit_booth: PartyId,
        secret: String,
    },
    SetRoutePrice {
        route: Route,
        price: Amount,
    },
    ClearPending {
        caller: PartyId,
        route: Route,
        count: usize,
    },
    Withdraw {
        party: PartyId,
    },
}

impl TollEngine {
    /// Runs one command. Admin commands that change nothing still succeed.
    pub async fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::AddBooth { booth } => {
                self.add_toll_booth(booth).await;
            }
            Command::RemoveBooth { booth } => {
                self.remove_toll_booth(&booth).await;
            }
            Command::SetVehicleType {
                vehicle,
                vehicle_type,
            } => self.set_vehicle_type(vehicle, vehicle_type).await,
            Command::SetMultiplier {
                vehicle_type,
                multiplier,
            } => self.set_multiplier(vehicle_type, multiplier).await,
            Command::SetPaused { paused } => {
                self.set_paused(paused).await;
            }
            Command::Enter {
                vehicle,
                entry_booth,
                secret,
                paid,
            } => {
                let hash = self.hash_secret(secret.as_bytes());
                self.enter_road(&vehicle, &entry_booth, hash, paid).await?;
            }
            Command::Exit { exit_booth, secret } => {
                let outcome = self
                    .report_exit_road(&exit_booth, secret.as_bytes())
                    .await?;
                if outcome == ExitOutcome::Queued {
                    tracing::info!(%exit_booth, "exit pending until the route is priced");
                }
            }
            Command::SetRoutePrice { route, price } => {
                self.set_route_price(route, price).await?;
            }
            Command::ClearPending {
                caller,
                route,
                count,
            } => {
                self.clear_some_pending_payments(&caller, &route, count)
                    .await?;
            }
            Command::Withdraw { party } => {
                self.withdraw_payment(&party).await?;
            }
        }
        Ok(())
    }
}
