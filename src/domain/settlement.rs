//! The settlement state machine.
//!
//! [`EngineState`] owns every table the engine needs and implements the
//! operations as validate-then-mutate transitions: each one either applies in
//! full and returns the events it produced, or fails without touching state.
//!
//! Per secret hash the lifecycle is `Unused -> Open -> {Settled, Queued}` and
//! `Queued -> Settled`. A settled hash is never reused.

use super::booth::BoothSet;
use super::entry::{EntryRegistry, EntryStatus, Escrow};
use super::event::Event;
use super::ledger::{Ledger, LedgerAudit};
use super::money::Amount;
use super::party::PartyId;
use super::queue::PendingQueues;
use super::route::{Route, RoutePriceTable};
use super::secret::SecretHash;
use super::vehicle::{Multiplier, VehicleTable, VehicleType};
use crate::config::{DepositPolicy, EngineConfig, RoutePriceEvents};
use crate::error::{Result, TollError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The parts of the configuration that settlement depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRules {
    pub beneficiary: PartyId,
    pub base_deposit: Amount,
    pub deposit_policy: DepositPolicy,
    pub route_price_events: RoutePriceEvents,
}

impl From<&EngineConfig> for SettlementRules {
    fn from(config: &EngineConfig) -> Self {
        Self {
            beneficiary: config.beneficiary.clone(),
            base_deposit: config.base_deposit,
            deposit_policy: config.deposit_policy,
            route_price_events: config.route_price_events,
        }
    }
}

impl SettlementRules {
    pub fn required_deposit(&self, multiplier: Multiplier) -> Result<Amount> {
        match self.deposit_policy {
            DepositPolicy::Flat => Ok(self.base_deposit),
            DepositPolicy::Multiplied => self.base_deposit.checked_mul(multiplier.value()),
        }
    }
}

/// `min(price * multiplier, deposited)`. A product that overflows is by
/// definition above the deposit.
pub fn final_fee(price: Amount, multiplier: Multiplier, deposited: Amount) -> Amount {
    price
        .checked_mul(multiplier.value())
        .map_or(deposited, |fee| fee.min(deposited))
}

/// The result of settling one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub secret_hash: SecretHash,
    pub vehicle: PartyId,
    pub route: Route,
    pub deposited: Amount,
    pub final_fee: Amount,
    pub refund: Amount,
}

impl Settlement {
    pub fn event(&self) -> Event {
        Event::RoadExited {
            exit_booth: self.route.exit.clone(),
            secret_hash: self.secret_hash,
            final_fee: self.final_fee,
            refund_amount: self.refund,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The route had a price; the entry settled on the spot.
    Immediate(Settlement),
    /// No price yet; the exit waits in the route's queue.
    Queued,
}

/// What an operation returned, plus the events it emitted in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<T> {
    pub outcome: T,
    pub events: Vec<Event>,
}

impl<T> Transition<T> {
    fn new(outcome: T, events: Vec<Event>) -> Self {
        Self { outcome, events }
    }

    fn quiet(outcome: T) -> Self {
        Self::new(outcome, Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Audit {
    pub ledger: LedgerAudit,
    pub open_deposits: Amount,
    pub pending_payments: usize,
}

impl Audit {
    /// Every unit held is either withdrawable, escrowed for an open entry, or
    /// on its way out, and escrow matches the open entries exactly.
    pub fn is_consistent(&self) -> bool {
        self.ledger.is_balanced() && self.open_deposits == self.ledger.escrowed
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EngineState {
    pub(crate) paused: bool,
    pub(crate) booths: BoothSet,
    pub(crate) vehicles: VehicleTable,
    pub(crate) prices: RoutePriceTable,
    pub(crate) entries: EntryRegistry,
    pub(crate) queues: PendingQueues,
    pub(crate) ledger: Ledger,
}

impl EngineState {
    pub fn new(paused: bool) -> Self {
        Self {
            paused,
            ..Self::default()
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn booths(&self) -> &BoothSet {
        &self.booths
    }

    pub fn vehicles(&self) -> &VehicleTable {
        &self.vehicles
    }

    pub fn prices(&self) -> &RoutePriceTable {
        &self.prices
    }

    pub fn entries(&self) -> &EntryRegistry {
        &self.entries
    }

    pub fn queues(&self) -> &PendingQueues {
        &self.queues
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn ensure_running(&self) -> Result<()> {
        if self.paused {
            return Err(TollError::Paused);
        }
        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) -> Transition<bool> {
        if self.paused == paused {
            return Transition::quiet(false);
        }
        self.paused = paused;
        Transition::new(true, vec![Event::PausedSet { paused }])
    }

    pub fn add_toll_booth(&mut self, booth: PartyId) -> Transition<bool> {
        if !self.booths.add(booth.clone()) {
            return Transition::quiet(false);
        }
        Transition::new(true, vec![Event::TollBoothAdded { booth }])
    }

    pub fn remove_toll_booth(&mut self, booth: &PartyId) -> Transition<bool> {
        if !self.booths.remove(booth) {
            return Transition::quiet(false);
        }
        Transition::new(
            true,
            vec![Event::TollBoothRemoved {
                booth: booth.clone(),
            }],
        )
    }

    pub fn set_vehicle_type(&mut self, vehicle: PartyId, vehicle_type: VehicleType) -> Transition<()> {
        self.vehicles.set_vehicle_type(vehicle.clone(), vehicle_type);
        Transition::new(
            (),
            vec![Event::VehicleTypeSet {
                vehicle,
                vehicle_type,
            }],
        )
    }

    pub fn set_multiplier(&mut self, vehicle_type: VehicleType, multiplier: Multiplier) -> Transition<()> {
        self.vehicles.set_multiplier(vehicle_type, multiplier);
        Transition::new(
            (),
            vec![Event::MultiplierSet {
                vehicle_type,
                multiplier,
            }],
        )
    }

    pub fn enter_road(
        &mut self,
        rules: &SettlementRules,
        vehicle: &PartyId,
        entry_booth: &PartyId,
        secret_hash: SecretHash,
        paid: Amount,
    ) -> Result<Transition<()>> {
        self.ensure_running()?;
        let multiplier = self.vehicles.multiplier_of(vehicle)?;
        if !self.booths.contains(entry_booth) {
            return Err(TollError::NotABooth(entry_booth.clone()));
        }
        let required = rules.required_deposit(multiplier)?;
        if paid.is_zero() || paid < required {
            return Err(TollError::InsufficientDeposit { required, paid });
        }
        self.entries.ensure_unused(&secret_hash)?;

        self.ledger.escrow(paid)?;
        self.entries.open(
            secret_hash,
            entry_booth.clone(),
            Escrow {
                vehicle: vehicle.clone(),
                multiplier,
                deposited: paid,
            },
        )?;

        Ok(Transition::new(
            (),
            vec![Event::RoadEntered {
                vehicle: vehicle.clone(),
                entry_booth: entry_booth.clone(),
                secret_hash,
                multiplier,
                deposited_amount: paid,
            }],
        ))
    }

    pub fn report_exit_road(
        &mut self,
        rules: &SettlementRules,
        exit_booth: &PartyId,
        secret_hash: SecretHash,
    ) -> Result<Transition<ExitOutcome>> {
        self.ensure_running()?;
        if !self.booths.contains(exit_booth) {
            return Err(TollError::NotRegistered(exit_booth.clone()));
        }
        let record = self
            .entries
            .peek(&secret_hash)
            .ok_or(TollError::UnknownSecret(secret_hash))?;
        if !record.is_open() {
            return Err(TollError::AlreadyReported(secret_hash));
        }
        if &record.entry_booth == exit_booth {
            return Err(TollError::SameBooth(exit_booth.clone()));
        }
        let route = Route::new(record.entry_booth.clone(), exit_booth.clone());

        match self.prices.get(&route) {
            Some(price) => {
                let settlement = self.plan_settlement(secret_hash, &route, price)?;
                self.apply_settlement(rules, &settlement)?;
                let event = settlement.event();
                Ok(Transition::new(ExitOutcome::Immediate(settlement), vec![event]))
            }
            None => {
                self.entries.mark_queued(&secret_hash, exit_booth.clone())?;
                self.queues.enqueue(route.clone(), secret_hash);
                Ok(Transition::new(
                    ExitOutcome::Queued,
                    vec![Event::PendingPayment {
                        secret_hash,
                        entry_booth: route.entry,
                        exit_booth: route.exit,
                    }],
                ))
            }
        }
    }

    /// Sets the route price, then releases at most one pending payment.
    pub fn set_route_price(
        &mut self,
        rules: &SettlementRules,
        route: Route,
        price: Amount,
    ) -> Result<Transition<Option<Settlement>>> {
        if route.is_loop() {
            return Err(TollError::SameBooth(route.exit));
        }
        if !self.booths.connects(&route) {
            return Err(TollError::NotBooths(route));
        }

        let drained = match self.queues.front(&route) {
            Some(hash) => Some(self.plan_settlement(hash, &route, price)?),
            None => None,
        };

        let previous = self.prices.set(route.clone(), price);
        let mut events = Vec::with_capacity(2);
        let unchanged = previous == Some(price);
        if !(unchanged && rules.route_price_events == RoutePriceEvents::OnChange) {
            events.push(Event::RoutePriceSet {
                entry_booth: route.entry.clone(),
                exit_booth: route.exit.clone(),
                price,
            });
        }

        if let Some(settlement) = &drained {
            self.apply_settlement(rules, settlement)?;
            self.queues.pop_front(&route);
            events.push(settlement.event());
        }
        Ok(Transition::new(drained, events))
    }

    /// Settles exactly `count` pending payments of `route`, or none at all.
    pub fn clear_some_pending_payments(
        &mut self,
        rules: &SettlementRules,
        route: &Route,
        count: usize,
    ) -> Result<Transition<Vec<Settlement>>> {
        if !self.booths.connects(route) {
            return Err(TollError::NotBooths(route.clone()));
        }
        let settlements = self.drain_many(rules, route, count)?;
        let events = settlements.iter().map(Settlement::event).collect();
        Ok(Transition::new(settlements, events))
    }

    pub fn drain_many(
        &mut self,
        rules: &SettlementRules,
        route: &Route,
        count: usize,
    ) -> Result<Vec<Settlement>> {
        let price = self
            .prices
            .get(route)
            .ok_or_else(|| TollError::NoPriceSet(route.clone()))?;
        let hashes = self.queues.peek_front(route, count)?;
        if let Some(repeated) = first_repeat(&hashes) {
            return Err(TollError::NotOpen(repeated));
        }
        let plans = hashes
            .into_iter()
            .map(|hash| self.plan_settlement(hash, route, price))
            .collect::<Result<Vec<_>>>()?;

        for settlement in &plans {
            self.apply_settlement(rules, settlement)?;
            self.queues.pop_front(route);
        }
        Ok(plans)
    }

    fn plan_settlement(&self, secret_hash: SecretHash, route: &Route, price: Amount) -> Result<Settlement> {
        let record = self
            .entries
            .peek(&secret_hash)
            .ok_or(TollError::UnknownSecret(secret_hash))?;
        let escrow = match &record.status {
            EntryStatus::Open { escrow } => escrow,
            EntryStatus::Queued { escrow, exit_booth } if exit_booth == &route.exit => escrow,
            _ => return Err(TollError::NotOpen(secret_hash)),
        };
        let fee = final_fee(price, escrow.multiplier, escrow.deposited);
        Ok(Settlement {
            secret_hash,
            vehicle: escrow.vehicle.clone(),
            route: route.clone(),
            deposited: escrow.deposited,
            final_fee: fee,
            refund: escrow.deposited.checked_sub(fee)?,
        })
    }

    // A planned settlement cannot fail here: the fee and refund add up to a
    // deposit that is still escrowed, and no balance can exceed the funds held.
    fn apply_settlement(&mut self, rules: &SettlementRules, settlement: &Settlement) -> Result<()> {
        self.ledger.release(
            settlement.deposited,
            &[
                (&rules.beneficiary, settlement.final_fee),
                (&settlement.vehicle, settlement.refund),
            ],
        )?;
        self.entries.settle(&settlement.secret_hash)?;
        Ok(())
    }

    pub fn begin_withdrawal(&mut self, party: &PartyId) -> Result<Amount> {
        self.ensure_running()?;
        self.ledger.begin_withdrawal(party)
    }

    pub fn complete_withdrawal(&mut self, party: &PartyId, amount: Amount) -> Result<Transition<()>> {
        self.ledger.complete_withdrawal(amount)?;
        Ok(Transition::new(
            (),
            vec![Event::PaymentWithdrawn {
                party: party.clone(),
                amount,
            }],
        ))
    }

    pub fn abort_withdrawal(&mut self, party: &PartyId, amount: Amount) -> Result<()> {
        self.ledger.abort_withdrawal(party, amount)
    }

    /// Checks that the queues and the entry registry describe the same set of
    /// pending payments: every queued hash is a queued entry of that exact
    /// route, listed once, and no queued entry is missing from its queue.
    pub fn check_queues(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (route, hash) in self.queues.iter() {
            let matches_route = self.entries.peek(&hash).is_some_and(|record| {
                record.entry_booth == route.entry
                    && matches!(&record.status, EntryStatus::Queued { exit_booth, .. } if *exit_booth == route.exit)
            });
            if !matches_route || !seen.insert(hash) {
                return Err(TollError::InternalError(
                    format!("pending payment {hash} does not match a queued entry on {route}").into(),
                ));
            }
        }
        if seen.len() != self.entries.queued_count() {
            return Err(TollError::InternalError(
                "queued entries missing from the pending queues".into(),
            ));
        }
        Ok(())
    }

    pub fn audit(&self) -> Result<Audit> {
        Ok(Audit {
            ledger: self.ledger.audit()?,
            open_deposits: self.entries.open_deposits()?,
            pending_payments: self.queues.total(),
        })
    }
}

fn first_repeat(hashes: &[SecretHash]) -> Option<SecretHash> {
    let mut seen = HashSet::new();
    hashes.iter().copied().find(|hash| !seen.insert(*hash))
}
