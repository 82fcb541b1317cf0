use super::money::Amount;
use super::party::PartyId;
use super::serde_pairs;
use crate::error::{Result, TollError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Funds held by the engine, split by where they currently sit.
///
/// `held == balances + escrowed + in_flight` must hold between operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerAudit {
    pub held: Amount,
    pub balances: Amount,
    pub escrowed: Amount,
    pub in_flight: Amount,
}

impl LedgerAudit {
    pub fn is_balanced(&self) -> bool {
        Amount::checked_sum([self.balances, self.escrowed, self.in_flight])
            .is_ok_and(|total| total == self.held)
    }
}

/// Per-party withdrawable balances plus the escrow backing open entries.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(with = "serde_pairs")]
    balances: HashMap<PartyId, Amount>,
    escrowed: Amount,
    in_flight: Amount,
    held: Amount,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, party: &PartyId) -> Amount {
        self.balances.get(party).copied().unwrap_or(Amount::ZERO)
    }

    pub fn balances(&self) -> impl Iterator<Item = (&PartyId, Amount)> {
        self.balances.iter().map(|(party, amount)| (party, *amount))
    }

    /// Takes a deposit into escrow.
    pub fn escrow(&mut self, deposit: Amount) -> Result<()> {
        let held = self.held.checked_add(deposit)?;
        let escrowed = self.escrowed.checked_add(deposit)?;
        self.held = held;
        self.escrowed = escrowed;
        Ok(())
    }

    /// Releases `deposit` from escrow into the given postings.
    ///
    /// The postings must add up to exactly the deposit. Nothing is written
    /// unless every posting can be applied.
    pub fn release(&mut self, deposit: Amount, postings: &[(&PartyId, Amount)]) -> Result<()> {
        let posted = Amount::checked_sum(postings.iter().map(|(_, amount)| *amount))?;
        if posted != deposit {
            return Err(TollError::InternalError(
                format!("postings of {posted} do not match released deposit of {deposit}").into(),
            ));
        }
        let escrowed = self.escrowed.checked_sub(deposit)?;

        let mut updates: Vec<(&PartyId, Amount)> = Vec::with_capacity(postings.len());
        for &(party, amount) in postings {
            if amount.is_zero() {
                continue;
            }
            match updates.iter_mut().find(|(p, _)| *p == party) {
                Some((_, pending)) => *pending = pending.checked_add(amount)?,
                None => updates.push((party, self.balance_of(party).checked_add(amount)?)),
            }
        }

        self.escrowed = escrowed;
        for (party, balance) in updates {
            self.balances.insert(party.clone(), balance);
        }
        Ok(())
    }

    /// Zeroes the party's balance and moves it in flight.
    ///
    /// Must run before any external transfer so that a re-entrant withdrawal
    /// sees nothing left to take.
    pub fn begin_withdrawal(&mut self, party: &PartyId) -> Result<Amount> {
        let amount = self.balance_of(party);
        if amount.is_zero() {
            return Err(TollError::NoFunds(party.clone()));
        }
        let in_flight = self.in_flight.checked_add(amount)?;
        self.balances.remove(party);
        self.in_flight = in_flight;
        Ok(amount)
    }

    /// The transfer went out: the funds leave the engine.
    pub fn complete_withdrawal(&mut self, amount: Amount) -> Result<()> {
        let in_flight = self.in_flight.checked_sub(amount)?;
        let held = self.held.checked_sub(amount)?;
        self.in_flight = in_flight;
        self.held = held;
        Ok(())
    }

    /// The transfer failed: the funds go back to the party.
    pub fn abort_withdrawal(&mut self, party: &PartyId, amount: Amount) -> Result<()> {
        let in_flight = self.in_flight.checked_sub(amount)?;
        let balance = self.balance_of(party).checked_add(amount)?;
        self.in_flight = in_flight;
        self.balances.insert(party.clone(), balance);
        Ok(())
    }

    pub fn audit(&self) -> Result<LedgerAudit> {
        Ok(LedgerAudit {
            held: self.held,
            balances: Amount::checked_sum(self.balances.values().copied())?,
            escrowed: self.escrowed,
            in_flight: self.in_flight,
        })
    }
}
