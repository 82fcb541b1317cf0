use crate::config::EngineConfig;
use crate::domain::entry::EntryRecord;
use crate::domain::event::{Event, EventJournal, RecordedEvent};
use crate::domain::money::Amount;
use crate::domain::party::PartyId;
use crate::domain::ports::PayoutGatewayBox;
use crate::domain::route::Route;
use crate::domain::secret::SecretHash;
use crate::domain::settlement::{Audit, EngineState, ExitOutcome, Settlement, SettlementRules};
use crate::domain::snapshot::EngineSnapshot;
use crate::domain::vehicle::{Multiplier, VehicleType};
use crate::error::{Result, TollError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct Inner {
    state: EngineState,
    journal: EventJournal,
}

impl Inner {
    fn record(&mut self, events: Vec<Event>) {
        for event in events {
            let sequence = self.journal.record(event);
            debug!(sequence, "event recorded");
        }
    }
}

/// The toll-road settlement engine.
///
/// Every mutating operation takes the state lock for its whole duration, so
/// operations are serialized and never observe each other half-applied. The
/// single exception is the payout transfer in [`TollEngine::withdraw_payment`],
/// which runs with the lock released after the balance has been zeroed.
pub struct TollEngine {
    engine_id: String,
    rules: SettlementRules,
    inner: Mutex<Inner>,
    payouts: PayoutGatewayBox,
}

impl TollEngine {
    /// Creates an empty engine.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine identity, beneficiary and deposit rules.
    /// * `payouts` - The gateway withdrawals are paid through.
    pub fn new(config: &EngineConfig, payouts: PayoutGatewayBox) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(
            config,
            payouts,
            EngineState::new(config.start_paused),
            EventJournal::new(),
        ))
    }

    /// Resumes an engine from a snapshot taken by [`TollEngine::snapshot`].
    pub fn restore(
        config: &EngineConfig,
        payouts: PayoutGatewayBox,
        snapshot: EngineSnapshot,
    ) -> Result<Self> {
        config.validate()?;
        if snapshot.engine_id != config.engine_id {
            return Err(TollError::SnapshotMismatch {
                expected: config.engine_id.clone(),
                found: snapshot.engine_id,
            });
        }
        if !snapshot.state.audit()?.is_consistent() {
            return Err(TollError::InternalError(
                "snapshot ledger does not balance".into(),
            ));
        }
        snapshot.state.check_queues()?;
        info!(
            engine_id = %config.engine_id,
            events = snapshot.events.len(),
            "restored engine from snapshot"
        );
        Ok(Self::assemble(
            config,
            payouts,
            snapshot.state,
            EventJournal::from_events(snapshot.events),
        ))
    }

    fn assemble(
        config: &EngineConfig,
        payouts: PayoutGatewayBox,
        state: EngineState,
        journal: EventJournal,
    ) -> Self {
        Self {
            engine_id: config.engine_id.clone(),
            rules: SettlementRules::from(config),
            inner: Mutex::new(Inner { state, journal }),
            payouts,
        }
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        let inner = self.inner.lock().await;
        EngineSnapshot {
            engine_id: self.engine_id.clone(),
            state: inner.state.clone(),
            events: inner.journal.all().to_vec(),
        }
    }

    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }

    pub fn beneficiary(&self) -> &PartyId {
        &self.rules.beneficiary
    }

    /// Commits a clear secret to this engine.
    pub fn hash_secret(&self, secret: &[u8]) -> SecretHash {
        SecretHash::commit(secret, &self.engine_id)
    }

    pub async fn set_paused(&self, paused: bool) -> bool {
        let mut inner = self.inner.lock().await;
        let transition = inner.state.set_paused(paused);
        if transition.outcome {
            info!(paused, "pause flag changed");
        }
        inner.record(transition.events);
        transition.outcome
    }

    pub async fn add_toll_booth(&self, booth: PartyId) -> bool {
        let mut inner = self.inner.lock().await;
        let transition = inner.state.add_toll_booth(booth);
        inner.record(transition.events);
        transition.outcome
    }

    pub async fn remove_toll_booth(&self, booth: &PartyId) -> bool {
        let mut inner = self.inner.lock().await;
        let transition = inner.state.remove_toll_booth(booth);
        inner.record(transition.events);
        transition.outcome
    }

    pub async fn set_vehicle_type(&self, vehicle: PartyId, vehicle_type: VehicleType) {
        let mut inner = self.inner.lock().await;
        let transition = inner.state.set_vehicle_type(vehicle, vehicle_type);
        inner.record(transition.events);
    }

    pub async fn set_multiplier(&self, vehicle_type: VehicleType, multiplier: Multiplier) {
        let mut inner = self.inner.lock().await;
        let transition = inner.state.set_multiplier(vehicle_type, multiplier);
        inner.record(transition.events);
    }

    /// A vehicle enters the road at `entry_booth`, escrowing `paid`.
    pub async fn enter_road(
        &self,
        vehicle: &PartyId,
        entry_booth: &PartyId,
        secret_hash: SecretHash,
        paid: Amount,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let transition =
            inner
                .state
                .enter_road(&self.rules, vehicle, entry_booth, secret_hash, paid)?;
        info!(%vehicle, %entry_booth, %paid, "road entered");
        inner.record(transition.events);
        Ok(())
    }

    /// A booth reports the exit of the vehicle holding `secret`.
    pub async fn report_exit_road(&self, exit_booth: &PartyId, secret: &[u8]) -> Result<ExitOutcome> {
        let secret_hash = self.hash_secret(secret);
        let mut inner = self.inner.lock().await;
        let transition = inner
            .state
            .report_exit_road(&self.rules, exit_booth, secret_hash)?;
        match &transition.outcome {
            ExitOutcome::Immediate(settlement) => log_settlement(settlement),
            ExitOutcome::Queued => {
                debug!(%exit_booth, %secret_hash, "exit queued until a route price is set")
            }
        }
        inner.record(transition.events);
        Ok(transition.outcome)
    }

    /// Sets a route price. Allowed while paused. Releases at most one pending
    /// payment for the route.
    pub async fn set_route_price(&self, route: Route, price: Amount) -> Result<Option<Settlement>> {
        let mut inner = self.inner.lock().await;
        let transition = inner.state.set_route_price(&self.rules, route, price)?;
        if let Some(settlement) = &transition.outcome {
            log_settlement(settlement);
        }
        inner.record(transition.events);
        Ok(transition.outcome)
    }

    /// Settles `count` pending payments on `route`, all or nothing. Anyone may
    /// call this once the route has a price, paused or not.
    pub async fn clear_some_pending_payments(
        &self,
        caller: &PartyId,
        route: &Route,
        count: usize,
    ) -> Result<Vec<Settlement>> {
        let mut inner = self.inner.lock().await;
        let transition = inner
            .state
            .clear_some_pending_payments(&self.rules, route, count)?;
        debug!(%caller, %route, count, "pending payments cleared");
        transition.outcome.iter().for_each(log_settlement);
        inner.record(transition.events);
        Ok(transition.outcome)
    }

    /// Pays out the caller's whole balance through the payout gateway.
    pub async fn withdraw_payment(&self, party: &PartyId) -> Result<Amount> {
        let amount = self.inner.lock().await.state.begin_withdrawal(party)?;

        // The lock is released here: the gateway may call back into the engine.
        if let Err(err) = self.payouts.transfer(party, amount).await {
            self.inner
                .lock()
                .await
                .state
                .abort_withdrawal(party, amount)?;
            warn!(%party, %amount, error = %err, "payout failed, balance restored");
            return Err(err);
        }

        let mut inner = self.inner.lock().await;
        let transition = inner.state.complete_withdrawal(party, amount)?;
        info!(%party, %amount, "payment withdrawn");
        inner.record(transition.events);
        Ok(amount)
    }

    pub async fn is_paused(&self) -> bool {
        self.inner.lock().await.state.paused
    }

    pub async fn is_toll_booth(&self, booth: &PartyId) -> bool {
        self.inner.lock().await.state.booths.contains(booth)
    }

    pub async fn balance_of(&self, party: &PartyId) -> Amount {
        self.inner.lock().await.state.ledger.balance_of(party)
    }

    /// Non-zero balances, sorted by party.
    pub async fn balances(&self) -> Vec<(PartyId, Amount)> {
        let inner = self.inner.lock().await;
        let mut balances: Vec<_> = inner
            .state
            .ledger
            .balances()
            .map(|(party, amount)| (party.clone(), amount))
            .collect();
        balances.sort();
        balances
    }

    pub async fn route_price(&self, route: &Route) -> Option<Amount> {
        self.inner.lock().await.state.prices.get(route)
    }

    pub async fn pending_count(&self, route: &Route) -> usize {
        self.inner.lock().await.state.queues.count(route)
    }

    pub async fn entry(&self, secret_hash: &SecretHash) -> Option<EntryRecord> {
        self.inner.lock().await.state.entries.peek(secret_hash).cloned()
    }

    pub async fn multiplier_of(&self, vehicle: &PartyId) -> Result<Multiplier> {
        self.inner.lock().await.state.vehicles.multiplier_of(vehicle)
    }

    pub async fn events(&self) -> Vec<RecordedEvent> {
        self.inner.lock().await.journal.all().to_vec()
    }

    pub async fn events_since(&self, sequence: u64) -> Vec<RecordedEvent> {
        self.inner.lock().await.journal.since(sequence).to_vec()
    }

    pub async fn audit(&self) -> Result<Audit> {
        self.inner.lock().await.state.audit()
    }
}

fn log_settlement(settlement: &Settlement) {
    info!(
        secret_hash = %settlement.secret_hash,
        vehicle = %settlement.vehicle,
        route = %settlement.route,
        fee = %settlement.final_fee,
        refund = %settlement.refund,
        "entry settled"
    );
}
