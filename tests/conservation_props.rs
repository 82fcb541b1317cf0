use proptest::prelude::*;
use tollway::config::{DepositPolicy, EngineConfig};
use tollway::domain::money::Amount;
use tollway::domain::party::PartyId;
use tollway::domain::route::Route;
use tollway::domain::secret::SecretHash;
use tollway::domain::settlement::{EngineState, SettlementRules};
use tollway::domain::vehicle::{Multiplier, VehicleType};

const BOOTHS: [&str; 3] = ["b1", "b2", "b3"];
const VEHICLES: [&str; 3] = ["v1", "v2", "v3"];
const BENEFICIARY: &str = "operator";

#[derive(Debug, Clone)]
enum Op {
    AddBooth(usize),
    RemoveBooth(usize),
    SetMultiplier(u32, u64),
    SetPaused(bool),
    Enter {
        vehicle: usize,
        booth: usize,
        secret: u8,
        paid: u64,
    },
    Exit {
        booth: usize,
        secret: u8,
    },
    SetRoutePrice {
        entry: usize,
        exit: usize,
        price: u64,
    },
    Clear {
        entry: usize,
        exit: usize,
        count: usize,
    },
    Withdraw(Option<usize>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..BOOTHS.len()).prop_map(Op::AddBooth),
        (0..BOOTHS.len()).prop_map(Op::RemoveBooth),
        (0u32..3, 0u64..4).prop_map(|(t, m)| Op::SetMultiplier(t, m)),
        any::<bool>().prop_map(Op::SetPaused),
        (0..VEHICLES.len(), 0..BOOTHS.len(), 0u8..8, 0u64..500).prop_map(
            |(vehicle, booth, secret, paid)| Op::Enter {
                vehicle,
                booth,
                secret,
                paid
            }
        ),
        (0..BOOTHS.len(), 0u8..8).prop_map(|(booth, secret)| Op::Exit { booth, secret }),
        (0..BOOTHS.len(), 0..BOOTHS.len(), 0u64..200).prop_map(|(entry, exit, price)| {
            Op::SetRoutePrice { entry, exit, price }
        }),
        (0..BOOTHS.len(), 0..BOOTHS.len(), 0usize..3)
            .prop_map(|(entry, exit, count)| Op::Clear { entry, exit, count }),
        proptest::option::of(0..VEHICLES.len()).prop_map(Op::Withdraw),
    ]
}

fn secret(n: u8) -> SecretHash {
    SecretHash::commit(&[n], "props")
}

struct Harness {
    rules: SettlementRules,
    state: EngineState,
    paid_in: u64,
    paid_out: u64,
}

impl Harness {
    fn new(policy: DepositPolicy) -> Self {
        let config = EngineConfig::new("props", BENEFICIARY, Amount::new(50))
            .with_deposit_policy(policy);
        let mut state = EngineState::new(false);
        for (i, vehicle) in VEHICLES.iter().enumerate() {
            state.set_vehicle_type((*vehicle).into(), VehicleType(i as u32));
        }
        Self {
            rules: SettlementRules::from(&config),
            state,
            paid_in: 0,
            paid_out: 0,
        }
    }

    /// Applies one operation. Returns `false` when the engine rejected it.
    fn apply(&mut self, op: Op) -> bool {
        match op {
            Op::AddBooth(i) => {
                self.state.add_toll_booth(BOOTHS[i].into());
                true
            }
            Op::RemoveBooth(i) => {
                self.state.remove_toll_booth(&BOOTHS[i].into());
                true
            }
            Op::SetMultiplier(t, m) => {
                self.state
                    .set_multiplier(VehicleType(t), Multiplier::new(m));
                true
            }
            Op::SetPaused(paused) => {
                self.state.set_paused(paused);
                true
            }
            Op::Enter {
                vehicle,
                booth,
                secret: n,
                paid,
            } => {
                let entered = self.state.enter_road(
                    &self.rules,
                    &VEHICLES[vehicle].into(),
                    &BOOTHS[booth].into(),
                    secret(n),
                    Amount::new(paid),
                );
                if entered.is_ok() {
                    self.paid_in += paid;
                }
                entered.is_ok()
            }
            Op::Exit { booth, secret: n } => self
                .state
                .report_exit_road(&self.rules, &BOOTHS[booth].into(), secret(n))
                .is_ok(),
            Op::SetRoutePrice { entry, exit, price } => self
                .state
                .set_route_price(
                    &self.rules,
                    Route::new(BOOTHS[entry], BOOTHS[exit]),
                    Amount::new(price),
                )
                .is_ok(),
            Op::Clear { entry, exit, count } => {
                let route = Route::new(BOOTHS[entry], BOOTHS[exit]);
                self.state
                    .clear_some_pending_payments(&self.rules, &route, count)
                    .is_ok()
            }
            Op::Withdraw(vehicle) => {
                let party: PartyId = vehicle.map_or(BENEFICIARY, |i| VEHICLES[i]).into();
                match self.state.begin_withdrawal(&party) {
                    Ok(amount) => {
                        self.state.complete_withdrawal(&party, amount).unwrap();
                        self.paid_out += amount.value();
                        true
                    }
                    Err(_) => false,
                }
            }
        }
    }
}

fn policy() -> impl Strategy<Value = DepositPolicy> {
    prop_oneof![Just(DepositPolicy::Flat), Just(DepositPolicy::Multiplied)]
}

proptest! {
    /// Funds are never created or destroyed: everything paid in is either
    /// withdrawable, escrowed, or already paid out. A rejected operation
    /// leaves the state untouched.
    #[test]
    fn conservation_holds(policy in policy(), ops in prop::collection::vec(op(), 0..60)) {
        let mut harness = Harness::new(policy);
        for op in ops {
            let before = serde_json::to_value(&harness.state).unwrap();
            let described = format!("{op:?}");
            if !harness.apply(op) {
                prop_assert_eq!(
                    serde_json::to_value(&harness.state).unwrap(),
                    before,
                    "rejected {} changed state",
                    described
                );
            }
            let audit = harness.state.audit().unwrap();
            prop_assert!(audit.is_consistent(), "inconsistent audit: {:?}", audit);
            prop_assert_eq!(audit.ledger.in_flight, Amount::ZERO);
            prop_assert_eq!(
                audit.ledger.balances.value() + audit.ledger.escrowed.value(),
                harness.paid_in - harness.paid_out
            );
        }
    }

    /// Every queued exit sits in exactly one queue until it settles.
    #[test]
    fn pending_payments_match_queued_entries(ops in prop::collection::vec(op(), 0..60)) {
        let mut harness = Harness::new(DepositPolicy::Multiplied);
        for op in ops {
            harness.apply(op);
        }
        let queued = (0u8..8)
            .filter_map(|n| harness.state.entries().peek(&secret(n)))
            .filter(|record| record.is_queued())
            .count();
        prop_assert_eq!(queued, harness.state.queues().total());
        prop_assert!(harness.state.check_queues().is_ok());
    }
}
