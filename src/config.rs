use crate::domain::money::Amount;
use crate::domain::party::PartyId;
use crate::error::{Result, TollError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the minimum payment on entry is derived from the base deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DepositPolicy {
    /// Every vehicle pays at least the base deposit.
    Flat,
    /// A vehicle pays at least the base deposit times its multiplier.
    #[default]
    Multiplied,
}

/// When `RoutePriceSet` is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RoutePriceEvents {
    #[default]
    Always,
    /// Skip the event when the new price equals the current one.
    OnChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bound into every secret commitment.
    pub engine_id: String,
    /// Receives collected fees.
    pub beneficiary: PartyId,
    pub base_deposit: Amount,
    #[serde(default)]
    pub deposit_policy: DepositPolicy,
    #[serde(default)]
    pub route_price_events: RoutePriceEvents,
    #[serde(default)]
    pub start_paused: bool,
}

impl EngineConfig {
    pub fn new(
        engine_id: impl Into<String>,
        beneficiary: impl Into<PartyId>,
        base_deposit: Amount,
    ) -> Self {
        Self {
            engine_id: engine_id.into(),
            beneficiary: beneficiary.into(),
            base_deposit,
            deposit_policy: DepositPolicy::default(),
            route_price_events: RoutePriceEvents::default(),
            start_paused: false,
        }
    }

    pub fn with_deposit_policy(mut self, policy: DepositPolicy) -> Self {
        self.deposit_policy = policy;
        self
    }

    pub fn with_route_price_events(mut self, policy: RoutePriceEvents) -> Self {
        self.route_price_events = policy;
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.start_paused = paused;
        self
    }

    /// Loads a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine_id.is_empty() {
            return Err(TollError::InvalidConfig("engine_id cannot be empty".into()));
        }
        if self.beneficiary.is_empty() {
            return Err(TollError::InvalidConfig("beneficiary cannot be empty".into()));
        }
        if self.base_deposit.is_zero() {
            return Err(TollError::InvalidConfig(
                "base_deposit must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
