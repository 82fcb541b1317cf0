use crate::domain::money::Amount;
use crate::domain::party::PartyId;
use crate::domain::route::Route;
use crate::domain::secret::SecretHash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TollError {
    #[error("operation unavailable: the engine is paused")]
    Paused,
    #[error("{0} is not registered")]
    NotRegistered(PartyId),
    #[error("vehicle {0} is not allowed on this road system")]
    NotAllowed(PartyId),
    #[error("{0} is not a toll booth")]
    NotABooth(PartyId),
    #[error("secret hash {0} has previously been used")]
    AlreadyUsed(SecretHash),
    #[error("no entry matches secret hash {0}")]
    UnknownSecret(SecretHash),
    #[error("secret hash {0} has already been reported on exit")]
    AlreadyReported(SecretHash),
    #[error("entry {0} is not open")]
    NotOpen(SecretHash),
    #[error("exit booth {0} is the same as the entry booth")]
    SameBooth(PartyId),
    #[error("deposit of {paid} is less than the required {required}")]
    InsufficientDeposit { required: Amount, paid: Amount },
    #[error("no price is set for route {0}")]
    NoPriceSet(Route),
    #[error("count cannot be zero")]
    ZeroCount,
    #[error("only {available} pending payments for route, {requested} requested")]
    InsufficientQueue { requested: usize, available: usize },
    #[error("{0} has no funds to withdraw")]
    NoFunds(PartyId),
    #[error("route {0} does not connect two registered booths")]
    NotBooths(Route),
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    #[error("invalid secret hash: {0}")]
    InvalidSecretHash(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("snapshot belongs to engine {found}, expected {expected}")]
    SnapshotMismatch { expected: String, found: String },
    #[error("payout to {party} failed: {reason}")]
    PayoutFailed { party: PartyId, reason: String },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for TollError {
    fn from(err: rocksdb::Error) -> Self {
        TollError::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, TollError>;
