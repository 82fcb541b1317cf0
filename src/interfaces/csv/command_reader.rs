use crate::application::command::Command;
use crate::domain::money::Amount;
use crate::domain::party::PartyId;
use crate::domain::route::Route;
use crate::domain::vehicle::{Multiplier, VehicleType};
use crate::error::{Result, TollError};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    AddBooth,
    RemoveBooth,
    SetVehicleType,
    SetMultiplier,
    SetPaused,
    Enter,
    Exit,
    SetRoutePrice,
    ClearPending,
    Withdraw,
}

/// One row of the command file. Which columns are required depends on `op`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRecord {
    pub op: CommandKind,
    pub party: Option<String>,
    pub entry: Option<String>,
    pub exit: Option<String>,
    pub secret: Option<String>,
    pub vehicle_type: Option<u32>,
    pub value: Option<u64>,
}

fn required<T>(field: Option<T>, name: &str, op: CommandKind) -> Result<T> {
    field.ok_or_else(|| TollError::InvalidCommand(format!("{op:?} requires `{name}`")))
}

impl CommandRecord {
    fn party(&mut self) -> Result<PartyId> {
        required(self.party.take(), "party", self.op).map(PartyId::from)
    }

    fn route(&mut self) -> Result<Route> {
        let entry = required(self.entry.take(), "entry", self.op)?;
        let exit = required(self.exit.take(), "exit", self.op)?;
        Ok(Route::new(entry, exit))
    }
}

impl TryFrom<CommandRecord> for Command {
    type Error = TollError;

    fn try_from(mut record: CommandRecord) -> Result<Self> {
        let op = record.op;
        let command = match op {
            CommandKind::AddBooth => Command::AddBooth {
                booth: record.party()?,
            },
            CommandKind::RemoveBooth => Command::RemoveBooth {
                booth: record.party()?,
            },
            CommandKind::SetVehicleType => Command::SetVehicleType {
                vehicle: record.party()?,
                vehicle_type: VehicleType(required(record.vehicle_type, "vehicle_type", op)?),
            },
            CommandKind::SetMultiplier => Command::SetMultiplier {
                vehicle_type: VehicleType(required(record.vehicle_type, "vehicle_type", op)?),
                multiplier: Multiplier::new(required(record.value, "value", op)?),
            },
            CommandKind::SetPaused => match required(record.value, "value", op)? {
                0 => Command::SetPaused { paused: false },
                1 => Command::SetPaused { paused: true },
                other => {
                    return Err(TollError::InvalidCommand(format!(
                        "set_paused expects 0 or 1, got {other}"
                    )));
                }
            },
            CommandKind::Enter => Command::Enter {
                vehicle: record.party()?,
                entry_booth: required(record.entry.take(), "entry", op)?.into(),
                secret: required(record.secret.take(), "secret", op)?,
                paid: Amount::new(required(record.value, "value", op)?),
            },
            CommandKind::Exit => Command::Exit {
                exit_booth: required(record.exit.take(), "exit", op)?.into(),
                secret: required(record.secret.take(), "secret", op)?,
            },
            CommandKind::SetRoutePrice => Command::SetRoutePrice {
                route: record.route()?,
                price: Amount::new(required(record.value, "value", op)?),
            },
            CommandKind::ClearPending => {
                let count = required(record.value, "value", op)?;
                Command::ClearPending {
                    caller: record.party()?,
                    route: record.route()?,
                    count: usize::try_from(count).map_err(|_| TollError::ArithmeticOverflow)?,
                }
            }
            CommandKind::Withdraw => Command::Withdraw {
                party: record.party()?,
            },
        };
        Ok(command)
    }
}

/// Reads engine commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Command>`.
/// It trims whitespace and accepts short rows, so unused trailing columns may be omitted.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and converts commands.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize::<CommandRecord>()
            .map(|result| result.map_err(TollError::from).and_then(Command::try_from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "op, party, entry, exit, secret, vehicle_type, value\n";

    fn read(rows: &str) -> Vec<Result<Command>> {
        let data = format!("{HEADER}{rows}");
        CommandReader::new(data.as_bytes()).commands().collect()
    }

    #[test]
    fn test_reader_valid_stream() {
        let results = read(
            "add_booth, b1,,,,,\n\
             set_multiplier,,,,, 1, 2\n\
             enter, v1, b1,, s3cret,, 200\n\
             exit,,, b2, s3cret,,\n\
             set_route_price,, b1, b2,,, 60\n\
             clear_pending, anyone, b1, b2,,, 1\n",
        );
        assert_eq!(results.len(), 6);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Command::AddBooth { booth: "b1".into() }
        );
        assert_eq!(
            results[1].as_ref().unwrap(),
            &Command::SetMultiplier {
                vehicle_type: VehicleType(1),
                multiplier: Multiplier::new(2),
            }
        );
        assert_eq!(
            results[2].as_ref().unwrap(),
            &Command::Enter {
                vehicle: "v1".into(),
                entry_booth: "b1".into(),
                secret: "s3cret".into(),
                paid: Amount::new(200),
            }
        );
        assert_eq!(
            results[3].as_ref().unwrap(),
            &Command::Exit {
                exit_booth: "b2".into(),
                secret: "s3cret".into(),
            }
        );
        assert_eq!(
            results[4].as_ref().unwrap(),
            &Command::SetRoutePrice {
                route: Route::new("b1", "b2"),
                price: Amount::new(60),
            }
        );
        assert_eq!(
            results[5].as_ref().unwrap(),
            &Command::ClearPending {
                caller: "anyone".into(),
                route: Route::new("b1", "b2"),
                count: 1,
            }
        );
    }

    #[test]
    fn test_reader_short_rows() {
        let results = read("withdraw, v1\n");
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Command::Withdraw {
                party: "v1".into()
            }
        );
    }

    #[test]
    fn test_reader_malformed_line() {
        let results = read("teleport, v1,,,,,\n");
        assert!(matches!(results[0], Err(TollError::CsvError(_))));
    }

    #[test]
    fn test_reader_missing_field() {
        let results = read("enter, v1, b1,,,, 200\n");
        assert!(matches!(results[0], Err(TollError::InvalidCommand(_))));
    }

    #[test]
    fn test_reader_set_paused_flag() {
        let results = read("set_paused,,,,,, 1\nset_paused,,,,,, 0\nset_paused,,,,,, 7\n");
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Command::SetPaused { paused: true }
        );
        assert_eq!(
            results[1].as_ref().unwrap(),
            &Command::SetPaused { paused: false }
        );
        assert!(results[2].is_err());
    }
}
