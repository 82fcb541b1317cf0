use crate::domain::money::Amount;
use crate::domain::party::PartyId;
use crate::error::Result;
use std::io::Write;

/// Writes withdrawable balances as `party,balance` CSV.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes the header and one row per balance, in the order given.
    pub fn write_balances(&mut self, balances: &[(PartyId, Amount)]) -> Result<()> {
        self.writer.write_record(["party", "balance"])?;
        for (party, amount) in balances {
            self.writer
                .write_record([party.as_str(), &amount.value().to_string()])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
