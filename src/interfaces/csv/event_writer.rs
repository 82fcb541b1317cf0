use crate::domain::event::RecordedEvent;
use crate::error::Result;
use std::io::Write;

/// Writes journal entries as JSON lines, one event per line.
pub fn write_events<W: Write>(mut sink: W, events: &[RecordedEvent]) -> Result<()> {
    for event in events {
        serde_json::to_writer(&mut sink, event)?;
        sink.write_all(b"\n")?;
    }
    sink.flush()?;
    Ok(())
}
