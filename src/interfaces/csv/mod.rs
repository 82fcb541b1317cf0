pub mod balance_writer;
pub mod command_reader;
pub mod event_writer;
