mod readers;
mod simulate;

pub(crate) use readers::{ReaderCommands, public_key_command, readers_command};
pub(crate) use simulate::simulate_command;
