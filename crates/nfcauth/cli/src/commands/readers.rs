//! Commands for the card's reader registry and identity

use clap::Subcommand;
use nfcauth_card::{CardConfig, JsonFileRegistry, Registry, SigningService, SoftwareSigner};
use tracing::info;

/// Reader registry subcommands
#[derive(Subcommand)]
pub(crate) enum ReaderCommands {
    /// List registered readers
    List,

    /// Forget a registered reader
    Delete {
        /// Reader to delete
        #[arg(required = true)]
        reader_id: String,
    },
}

/// Run a reader registry subcommand
pub(crate) fn readers_command(card: &CardConfig, command: ReaderCommands) -> eyre::Result<()> {
    card.ensure_data_dir()?;
    let registry = JsonFileRegistry::open(card.registry_path())?;

    match command {
        ReaderCommands::List => {
            let readers = registry.list()?;
            if readers.is_empty() {
                println!("No registered readers");
            }
            for reader in readers {
                println!(
                    "{}\t{}\t{} ({})",
                    reader.reader_id, reader.reader_name, reader.user_name, reader.user_id
                );
            }
        }
        ReaderCommands::Delete { reader_id } => {
            if registry.delete(&reader_id)? {
                info!(reader_id = %reader_id, "Reader deleted");
                println!("Deleted reader {reader_id}");
            } else {
                println!("No reader {reader_id} registered");
            }
        }
    }

    Ok(())
}

/// Print the card public key, creating the card key on first use
pub(crate) fn public_key_command(card: &CardConfig) -> eyre::Result<()> {
    card.ensure_data_dir()?;
    let signer = SoftwareSigner::load_or_generate(card.key_path())?;
    println!("{}", signer.public_key()?);
    Ok(())
}
