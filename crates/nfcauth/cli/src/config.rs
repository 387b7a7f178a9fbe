//! Layered settings: defaults, then the TOML file, then `NFCAUTH_` variables

use std::path::Path;

use eyre::ensure;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use nfcauth_card::CardConfig;
use nfcauth_reader::ReaderConfig;
use tracing::debug;

const DEFAULT_CONFIG_FILE: &str = "nfcauth.toml";
const ENV_PREFIX: &str = "NFCAUTH_";

/// Card and reader settings for one invocation
#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) card: CardConfig,
    pub(crate) reader: ReaderConfig,
}

/// Load settings; an explicitly named file must exist
pub(crate) fn load(path: Option<&Path>) -> eyre::Result<Settings> {
    let file = match path {
        Some(path) => {
            ensure!(path.exists(), "config file {} not found", path.display());
            path
        }
        None => Path::new(DEFAULT_CONFIG_FILE),
    };

    // Nested keys are separated by a double underscore, e.g.
    // NFCAUTH_CARD__DATA_DIR or NFCAUTH_READER__READER_ID
    let figment = Figment::new()
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let settings = Settings {
        card: CardConfig::from_figment(&figment)?,
        reader: ReaderConfig::from_figment(&figment)?,
    };
    debug!(?settings, "Loaded settings");
    Ok(settings)
}
