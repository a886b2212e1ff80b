//! Configuration loading.
//!
//! Sources, later ones winning:
//! 1. Defaults in code
//! 2. `medstock.toml` in the working directory (optional), or the file given with `--config`
//! 3. Environment variables with the `MEDSTOCK_` prefix (e.g. `MEDSTOCK_LEDGER_PATH`)

use std::path::{Path, PathBuf};

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use medstock_observability::LogFormat;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MedstockConfig {
    /// CSV mirror of the movement ledger.
    pub ledger_path: PathBuf,

    /// CSV medication catalog.
    pub catalog_path: PathBuf,

    pub log_format: LogFormat,
}

impl MedstockConfig {
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) => File::from(path).required(true),
            None => File::with_name("medstock").required(false),
        };

        config::Config::builder()
            .set_default("ledger_path", "hist_estoque.csv")?
            .set_default("catalog_path", "med_cadastro.csv")?
            .set_default("log_format", "pretty")?
            .add_source(file)
            .add_source(
                Environment::with_prefix("MEDSTOCK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
