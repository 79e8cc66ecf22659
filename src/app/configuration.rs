use crate::Statistics;
use color_eyre::eyre::eyre;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::{env, path::PathBuf};

#[derive(Debug, Deserialize)]
pub(crate) struct Configuration {
    pub(crate) contour: ContourConfiguration,
    pub(crate) exchange: ExchangeConfiguration,
    pub(crate) output: OutputConfiguration,
}

/// The reference object sliced by the binary
#[derive(Debug, Deserialize)]
pub(crate) struct ContourConfiguration {
    pub(crate) nt: isize,
    pub(crate) ntau: usize,
    pub(crate) dt: f64,
    pub(crate) beta: f64,
    pub(crate) energies: Vec<f64>,
    #[serde(default)]
    pub(crate) statistics: Statistics,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExchangeConfiguration {
    pub(crate) ranks: usize,
    #[serde(default)]
    pub(crate) root: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OutputConfiguration {
    pub(crate) archive: PathBuf,
    pub(crate) log_directory: PathBuf,
}

impl Configuration {
    /// Read the configuration from `path`, or `.config/default` when none is given
    pub(crate) fn build(path: Option<&std::path::Path>) -> color_eyre::Result<Self> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let base = match path {
            Some(path) => File::from(path),
            None => File::with_name(".config/default"),
        };
        let s = Config::builder()
            .add_source(base)
            // Optional overrides for the current run mode
            .add_source(File::with_name(&format!(".config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("KELDYSH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        s.try_deserialize()
            .map_err(|e| eyre!(format!("Failed to deserialize the config file: {:?}", e)))
    }
}
