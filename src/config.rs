//! Application configuration
//!
//! Resolved from an optional TOML file: an explicit path wins, then
//! `presenter.toml` in the working directory, then the platform config
//! directory. Anything unspecified falls back to defaults.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::constants::{CLIENT_SETTINGS_FILE, DEFAULT_BIND_ADDRESS, DEFAULT_PORT, SETTINGS_FILE};
use crate::error::Error;

const CONFIG_FILE: &str = "presenter.toml";

/// Raw shape of the config file. Everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub library: Option<PathBuf>,
    pub settings_file: Option<PathBuf>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    /// JSON library served by the data provider, when configured.
    pub library: Option<PathBuf>,
    pub settings_file: PathBuf,
}

impl AppConfig {
    pub fn resolve(file: Option<FileConfig>) -> Self {
        let file = file.unwrap_or_default();

        Self {
            bind_address: file
                .bind_address
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port: file.port.unwrap_or(DEFAULT_PORT),
            library: file.library,
            settings_file: file
                .settings_file
                .unwrap_or_else(|| data_dir().join(SETTINGS_FILE)),
        }
    }

    pub fn addr(&self) -> Result<SocketAddr, Error> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|err| Error::Config(format!("invalid bind address: {err}")))
    }
}

fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "gurbani-presenter")
        .map(|dirs| dirs.data_dir().to_owned())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default location of the client-local settings blob.
pub fn client_settings_path() -> PathBuf {
    data_dir().join(CLIENT_SETTINGS_FILE)
}

/// Locate the config file to load, if any.
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_owned());
    }

    let cwd_config = PathBuf::from(CONFIG_FILE);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    if let Some(dirs) = directories::ProjectDirs::from("", "", "gurbani-presenter") {
        let config = dirs.config_dir().join(CONFIG_FILE);
        if config.exists() {
            return Some(config);
        }
    }

    None
}

/// Parse a config file.
pub fn load_config(path: &Path) -> Result<FileConfig, Error> {
    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|err| Error::Config(err.to_string()))
}
