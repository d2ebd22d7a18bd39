use ohsheet::sheets::{AccessConfig, DRIVE_METADATA_SCOPE, SPREADSHEETS_SCOPE};
use ohsheet::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR_PREFIX: &str = "ohsheet";
const TOKEN_FILE: &str = "token.json";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Spreadsheet used when a command doesn't name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    pub google: GoogleConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GoogleConfig {
    /// Client secret file downloaded from the Google Cloud console
    pub credentials: PathBuf,
    /// Token cache, defaults to the XDG cache directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<PathBuf>,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

/// Sheets access plus the Drive metadata scope used by `find`
fn default_scopes() -> Vec<String> {
    vec![
        SPREADSHEETS_SCOPE.to_string(),
        DRIVE_METADATA_SCOPE.to_string(),
    ]
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Err(AppError::Config(format!(
                "Config file not found at {:?}. Please create one.",
                config_path
            )));
        }

        let contents = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        if config.google.credentials.as_os_str().is_empty() {
            return Err(AppError::Config(
                "google.credentials must be set in config file".to_string(),
            ));
        }

        if config.google.scopes.is_empty() {
            return Err(AppError::Config("google.scopes must not be empty".to_string()));
        }

        Ok(config)
    }

    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.google.token {
            Some(path) => Ok(path.clone()),
            None => Self::cache_file(TOKEN_FILE),
        }
    }

    pub fn access_config(&self) -> Result<AccessConfig> {
        Ok(AccessConfig::new(
            self.token_path()?,
            &self.google.credentials,
            self.google.scopes.iter().cloned(),
        ))
    }

    /// Spreadsheet from the command line, falling back to the configured default
    pub fn spreadsheet_id(&self, requested: Option<&str>) -> Result<String> {
        requested
            .map(str::to_string)
            .or_else(|| self.spreadsheet_id.clone())
            .ok_or_else(|| {
                AppError::Config(
                    "No spreadsheet given and no spreadsheet_id in config file".to_string(),
                )
            })
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        let xdg_dirs = Self::xdg_dirs();
        xdg_dirs
            .place_config_file("config.toml")
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))
    }

    /// Get the cache directory path
    pub fn cache_dir() -> Result<PathBuf> {
        let xdg = Self::xdg_dirs();
        xdg.get_cache_home()
            .ok_or_else(|| AppError::Config("Failed to determine cache directory".to_string()))
    }

    /// Get a cache file path
    pub fn cache_file(filename: &str) -> Result<PathBuf> {
        let xdg = Self::xdg_dirs();
        xdg.place_cache_file(filename)
            .map_err(|e| AppError::Config(format!("Failed to create cache file path: {}", e)))
    }
}
