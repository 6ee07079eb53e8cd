use chrono_tz::Tz;
use eyre::{Result, eyre};
use std::path::PathBuf;

pub const API_KEY_VAR: &str = "LIMITLESS_API_KEY";
pub const API_URL_VAR: &str = "LIMITLESS_API_URL";
pub const DEFAULT_TARGET_DIR: &str = "export";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// Configuration required to run the export process.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub target_dir: PathBuf,
    pub timezone: Tz,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from(DEFAULT_TARGET_DIR),
            timezone: DEFAULT_TIMEZONE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    /// Named after the record's own start time.
    Exported,
    /// Named after the current time plus the record index.
    Fallback,
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| eyre!("Unknown timezone '{}': {}", name, e))
}

/// Read a variable from the process environment, ignoring empty values.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load `.env` from the working directory if there is one.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
    }
}
