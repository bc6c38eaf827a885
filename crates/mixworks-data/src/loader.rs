//! Loading pipeline: finds the session config file, deserializes it in the
//! detected format and validates it into core [`SessionSettings`].
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers.

use crate::schema::SessionConfigData;
use mixworks_core::settings::SessionSettings;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Base name of the session config file, without extension.
pub const SESSION_FILE: &str = "session";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// Two halls share an id.
    #[error("duplicate hall id {id} in {file}")]
    DuplicateHall { file: PathBuf, id: u32 },

    /// The initial hall is not among the configured halls.
    #[error("initial hall {id} is not defined in {file}")]
    UnknownInitialHall { file: PathBuf, id: u32 },

    /// A value is outside its allowed range.
    #[error("invalid {field} in {file}: {detail}")]
    InvalidValue {
        file: PathBuf,
        field: &'static str,
        detail: String,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a config file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_config_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, ConfigError> {
    let extensions = ["ron", "toml", "json"];
    let mut found: Option<PathBuf> = None;

    for ext in &extensions {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(ref existing) = found {
                return Err(ConfigError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

/// Deserialize already-read content. `path` only labels errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    path: &Path,
) -> Result<T, ConfigError> {
    let parse_error = |detail: String| ConfigError::Parse {
        file: path.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

// ===========================================================================
// Session config
// ===========================================================================

/// Load `session.{ron,toml,json}` from `dir`.
///
/// A missing file yields the default settings. Fields absent from the file
/// keep their defaults.
pub fn load_session_config(dir: &Path) -> Result<SessionSettings, ConfigError> {
    let Some(path) = find_config_file(dir, SESSION_FILE)? else {
        tracing::info!(dir = %dir.display(), "no session config, using defaults");
        return Ok(SessionSettings::default());
    };
    tracing::debug!(file = %path.display(), "loading session config");
    let data: SessionConfigData = deserialize_file(&path)?;
    data.into_settings(&path)
}
