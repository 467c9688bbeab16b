//! File-level loading: simulation config from RON/TOML/JSON, and binary save
//! files.
//!
//! The config format is picked from the file extension. Every config field
//! has a default, so a file only needs the values it overrides.

use beltworks_core::config::{ConfigError, SimConfig};
use beltworks_core::economy::Economy;
use beltworks_core::serialize::{SaveData, SaveError, decode, encode};
use beltworks_core::world::World;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::info;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading or saving data files.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The config parsed but holds values the simulation cannot run with.
    #[error("invalid config in {file}: {source}")]
    Config {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// A save file failed to decode or apply.
    #[error("bad save file {file}: {source}")]
    Save {
        file: PathBuf,
        #[source]
        source: SaveError,
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
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `path` is only used in errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    path: &Path,
) -> Result<T, DataLoadError> {
    let parse_err = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

/// Load and validate a [`SimConfig`].
pub fn load_config(path: &Path) -> Result<SimConfig, DataLoadError> {
    let config: SimConfig = deserialize_file(path)?;
    config.validate().map_err(|source| DataLoadError::Config {
        file: path.to_path_buf(),
        source,
    })?;
    info!(file = %path.display(), tick_rate = config.tick_rate, "loaded sim config");
    Ok(config)
}

// ===========================================================================
// Save files
// ===========================================================================

/// Write a world's save to `path`.
pub fn write_save_file<E: Economy>(world: &World<E>, path: &Path) -> Result<(), DataLoadError> {
    let bytes = encode(&world.to_save_data());
    std::fs::write(path, &bytes)?;
    info!(file = %path.display(), bytes = bytes.len(), "wrote save");
    Ok(())
}

/// Read and decode a save file without touching any world.
pub fn read_save_file(path: &Path) -> Result<SaveData, DataLoadError> {
    let bytes = std::fs::read(path)?;
    decode(&bytes).map_err(|source| DataLoadError::Save {
        file: path.to_path_buf(),
        source,
    })
}

/// Read a save file and apply it to `world`. On error the world is unchanged.
pub fn load_save_into<E: Economy>(world: &mut World<E>, path: &Path) -> Result<(), DataLoadError> {
    let save = read_save_file(path)?;
    world.apply_save(&save).map_err(|source| DataLoadError::Save {
        file: path.to_path_buf(),
        source,
    })
}
