//! Lab configuration loading: format detection (RON/JSON/TOML), file
//! discovery, deserialization and compound tag resolution.

use crate::schema::LabsData;
use labworks_core::compound::Compound;
use labworks_core::config::{ByproductRule, ConfigError, LabConfig};
use labworks_core::deficit::TargetTable;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Base name of the lab configuration file.
pub const LABS_FILE: &str = "labs";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// The file parsed but describes a configuration the planner rejects.
    #[error("invalid configuration in {file}: {source}")]
    InvalidConfig {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
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
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let parse_err = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

fn resolve_compound(tag: &str, file: &Path) -> Result<Compound, DataLoadError> {
    tag.parse().map_err(|_| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: tag.to_string(),
        expected_kind: "compound",
    })
}

/// Turn raw file contents into a validated [`LabConfig`].
pub fn resolve_lab_config(data: LabsData, file: &Path) -> Result<LabConfig, DataLoadError> {
    let targets = data
        .targets
        .iter()
        .map(|(tag, &level)| Ok((resolve_compound(tag, file)?, level)))
        .collect::<Result<TargetTable, DataLoadError>>()?;

    let byproducts = data
        .byproducts
        .iter()
        .map(|b| {
            Ok(ByproductRule {
                compound: resolve_compound(&b.compound, file)?,
                threshold: b.threshold,
            })
        })
        .collect::<Result<Vec<_>, DataLoadError>>()?;

    let config = LabConfig {
        targets,
        byproducts,
        tuning: data.tuning,
    };
    config
        .validate()
        .map_err(|source| DataLoadError::InvalidConfig {
            file: file.to_path_buf(),
            source,
        })?;
    Ok(config)
}

/// Load and validate a single configuration file.
pub fn load_lab_config_file(path: &Path) -> Result<LabConfig, DataLoadError> {
    let data: LabsData = deserialize_file(path)?;
    debug!(
        file = %path.display(),
        targets = data.targets.len(),
        byproducts = data.byproducts.len(),
        "parsed lab config"
    );
    resolve_lab_config(data, path)
}

/// Load `labs.{ron,toml,json}` from `dir`.
pub fn load_lab_config(dir: &Path) -> Result<LabConfig, DataLoadError> {
    let path = require_data_file(dir, LABS_FILE)?;
    let config = load_lab_config_file(&path)?;
    info!(file = %path.display(), targets = config.targets.len(), "lab config loaded");
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
