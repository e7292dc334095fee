//! Reading workshop data files.
//!
//! Every data file is looked up by base name and may be written as RON,
//! TOML or JSON. The extension picks the parser. Having two formats of the
//! same file side by side is an error rather than a silent preference.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use workshop_core::recipe::CatalogError;

/// Everything that can go wrong while turning a data directory into a world.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("{dir} has no '{file}' file (.ron, .toml or .json)")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("{file}: expected a .ron, .toml or .json extension")]
    UnsupportedFormat { file: PathBuf },

    #[error("both {a} and {b} exist; keep only one")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("{file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("{file}: '{title}' has unknown card kind '{kind}'")]
    UnknownCardKind {
        file: PathBuf,
        title: String,
        kind: String,
    },

    #[error("{file}: '{name}' is defined more than once")]
    DuplicateName { file: PathBuf, name: String },

    /// Parsed fine but the value is unusable (empty kind, non-positive time).
    #[error("{file}: '{name}': {detail}")]
    Invalid {
        file: PathBuf,
        name: String,
        detail: String,
    },

    #[error("{file}: {source}")]
    Catalog {
        file: PathBuf,
        #[source]
        source: CatalogError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    /// Lookup order when searching a directory.
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }

    fn from_extension(ext: &str) -> Option<Format> {
        Format::ALL.into_iter().find(|f| f.extension() == ext)
    }

    fn parse<T: DeserializeOwned>(self, text: &str, path: &Path) -> Result<T, DataLoadError> {
        let parsed = match self {
            Format::Ron => ron::from_str(text).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|detail| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail,
        })
    }
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(Format::from_extension)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

/// Locate `{base_name}.{ron,toml,json}` in `dir`. `None` when absent.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut present = Format::ALL
        .into_iter()
        .map(|f| dir.join(format!("{base_name}.{}", f.extension())))
        .filter(|p| p.is_file());

    let first = present.next();
    match (first, present.next()) {
        (Some(a), Some(b)) => Err(DataLoadError::ConflictingFormats { a, b }),
        (first, _) => Ok(first),
    }
}

pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

/// Parse a single value, such as the config table.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    format.parse(&fs::read_to_string(path)?, path)
}

/// Parse a list of entries.
///
/// RON and JSON files are the list itself. TOML cannot have a top-level
/// array, so there the entries live under `[[toml_key]]`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let text = fs::read_to_string(path)?;
    if format != Format::Toml {
        return format.parse(&text, path);
    }

    let mut table: toml::Table = format.parse(&text, path)?;
    let entries = table.remove(toml_key).ok_or_else(|| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: format!("no [[{toml_key}]] entries"),
    })?;
    entries
        .try_into()
        .map_err(|e: toml::de::Error| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        })
}

/// Record `name` as used. Fails if it was already taken in this file.
pub fn claim_name(seen: &mut HashSet<String>, name: &str, file: &Path) -> Result<(), DataLoadError> {
    if seen.insert(name.to_string()) {
        Ok(())
    } else {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    }
}
