use crate::error::{Error, Result};
use crate::hash::{Hasher, NameRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Path to the registry of group and instance names.
    pub file_registry: Option<PathBuf>,

    /// Path to the registry of type names.
    pub type_registry: Option<PathBuf>,

    /// Payloads larger than this many bytes are compressed when packing.
    pub compress_threshold: Option<usize>,

    /// Whether to pack archives with 64-bit offsets.
    pub dbbf: bool,

    /// Names of enabled converters, all of them when missing.
    pub converters: Option<Vec<String>>,
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Settings> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| Error::Settings(format!("{:?}: {}", path, e)))
    }

    /// Creates a `Hasher` with the configured registries.
    pub fn create_hasher(&self) -> Result<Hasher> {
        let files = match &self.file_registry {
            Some(p) => NameRegistry::from_file(p)?,
            None => NameRegistry::new(),
        };
        let types = match &self.type_registry {
            Some(p) => NameRegistry::from_file(p)?,
            None => NameRegistry::new(),
        };
        Ok(Hasher::with_registries(files, types))
    }
}

/// Loads settings from the file named by `DBPF_SETTINGS` or from
/// `./dbpf_settings.json`. Missing file means default settings.
pub fn load_settings() -> Result<Settings> {
    let path = std::env::var("DBPF_SETTINGS").unwrap_or_else(|_| "./dbpf_settings.json".into());
    let path: PathBuf = path.into();

    if !path.exists() {
        return Ok(Settings::default());
    }
    Settings::from_file(&path)
}
