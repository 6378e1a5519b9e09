//! Configuration loading for buff definitions
//!
//! Definitions are loaded from TOML files in two locations:
//! - **Builtin**: Shipped with the server (read-only)
//! - **Custom**: Operator-created definitions (editable)
//!
//! Custom definitions override builtins with the same name.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use thiserror::Error;

use super::definition::{BuffDefinition, DefinitionConfig, MAX_EFFECT_SLOTS};
use super::{BuffCatalog, CommandLookup};
use crate::error::CatalogError;
use crate::ids::BuffId;

/// Combined set of buff definitions and grantable commands
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    /// All buff definitions, keyed by id
    buffs: HashMap<BuffId, Arc<BuffDefinition>>,

    /// Lower-cased command names
    commands: HashSet<String>,
}

impl DefinitionSet {
    /// Create an empty definition set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add definitions from a config, returns names of any duplicates.
    /// Later definitions replace earlier ones with the same id.
    pub fn add_config(&mut self, config: DefinitionConfig) -> Vec<String> {
        let mut duplicates = Vec::new();

        for buff in config.buffs {
            let name = buff.name.clone();
            if self.insert(buff).is_some() {
                duplicates.push(name);
            }
        }

        for command in config.commands {
            self.add_command(&command);
        }

        duplicates.sort();
        duplicates
    }

    /// Insert one definition, returning the one it replaced
    pub fn insert(&mut self, def: BuffDefinition) -> Option<Arc<BuffDefinition>> {
        self.buffs.insert(def.id(), Arc::new(def))
    }

    pub fn add_command(&mut self, name: &str) {
        self.commands.insert(name.to_lowercase());
    }

    /// Get a buff definition by id
    pub fn get(&self, id: BuffId) -> Option<&Arc<BuffDefinition>> {
        self.buffs.get(&id)
    }

    /// Get a buff definition by (case-insensitive) name
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<BuffDefinition>> {
        self.get(BuffId::from_name(name))
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<BuffDefinition>> {
        self.buffs.values()
    }

    pub fn len(&self) -> usize {
        self.buffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffs.is_empty()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

impl BuffCatalog for DefinitionSet {
    fn lookup(&self, id: BuffId) -> Result<Option<Arc<BuffDefinition>>, CatalogError> {
        Ok(self.buffs.get(&id).cloned())
    }
}

impl CommandLookup for DefinitionSet {
    fn is_command(&self, name: &str) -> bool {
        self.commands.contains(&name.to_lowercase())
    }
}

/// Load definitions from builtin and custom config directories
///
/// # Arguments
/// * `builtin_dir` - Directory containing builtin TOML files (shipped with the server)
/// * `custom_dir` - Directory containing operator TOML files (optional)
///
/// # Returns
/// A `DefinitionSet` with all loaded definitions merged together.
/// Builtin definitions are loaded first, then custom definitions.
/// Custom definitions with the same name will override builtins.
pub fn load_definitions(
    builtin_dir: Option<&Path>,
    custom_dir: Option<&Path>,
) -> Result<DefinitionSet, ConfigError> {
    let mut set = DefinitionSet::new();

    if let Some(dir) = builtin_dir
        && dir.exists()
    {
        load_directory(&mut set, dir, "builtin")?;
    }

    if let Some(dir) = custom_dir
        && dir.exists()
    {
        load_directory(&mut set, dir, "custom")?;
    }

    tracing::info!(
        buffs = set.len(),
        commands = set.command_count(),
        "Loaded buff definitions"
    );
    Ok(set)
}

/// Load all TOML files from a directory, in file-name order
fn load_directory(set: &mut DefinitionSet, dir: &Path, source: &str) -> Result<(), ConfigError> {
    let entries = fs::read_dir(dir).map_err(|e| ConfigError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    for path in paths {
        match load_file(&path) {
            Ok(config) => {
                let duplicates = set.add_config(config);
                if !duplicates.is_empty() {
                    tracing::warn!(
                        source,
                        file = ?path.file_name(),
                        ?duplicates,
                        "Duplicate buff definitions replaced"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(source, file = ?path.file_name(), error = %e, "Failed to load definitions");
            }
        }
    }

    Ok(())
}

/// Load and validate a single TOML config file
pub fn load_file(path: &Path) -> Result<DefinitionConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: DefinitionConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    validate(&config).map_err(|reason| ConfigError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;

    Ok(config)
}

/// Save a config to a TOML file
pub fn save_file(path: &Path, config: &DefinitionConfig) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;

    fs::write(path, contents).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

fn validate(config: &DefinitionConfig) -> Result<(), String> {
    for def in &config.buffs {
        if def.name.trim().is_empty() {
            return Err("buff with empty name".to_string());
        }
        if def.effects.len() > MAX_EFFECT_SLOTS {
            return Err(format!(
                "buff '{}' has {} effect slots (max {})",
                def.name,
                def.effects.len(),
                MAX_EFFECT_SLOTS
            ));
        }
    }
    Ok(())
}

/// Get the default custom definitions directory
pub fn default_custom_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("buffkeep").join("definitions"))
}

/// Errors that can occur during config loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Serialize error for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("Invalid definitions in {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
