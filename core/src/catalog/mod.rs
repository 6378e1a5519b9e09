//! Static buff and command data
//!
//! The engine only reads definitions through [`BuffCatalog`] and
//! [`CommandLookup`]; [`DefinitionSet`] is the in-memory implementation
//! backed by TOML files.

mod config;
mod definition;

use std::sync::Arc;

use crate::error::CatalogError;
use crate::ids::BuffId;

pub use config::{
    ConfigError, DefinitionSet, default_custom_dir, load_definitions, load_file, save_file,
};
pub use definition::{BuffDefinition, DefinitionConfig, EffectSlot, MAX_EFFECT_SLOTS};

/// Read-only lookup of buff definitions by id.
pub trait BuffCatalog: Send + Sync {
    fn lookup(&self, id: BuffId) -> Result<Option<Arc<BuffDefinition>>, CatalogError>;
}

/// Tells whether an effect name refers to a grantable command.
pub trait CommandLookup: Send + Sync {
    fn is_command(&self, name: &str) -> bool;
}
