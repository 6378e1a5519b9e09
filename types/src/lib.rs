//! Shared configuration types for buffkeep.

pub mod config;
pub mod formatting;

pub use config::{EngineConfig, LogConfig};
