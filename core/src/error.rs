use thiserror::Error;

use crate::ids::{BuffId, EntityId};

/// Failure reported by a [`BuffCatalog`](crate::catalog::BuffCatalog) backend.
///
/// A missing definition is not an error at this level (`Ok(None)`); this
/// covers the catalog itself being unreachable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("buff catalog unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by buff engine operations.
///
/// None of these are retried internally; the caller decides.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuffError {
    #[error("unknown buff {0}")]
    UnknownBuff(BuffId),

    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors from talking to a running buff service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("buff service stopped")]
    Stopped,
}
