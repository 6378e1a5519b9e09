pub mod buffs;
pub mod catalog;
pub mod clock;
pub mod entity;
pub mod error;
pub mod events;
pub mod ids;
pub mod scheduler;
pub mod service;

// Re-exports for convenience
pub use buffs::{AddOutcome, BuffCallback, BuffEngine, CheckOutcome};
pub use catalog::{BuffCatalog, BuffDefinition, CommandLookup, DefinitionSet, load_definitions};
pub use clock::{LogicalTime, ManualClock, TokioWorldClock, WorldClock};
pub use entity::{EntityKind, EntityRecord, EntityRegistry};
pub use error::{BuffError, CatalogError, ServiceError};
pub use events::{BuffNotification, BuffSignal, SignalHandler};
pub use ids::{BuffId, EntityId};
pub use service::{BuffService, BuffServiceHandle, ServiceTasks};
