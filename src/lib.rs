// ============================================================================
// gallerystore Library
// ============================================================================
//
// An embedded record store for gallery-browsing caches, with a versioned
// schema catalog and a step-wise, atomic migration engine. Migration runs
// synchronously, gating normal store access: a host checks
// `requires_migration` before opening the store and, if needed, runs
// `migrate_store` to completion first.

pub mod core;
pub mod migrate;
pub mod schema;
pub mod store;

// Re-export main types for convenience
pub use crate::core::{Attribute, AttributeType, EntitySchema, Record, Result, StoreError, Value};
pub use migrate::{MigrationCoordinator, MigrationStep};
pub use schema::{SchemaModel, SchemaVersion, VersionCatalog};
pub use store::{StoreImage, StoreMetadata, WalEntry, WalManager};
