//! The migration driver. Decides whether a store needs migrating, walks the
//! forward-only version chain one step at a time through temporary stores,
//! and swaps the result into the canonical location in a single atomic
//! replace. The canonical store is never written until that replace, so any
//! earlier failure leaves it exactly as it was.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::core::{Result, StoreError};
use crate::schema::{SchemaModel, SchemaVersion, VersionCatalog};
use crate::store::maintenance;

use super::step::MigrationStep;

pub struct MigrationCoordinator;

impl MigrationCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Whether the store at `store_path` must be migrated before it can be
    /// opened at `target`. A missing or unrecognizable file is a fresh store:
    /// no migration needed. A store that self-reports a fingerprint matching
    /// no known model is corrupted, not fresh.
    pub fn requires_migration(&self, store_path: &Path, target: SchemaVersion) -> Result<bool> {
        let Some(meta) = maintenance::metadata(store_path) else {
            return Ok(false);
        };
        let current = SchemaModel::resolve_version(&meta.schema_signature).ok_or_else(|| {
            StoreError::DatabaseCorrupted(format!(
                "Store at {} reports a schema fingerprint matching no known model",
                store_path.display()
            ))
        })?;
        Ok(current != target)
    }

    /// Migrates the store at `store_path` up to `target`, step by adjacent
    /// step. All intermediate work happens in temporary stores beside the
    /// canonical one; an observer opening the canonical path mid-migration
    /// sees either the untouched original or the fully migrated result.
    pub fn migrate_store(&self, store_path: &Path, target: SchemaVersion) -> Result<()> {
        maintenance::force_checkpoint(store_path)?;

        let meta = maintenance::metadata(store_path).ok_or_else(|| {
            StoreError::DatabaseCorrupted(format!(
                "Store at {} became unreadable after checkpoint",
                store_path.display()
            ))
        })?;
        let current = SchemaModel::resolve_version(&meta.schema_signature).ok_or_else(|| {
            StoreError::DatabaseCorrupted(format!(
                "Cannot migrate store at {}: unknown schema version",
                store_path.display()
            ))
        })?;
        if current == target {
            return Ok(());
        }

        let steps = migration_steps(current, target)?;
        info!(
            "Migrating store at {} from {} to {} in {} steps",
            store_path.display(),
            current,
            target,
            steps.len()
        );

        let mut working = store_path.to_path_buf();
        for step in &steps {
            let produced = temp_store_path(store_path, step);
            if let Err(err) = step.run(&working, &produced) {
                // Best-effort cleanup; a failure here leaks exactly one
                // temporary store file, which the host may remove offline.
                if maintenance::destroy_store(&produced).is_err() {
                    warn!(
                        "Leaking temporary store at {} after failed step",
                        produced.display()
                    );
                }
                let (StoreError::DatabaseCorrupted(msg) | StoreError::Configuration(msg)) = err;
                return Err(StoreError::DatabaseCorrupted(format!(
                    "Migration step {} to {} failed for store at {}: {}",
                    step.source_version(),
                    step.destination_version(),
                    store_path.display(),
                    msg
                )));
            }
            if working != store_path {
                maintenance::destroy_store(&working)?;
            }
            working = produced;
        }

        maintenance::replace_store(store_path, &working)?;
        if working != store_path {
            maintenance::destroy_store(&working)?;
        }
        info!(
            "Store at {} migrated to {}",
            store_path.display(),
            target
        );
        Ok(())
    }

    /// Convenience for hosts: migrate to the catalog's latest version.
    pub fn migrate_to_current(&self, store_path: &Path) -> Result<()> {
        self.migrate_store(store_path, VersionCatalog::current()?)
    }
}

impl Default for MigrationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered steps from `from` to `target`, walking the catalog's successor
/// chain. Migration never skips versions and never moves backward; a target
/// the chain cannot reach is a configuration error.
fn migration_steps(from: SchemaVersion, target: SchemaVersion) -> Result<Vec<MigrationStep>> {
    let mut steps = Vec::new();
    let mut cursor = from;
    while cursor != target {
        let next = VersionCatalog::next_version(cursor).ok_or_else(|| {
            StoreError::Configuration(format!(
                "No forward migration path from {} to {}",
                from, target
            ))
        })?;
        steps.push(MigrationStep::new(cursor, next)?);
        cursor = next;
    }
    Ok(steps)
}

/// Fresh disposable location for one step's output, beside the canonical
/// store (`cache.store` -> `cache.store.version1-version2.migrating`).
fn temp_store_path(store_path: &Path, step: &MigrationStep) -> PathBuf {
    let mut os = store_path.as_os_str().to_os_string();
    os.push(format!(
        ".{}-{}.migrating",
        step.source_version(),
        step.destination_version()
    ));
    PathBuf::from(os)
}
