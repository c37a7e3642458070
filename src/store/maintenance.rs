//! Low-level store operations used by the migration coordinator: metadata
//! probing, checkpoint forcing, destroy, and atomic replace. Every failure
//! here surfaces as `DatabaseCorrupted`; proceeding with a half-flushed or
//! half-replaced store risks silent data loss.

use std::fs;
use std::io::Write;
use std::path::Path;

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::core::{Result, StoreError};
use crate::schema::SchemaModel;

use super::image::{StoreImage, StoreMetadata};
use super::wal::{wal_path, WalManager};

/// Reads the store's self-reported metadata without touching it otherwise.
///
/// Returns `None` for a missing or unreadable file: callers treat "no
/// metadata" as "not a recognizable store", which in turn means no migration
/// is needed for it.
pub fn metadata(store_path: &Path) -> Option<StoreMetadata> {
    if !store_path.exists() {
        return None;
    }
    StoreImage::load(store_path).ok().map(|image| image.metadata)
}

/// Flushes all pending WAL entries into the main store file and truncates the
/// side file, so the on-disk image reflects every committed write before any
/// file-level copy or migration touches it.
pub fn force_checkpoint(store_path: &Path) -> Result<()> {
    let meta = metadata(store_path).ok_or_else(|| {
        StoreError::DatabaseCorrupted(format!(
            "Cannot checkpoint unreadable store at {}",
            store_path.display()
        ))
    })?;
    let version = SchemaModel::resolve_version(&meta.schema_signature).ok_or_else(|| {
        StoreError::DatabaseCorrupted(format!(
            "Cannot checkpoint store at {}: schema fingerprint matches no known model",
            store_path.display()
        ))
    })?;
    let model = SchemaModel::for_version(version);

    let mut wal = WalManager::open(store_path);
    let entries = wal.read_all()?;
    if !entries.is_empty() {
        let mut image = StoreImage::load(store_path)?;
        for entry in &entries {
            entry.apply(&mut image);
        }
        image.validate_against(&model)?;
        image.save(store_path)?;
        info!(
            "Checkpointed {} WAL entries into {}",
            entries.len(),
            store_path.display()
        );
    }
    wal.clear()?;
    Ok(())
}

/// Removes a store's full on-disk representation: the image and all auxiliary
/// side files. Removing only the main file would leave a stale WAL behind to
/// replay onto whatever is created at this path next.
pub fn destroy_store(store_path: &Path) -> Result<()> {
    for path in [store_path.to_path_buf(), wal_path(store_path)] {
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                StoreError::DatabaseCorrupted(format!(
                    "Failed to destroy store file {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }
    }
    debug!("Destroyed store at {}", store_path.display());
    Ok(())
}

/// Atomically swaps the target store's content for the source store's
/// content, preserving the target's path identity. The target's stale WAL is
/// dropped: the incoming content is fully checkpointed.
pub fn replace_store(target: &Path, source: &Path) -> Result<()> {
    let data = fs::read(source).map_err(|e| {
        StoreError::DatabaseCorrupted(format!(
            "Failed to read replacement store at {}: {}",
            source.display(),
            e
        ))
    })?;

    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| {
        StoreError::DatabaseCorrupted(format!("Failed to create replacement temp file: {}", e))
    })?;
    temp.write_all(&data)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| {
            StoreError::DatabaseCorrupted(format!("Failed to write replacement store: {}", e))
        })?;
    temp.persist(target).map_err(|e| {
        StoreError::DatabaseCorrupted(format!(
            "Failed to replace store at {}: {}",
            target.display(),
            e
        ))
    })?;

    let stale_wal = wal_path(target);
    if stale_wal.exists() {
        fs::remove_file(&stale_wal).map_err(|e| {
            StoreError::DatabaseCorrupted(format!(
                "Failed to drop stale WAL at {}: {}",
                stale_wal.display(),
                e
            ))
        })?;
    }
    info!(
        "Replaced store at {} with {}",
        target.display(),
        source.display()
    );
    Ok(())
}
