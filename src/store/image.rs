//! On-disk store image: metadata header plus all entity records, serialized
//! as one MessagePack document. Writes always go through a temporary file in
//! the destination directory followed by an atomic rename.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::core::{Record, Result, StoreError};
use crate::schema::SchemaModel;

/// Bump when the container layout changes. Distinct from the schema version
/// chain, which tracks the record structure inside the container.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// The store's self-reported schema fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub format_version: u32,
    pub schema_signature: String,
    pub created_at: i64,
}

impl StoreMetadata {
    pub fn for_model(model: &SchemaModel) -> Self {
        Self {
            format_version: STORE_FORMAT_VERSION,
            schema_signature: model.signature(),
            created_at: Utc::now().timestamp_millis(),
        }
    }
}

/// Full in-memory representation of one store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreImage {
    pub metadata: StoreMetadata,
    pub entities: HashMap<String, Vec<Record>>,
}

impl StoreImage {
    /// An empty store stamped for `model`, with a record list per entity.
    pub fn empty(model: &SchemaModel) -> Self {
        let mut entities = HashMap::new();
        for name in model.entity_names() {
            entities.insert(name.to_string(), Vec::new());
        }
        Self {
            metadata: StoreMetadata::for_model(model),
            entities,
        }
    }

    pub fn records(&self, entity: &str) -> &[Record] {
        self.entities.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn insert(&mut self, entity: &str, record: Record) {
        self.entities.entry(entity.to_string()).or_default().push(record);
    }

    pub fn record_count(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }

    /// Checks every record against `model`. The store must already be stamped
    /// with the model's signature; a mismatch means the caller resolved the
    /// wrong model.
    pub fn validate_against(&self, model: &SchemaModel) -> Result<()> {
        if self.metadata.schema_signature != model.signature() {
            return Err(StoreError::DatabaseCorrupted(format!(
                "Store is stamped for a different schema than {}",
                model.version()
            )));
        }
        for (name, records) in &self.entities {
            let entity = model.entity(name).ok_or_else(|| {
                StoreError::DatabaseCorrupted(format!(
                    "Store contains unknown entity '{}' for schema {}",
                    name,
                    model.version()
                ))
            })?;
            for record in records {
                entity.validate_record(record)?;
            }
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| {
            StoreError::DatabaseCorrupted(format!(
                "Failed to read store at {}: {}",
                path.display(),
                e
            ))
        })?;
        rmp_serde::from_slice(&data).map_err(|e| {
            StoreError::DatabaseCorrupted(format!(
                "Failed to decode store at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Writes the image atomically: serialize into a temporary file beside the
    /// destination, sync, then rename over it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir {
            fs::create_dir_all(dir).map_err(|e| {
                StoreError::DatabaseCorrupted(format!(
                    "Failed to create store directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        let serialized = rmp_serde::to_vec(self).map_err(|e| {
            StoreError::DatabaseCorrupted(format!("Failed to encode store: {}", e))
        })?;

        let mut temp = match dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new_in("."),
        }
        .map_err(|e| {
            StoreError::DatabaseCorrupted(format!("Failed to create temporary store file: {}", e))
        })?;
        temp.write_all(&serialized).map_err(|e| {
            StoreError::DatabaseCorrupted(format!("Failed to write store: {}", e))
        })?;
        temp.as_file().sync_all().map_err(|e| {
            StoreError::DatabaseCorrupted(format!("Failed to sync store: {}", e))
        })?;
        temp.persist(path).map_err(|e| {
            StoreError::DatabaseCorrupted(format!(
                "Failed to move store into place at {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(())
    }
}
