//! Write-ahead side file (`<store>.wal`): length-framed MessagePack entries
//! appended between checkpoints. A checkpoint folds all entries into the main
//! image and truncates this file; raw file-level operations on the store are
//! only safe once that has happened.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{Record, Result, StoreError, Value};

use super::image::StoreImage;

/// Sidecar WAL path for a store file (`cache.store` -> `cache.store.wal`).
pub fn wal_path(store_path: &Path) -> PathBuf {
    let mut os = store_path.as_os_str().to_os_string();
    os.push(".wal");
    PathBuf::from(os)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalEntry {
    /// Insert or replace the record whose `gid` matches.
    Upsert { entity: String, record: Record },
    /// Remove all records of `entity` whose `gid` matches.
    Delete { entity: String, gid: i64 },
}

impl WalEntry {
    pub fn apply(&self, image: &mut StoreImage) {
        match self {
            Self::Upsert { entity, record } => {
                let records = image.entities.entry(entity.clone()).or_default();
                let gid = record.get("gid").and_then(Value::as_i64);
                match records
                    .iter_mut()
                    .find(|r| gid.is_some() && r.get("gid").and_then(Value::as_i64) == gid)
                {
                    Some(existing) => *existing = record.clone(),
                    None => records.push(record.clone()),
                }
            }
            Self::Delete { entity, gid } => {
                if let Some(records) = image.entities.get_mut(entity) {
                    records.retain(|r| r.get("gid").and_then(Value::as_i64) != Some(*gid));
                }
            }
        }
    }
}

pub struct WalManager {
    wal_path: PathBuf,
    wal_file: Option<BufWriter<File>>,
}

impl WalManager {
    /// Manager for the WAL belonging to the store at `store_path`. The side
    /// file is not created until the first append.
    pub fn open(store_path: &Path) -> Self {
        Self {
            wal_path: wal_path(store_path),
            wal_file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.wal_path
    }

    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        if self.wal_file.is_none() {
            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.wal_path)
                .map_err(|e| {
                    StoreError::DatabaseCorrupted(format!(
                        "Failed to open WAL at {}: {}",
                        self.wal_path.display(),
                        e
                    ))
                })?;
            self.wal_file = Some(BufWriter::new(handle));
        }
        let file = self.wal_file.as_mut().ok_or_else(|| {
            StoreError::DatabaseCorrupted("WAL writer not initialized".to_string())
        })?;
        let serialized = rmp_serde::to_vec(entry).map_err(|e| {
            StoreError::DatabaseCorrupted(format!("Failed to serialize WAL entry: {}", e))
        })?;
        let len = serialized.len() as u32;
        file.write_all(&len.to_le_bytes())
            .and_then(|_| file.write_all(&serialized))
            .and_then(|_| file.flush())
            .map_err(|e| StoreError::DatabaseCorrupted(format!("Failed to write WAL: {}", e)))?;
        file.get_mut()
            .sync_all()
            .map_err(|e| StoreError::DatabaseCorrupted(format!("Failed to sync WAL: {}", e)))?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<WalEntry>> {
        if !self.wal_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.wal_path).map_err(|e| {
            StoreError::DatabaseCorrupted(format!(
                "Failed to open WAL for reading at {}: {}",
                self.wal_path.display(),
                e
            ))
        })?;
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        loop {
            let mut len_bytes = [0u8; 4];
            match reader.read_exact(&mut len_bytes) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    return Err(StoreError::DatabaseCorrupted(format!(
                        "Failed to read WAL entry length: {}",
                        e
                    )))
                }
            }
            let len = u32::from_le_bytes(len_bytes) as usize;
            let mut data = vec![0u8; len];
            reader.read_exact(&mut data).map_err(|e| {
                StoreError::DatabaseCorrupted(format!("Failed to read WAL entry data: {}", e))
            })?;
            let entry: WalEntry = rmp_serde::from_slice(&data).map_err(|e| {
                StoreError::DatabaseCorrupted(format!("Failed to deserialize WAL entry: {}", e))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Drops all pending entries. The side file is removed outright so a
    /// checkpointed store is a single file again.
    pub fn clear(&mut self) -> Result<()> {
        self.wal_file = None;
        if self.wal_path.exists() {
            std::fs::remove_file(&self.wal_path).map_err(|e| {
                StoreError::DatabaseCorrupted(format!(
                    "Failed to remove WAL at {}: {}",
                    self.wal_path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    pub fn has_pending_entries(&self) -> bool {
        self.wal_path
            .metadata()
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::schema::{SchemaModel, SchemaVersion, GALLERY};
    use tempfile::TempDir;

    fn gallery_record(gid: i64, title: &str) -> Record {
        let mut record = Record::new();
        record.insert("gid".into(), Value::Integer(gid));
        record.insert("token".into(), Value::Text("t".into()));
        record.insert("title".into(), Value::Text(title.into()));
        record
    }

    #[test]
    fn test_wal_append_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("cache.store");
        let mut wal = WalManager::open(&store_path);
        wal.append(&WalEntry::Upsert {
            entity: GALLERY.to_string(),
            record: gallery_record(1, "first"),
        })
        .unwrap();
        wal.append(&WalEntry::Delete {
            entity: GALLERY.to_string(),
            gid: 1,
        })
        .unwrap();
        let entries = wal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_wal_clear_removes_side_file() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("cache.store");
        let mut wal = WalManager::open(&store_path);
        wal.append(&WalEntry::Delete {
            entity: GALLERY.to_string(),
            gid: 9,
        })
        .unwrap();
        assert!(wal.has_pending_entries());
        wal.clear().unwrap();
        assert!(!wal.path().exists());
        assert!(wal.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_replaces_matching_gid() {
        let model = SchemaModel::for_version(SchemaVersion::V7);
        let mut image = StoreImage::empty(&model);
        WalEntry::Upsert {
            entity: GALLERY.to_string(),
            record: gallery_record(1, "old title"),
        }
        .apply(&mut image);
        WalEntry::Upsert {
            entity: GALLERY.to_string(),
            record: gallery_record(1, "new title"),
        }
        .apply(&mut image);
        assert_eq!(image.records(GALLERY).len(), 1);
        assert_eq!(
            image.records(GALLERY)[0].get("title"),
            Some(&Value::Text("new title".into()))
        );
    }

    #[test]
    fn test_delete_removes_matching_gid() {
        let model = SchemaModel::for_version(SchemaVersion::V7);
        let mut image = StoreImage::empty(&model);
        WalEntry::Upsert {
            entity: GALLERY.to_string(),
            record: gallery_record(1, "a"),
        }
        .apply(&mut image);
        WalEntry::Upsert {
            entity: GALLERY.to_string(),
            record: gallery_record(2, "b"),
        }
        .apply(&mut image);
        WalEntry::Delete {
            entity: GALLERY.to_string(),
            gid: 1,
        }
        .apply(&mut image);
        assert_eq!(image.records(GALLERY).len(), 1);
        assert_eq!(
            image.records(GALLERY)[0].get("gid"),
            Some(&Value::Integer(2))
        );
    }
}
