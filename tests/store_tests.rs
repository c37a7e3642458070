//! Integration tests for the host-facing store lifecycle: WAL buffering,
//! checkpointing, and the startup migration gate.

use gallerystore::store::maintenance;
use gallerystore::{
    MigrationCoordinator, Record, SchemaModel, SchemaVersion, StoreImage, Value, VersionCatalog,
    WalEntry, WalManager,
};
use tempfile::TempDir;

const GALLERY: &str = "Gallery";

fn gallery_record(gid: i64, title: &str) -> Record {
    let mut record = Record::new();
    record.insert("gid".into(), Value::Integer(gid));
    record.insert("token".into(), Value::Text("t".into()));
    record.insert("title".into(), Value::Text(title.into()));
    record
}

#[test]
fn test_startup_sequence_fresh_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cache.store");
    let target = VersionCatalog::current().unwrap();

    // host contract: check, migrate if needed, then open
    let coordinator = MigrationCoordinator::new();
    assert!(!coordinator.requires_migration(&path, target).unwrap());

    let model = SchemaModel::for_version(target);
    StoreImage::empty(&model).save(&path).unwrap();
    assert!(!coordinator.requires_migration(&path, target).unwrap());
}

#[test]
fn test_wal_survives_reopen_until_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cache.store");
    let model = SchemaModel::for_version(SchemaVersion::V7);
    StoreImage::empty(&model).save(&path).unwrap();

    {
        let mut wal = WalManager::open(&path);
        wal.append(&WalEntry::Upsert {
            entity: GALLERY.to_string(),
            record: gallery_record(1, "buffered"),
        })
        .unwrap();
    }

    // a new manager over the same store sees the pending entries
    let wal = WalManager::open(&path);
    assert!(wal.has_pending_entries());
    assert_eq!(wal.read_all().unwrap().len(), 1);

    maintenance::force_checkpoint(&path).unwrap();
    assert!(!WalManager::open(&path).has_pending_entries());
    let image = StoreImage::load(&path).unwrap();
    assert_eq!(image.records(GALLERY).len(), 1);
}

#[test]
fn test_checkpoint_upserts_overwrite_by_gid() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cache.store");
    let model = SchemaModel::for_version(SchemaVersion::V7);
    let mut image = StoreImage::empty(&model);
    image.insert(GALLERY, gallery_record(1, "stale"));
    image.save(&path).unwrap();

    let mut wal = WalManager::open(&path);
    wal.append(&WalEntry::Upsert {
        entity: GALLERY.to_string(),
        record: gallery_record(1, "fresh"),
    })
    .unwrap();
    wal.append(&WalEntry::Upsert {
        entity: GALLERY.to_string(),
        record: gallery_record(2, "second"),
    })
    .unwrap();

    maintenance::force_checkpoint(&path).unwrap();

    let image = StoreImage::load(&path).unwrap();
    assert_eq!(image.records(GALLERY).len(), 2);
    let first = image
        .records(GALLERY)
        .iter()
        .find(|r| r.get("gid") == Some(&Value::Integer(1)))
        .unwrap();
    assert_eq!(first.get("title"), Some(&Value::Text("fresh".into())));
}

#[test]
fn test_drop_and_recreate_recovery_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cache.store");

    // a store that self-reports garbage can only be dropped and recreated
    let model = SchemaModel::for_version(SchemaVersion::V1);
    let mut image = StoreImage::empty(&model);
    image.metadata.schema_signature = "garbage".into();
    image.save(&path).unwrap();

    let coordinator = MigrationCoordinator::new();
    let target = VersionCatalog::current().unwrap();
    assert!(coordinator.requires_migration(&path, target).is_err());

    maintenance::destroy_store(&path).unwrap();
    assert!(!coordinator.requires_migration(&path, target).unwrap());

    let model = SchemaModel::for_version(target);
    StoreImage::empty(&model).save(&path).unwrap();
    assert!(!coordinator.requires_migration(&path, target).unwrap());
}
