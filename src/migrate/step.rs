//! One version-to-the-next transformation unit: a resolved
//! (source model, destination model, mapping model) triple that migrates a
//! whole store file into a fresh destination file.

use std::path::Path;

use log::debug;

use crate::core::{Result, StoreError};
use crate::schema::{SchemaModel, SchemaVersion};
use crate::store::StoreImage;

use super::mapping::{transform_record, MappingModel};

pub struct MigrationStep {
    source: SchemaModel,
    destination: SchemaModel,
    mapping: MappingModel,
}

impl MigrationStep {
    /// Resolves the step for one adjacent version pair. Fails with a
    /// configuration error when no mapping can be resolved; a declared
    /// version transition without a mapping is a build defect and the
    /// process must not continue with an unmigratable store.
    pub fn new(from: SchemaVersion, to: SchemaVersion) -> Result<Self> {
        let mapping = MappingModel::resolve(from, to)?;
        Ok(Self {
            source: SchemaModel::for_version(from),
            destination: SchemaModel::for_version(to),
            mapping,
        })
    }

    pub fn source_version(&self) -> SchemaVersion {
        self.source.version()
    }

    pub fn destination_version(&self) -> SchemaVersion {
        self.destination.version()
    }

    /// Migrates the store at `source_path` into a brand-new store at
    /// `destination_path`. The source store is read, never written.
    pub fn run(&self, source_path: &Path, destination_path: &Path) -> Result<()> {
        let source_image = StoreImage::load(source_path)?;
        if source_image.metadata.schema_signature != self.source.signature() {
            return Err(StoreError::DatabaseCorrupted(format!(
                "Store at {} is not at {} as this step expects",
                source_path.display(),
                self.source.version()
            )));
        }

        let mut destination_image = StoreImage::empty(&self.destination);
        for entity_schema in self.destination.entities() {
            let name = entity_schema.name();
            let transform = self.mapping.transform_for(name);
            for record in source_image.records(name) {
                destination_image.insert(name, transform_record(record, entity_schema, transform));
            }
        }

        destination_image.validate_against(&self.destination)?;
        destination_image.save(destination_path)?;
        debug!(
            "Migrated {} records from {} to {}",
            destination_image.record_count(),
            self.source.version(),
            self.destination.version()
        );
        Ok(())
    }
}
