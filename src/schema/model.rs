use std::collections::HashMap;

use crate::core::{Attribute, AttributeType, EntitySchema};

use super::version::SchemaVersion;

pub const GALLERY: &str = "Gallery";
pub const GALLERY_DETAIL: &str = "GalleryDetail";
pub const GALLERY_STATE: &str = "GalleryState";

/// The structural definition of all entity types for one schema version.
///
/// Models are declared in code rather than loaded from bundled resources, so
/// every version's exact shape is reviewable here and the compatibility
/// fingerprint is a pure function of this file.
#[derive(Debug, Clone)]
pub struct SchemaModel {
    version: SchemaVersion,
    entities: HashMap<String, EntitySchema>,
}

impl SchemaModel {
    pub fn for_version(version: SchemaVersion) -> Self {
        let mut entities = HashMap::new();
        for entity in [
            gallery_schema(version),
            gallery_detail_schema(version),
            gallery_state_schema(version),
        ] {
            entities.insert(entity.name().to_string(), entity);
        }
        Self { version, entities }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }

    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Canonical structural fingerprint of this model.
    ///
    /// Stores stamp this string into their metadata; a store is considered to
    /// be at version N iff its stamped signature equals the signature of the
    /// version-N model. Versions must therefore stay mutually distinguishable
    /// (see the catalog tests).
    pub fn signature(&self) -> String {
        let mut parts = Vec::with_capacity(self.entities.len());
        for name in self.entity_names() {
            let entity = &self.entities[name];
            let mut attrs: Vec<String> = entity
                .attributes()
                .iter()
                .map(|a| {
                    format!(
                        "{}:{}:{}",
                        a.name,
                        a.attr_type,
                        if a.optional { "opt" } else { "req" }
                    )
                })
                .collect();
            attrs.sort_unstable();
            parts.push(format!("{}({})", name, attrs.join(",")));
        }
        parts.join(";")
    }

    /// Finds the schema version whose model structure matches `signature`.
    /// First structural match wins.
    pub fn resolve_version(signature: &str) -> Option<SchemaVersion> {
        SchemaVersion::ALL
            .iter()
            .copied()
            .find(|v| SchemaModel::for_version(*v).signature() == signature)
    }
}

fn gallery_schema(version: SchemaVersion) -> EntitySchema {
    // version2 re-typed the string counters; version4 re-typed the locations.
    let counter_type = if version >= SchemaVersion::V2 {
        AttributeType::Integer
    } else {
        AttributeType::Text
    };
    let size_type = if version >= SchemaVersion::V2 {
        AttributeType::Float
    } else {
        AttributeType::Text
    };
    let location_type = if version >= SchemaVersion::V4 {
        AttributeType::Url
    } else {
        AttributeType::Text
    };

    let mut attributes = vec![
        Attribute::new("gid", AttributeType::Integer).required(),
        Attribute::new("token", AttributeType::Text).required(),
        Attribute::new("title", AttributeType::Text).required(),
        Attribute::new("category", AttributeType::Text),
        Attribute::new("uploader", AttributeType::Text),
        Attribute::new("postedDate", AttributeType::Date),
        Attribute::new("rating", AttributeType::Float),
        Attribute::new("language", AttributeType::Text),
        Attribute::new("coverURL", location_type),
        Attribute::new("galleryURL", location_type),
        Attribute::new("likeCount", counter_type),
        Attribute::new("pageCount", counter_type),
        Attribute::new("ratingCount", counter_type),
        Attribute::new("sizeCount", size_type),
    ];
    if version >= SchemaVersion::V3 {
        attributes.push(Attribute::new("lastOpenDate", AttributeType::Date));
    }
    EntitySchema::new(GALLERY, attributes)
}

fn gallery_detail_schema(version: SchemaVersion) -> EntitySchema {
    // version5 re-typed the locations.
    let location_type = if version >= SchemaVersion::V5 {
        AttributeType::Url
    } else {
        AttributeType::Text
    };

    EntitySchema::new(
        GALLERY_DETAIL,
        vec![
            Attribute::new("gid", AttributeType::Integer).required(),
            Attribute::new("title", AttributeType::Text).required(),
            Attribute::new("jpnTitle", AttributeType::Text),
            Attribute::new("coverURL", location_type),
            Attribute::new("parentURL", location_type),
            Attribute::new("archiveURL", location_type),
            Attribute::new("postedDate", AttributeType::Date),
            Attribute::new("favoritedCount", AttributeType::Integer),
        ],
    )
}

fn gallery_state_schema(version: SchemaVersion) -> EntitySchema {
    // version6 re-typed the four URL dictionaries.
    let map_type = if version >= SchemaVersion::V6 {
        AttributeType::UrlMap
    } else {
        AttributeType::TextMap
    };

    let mut attributes = vec![
        Attribute::new("gid", AttributeType::Integer).required(),
        Attribute::new("currentPageIndex", AttributeType::Integer),
        Attribute::new("previewURLs", map_type),
        Attribute::new("thumbnailURLs", map_type),
        Attribute::new("contentURLs", map_type),
        Attribute::new("originalContentURLs", map_type),
    ];
    if version >= SchemaVersion::V7 {
        attributes.push(Attribute::new("readingProgress", AttributeType::Integer));
    }
    EntitySchema::new(GALLERY_STATE, attributes)
}
