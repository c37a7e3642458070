//! Mapping models: how one schema version's records become the next
//! version's. Most adjacent pairs are structurally inferable (matching
//! attribute names with compatible types copy over); pairs where field
//! *semantics* changed register a per-entity transform that runs after the
//! structural copy and overrides what it produced.

use std::collections::{BTreeMap, HashMap};

use url::Url;

use crate::core::{EntitySchema, Record, Result, StoreError, Value};
use crate::schema::{SchemaVersion, VersionCatalog, GALLERY, GALLERY_DETAIL, GALLERY_STATE};

use super::field::{map_string_field, parse_url};

/// A per-entity record transform: source record in, freshly copied
/// destination record mutated in place.
pub type EntityTransform = fn(&Record, &mut Record);

/// Resolved mapping for one adjacent version pair.
pub enum MappingModel {
    /// Structural inference only: the default copy is the whole migration.
    Inferred,
    /// Structural copy plus registered per-entity overrides.
    Custom(HashMap<&'static str, EntityTransform>),
}

impl MappingModel {
    /// Resolves the mapping model for a `(from, to)` version pair: a custom
    /// registration wins, structural inference is the fallback. A pair that
    /// is not an adjacent forward edge of the catalog has no mapping at all,
    /// which is a build defect, not a data problem.
    pub fn resolve(from: SchemaVersion, to: SchemaVersion) -> Result<Self> {
        if VersionCatalog::next_version(from) != Some(to) {
            return Err(StoreError::Configuration(format!(
                "No mapping model exists for {} to {}",
                from, to
            )));
        }
        Ok(custom_mapping(from, to).unwrap_or(MappingModel::Inferred))
    }

    pub fn transform_for(&self, entity: &str) -> Option<EntityTransform> {
        match self {
            Self::Inferred => None,
            Self::Custom(transforms) => transforms.get(entity).copied(),
        }
    }

    pub fn is_inferred(&self) -> bool {
        matches!(self, Self::Inferred)
    }
}

fn custom_mapping(from: SchemaVersion, to: SchemaVersion) -> Option<MappingModel> {
    use SchemaVersion::*;
    let mut transforms: HashMap<&'static str, EntityTransform> = HashMap::new();
    match (from, to) {
        (V1, V2) => {
            transforms.insert(GALLERY, retype_gallery_counters);
        }
        (V3, V4) => {
            transforms.insert(GALLERY, retype_gallery_locations);
        }
        (V4, V5) => {
            transforms.insert(GALLERY_DETAIL, retype_detail_locations);
        }
        (V5, V6) => {
            transforms.insert(GALLERY_STATE, retype_state_url_maps);
        }
        // version2 -> version3 and version6 -> version7 only add attributes
        // and are covered by structural inference.
        _ => return None,
    }
    Some(MappingModel::Custom(transforms))
}

/// Two-phase record transformer: copy every structurally compatible field
/// into a fresh destination record, then let the override rewrite the fields
/// whose meaning changed.
pub fn transform_record(
    source: &Record,
    destination_schema: &EntitySchema,
    transform: Option<EntityTransform>,
) -> Record {
    let mut destination = Record::new();
    for attr in destination_schema.attributes() {
        if let Some(value) = source.get(&attr.name) {
            if attr.attr_type.is_compatible(value) {
                destination.insert(attr.name.clone(), value.clone());
            }
        }
    }
    if let Some(transform) = transform {
        transform(source, &mut destination);
    }
    destination
}

/// version1 -> version2: the string counters become typed numbers. A counter
/// that fails to decode is left absent, not zeroed; absent and zero carry
/// different meanings downstream.
fn retype_gallery_counters(source: &Record, destination: &mut Record) {
    for key in ["likeCount", "pageCount", "ratingCount"] {
        map_string_field::<i64>(source, destination, key);
    }
    map_string_field::<f64>(source, destination, "sizeCount");
}

/// version3 -> version4: cover and gallery locations become typed URLs. Both
/// must parse; otherwise the transform is skipped for the record and the
/// fields keep whatever the structural copy produced.
fn retype_gallery_locations(source: &Record, destination: &mut Record) {
    let cover = source.get("coverURL").and_then(Value::as_str).and_then(parse_url);
    let gallery = source
        .get("galleryURL")
        .and_then(Value::as_str)
        .and_then(parse_url);
    let (Some(cover), Some(gallery)) = (cover, gallery) else {
        return;
    };
    destination.insert("coverURL".to_string(), Value::Url(cover));
    destination.insert("galleryURL".to_string(), Value::Url(gallery));
}

/// version4 -> version5: the detail locations become typed URLs. The cover
/// location is mandatory and short-circuits the transform when missing or
/// unparsable; parent and archive are optional and simply end up absent.
fn retype_detail_locations(source: &Record, destination: &mut Record) {
    let Some(cover) = source.get("coverURL").and_then(Value::as_str).and_then(parse_url) else {
        return;
    };
    destination.insert("coverURL".to_string(), Value::Url(cover));
    for key in ["parentURL", "archiveURL"] {
        match source.get(key).and_then(Value::as_str).and_then(parse_url) {
            Some(url) => {
                destination.insert(key.to_string(), Value::Url(url));
            }
            None => {
                destination.remove(key);
            }
        }
    }
}

/// version5 -> version6: the four index-keyed URL dictionaries become typed.
/// Entries whose value fails to parse are dropped; keys are preserved.
fn retype_state_url_maps(source: &Record, destination: &mut Record) {
    for key in [
        "previewURLs",
        "thumbnailURLs",
        "contentURLs",
        "originalContentURLs",
    ] {
        let Some(map) = source.get(key).and_then(Value::as_text_map) else {
            continue;
        };
        let converted: BTreeMap<i64, Url> = map
            .iter()
            .filter_map(|(index, raw)| parse_url(raw).map(|url| (*index, url)))
            .collect();
        destination.insert(key.to_string(), Value::UrlMap(converted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaModel;

    fn destination_entity(version: SchemaVersion, entity: &str) -> EntitySchema {
        SchemaModel::for_version(version)
            .entity(entity)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_resolve_custom_pairs() {
        use SchemaVersion::*;
        for (from, to) in [(V1, V2), (V3, V4), (V4, V5), (V5, V6)] {
            assert!(!MappingModel::resolve(from, to).unwrap().is_inferred());
        }
    }

    #[test]
    fn test_resolve_inferred_pairs() {
        use SchemaVersion::*;
        for (from, to) in [(V2, V3), (V6, V7)] {
            assert!(MappingModel::resolve(from, to).unwrap().is_inferred());
        }
    }

    #[test]
    fn test_resolve_rejects_non_adjacent_pair() {
        let result = MappingModel::resolve(SchemaVersion::V1, SchemaVersion::V3);
        assert!(matches!(result, Err(StoreError::Configuration(_))));
        let result = MappingModel::resolve(SchemaVersion::V3, SchemaVersion::V2);
        assert!(matches!(result, Err(StoreError::Configuration(_))));
    }

    #[test]
    fn test_counter_retype_decodes_and_leaves_failures_absent() {
        let mut source = Record::new();
        source.insert("gid".into(), Value::Integer(1));
        source.insert("token".into(), Value::Text("t".into()));
        source.insert("title".into(), Value::Text("x".into()));
        source.insert("likeCount".into(), Value::Text("42".into()));
        source.insert("pageCount".into(), Value::Text("7".into()));
        source.insert("ratingCount".into(), Value::Text("bad".into()));
        source.insert("sizeCount".into(), Value::Text("12.5".into()));

        let schema = destination_entity(SchemaVersion::V2, GALLERY);
        let migrated = transform_record(&source, &schema, Some(retype_gallery_counters));

        assert_eq!(migrated.get("likeCount"), Some(&Value::Integer(42)));
        assert_eq!(migrated.get("pageCount"), Some(&Value::Integer(7)));
        assert!(!migrated.contains_key("ratingCount"));
        assert_eq!(migrated.get("sizeCount"), Some(&Value::Float(12.5)));
        // the structurally identical fields still copied over
        assert_eq!(migrated.get("gid"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_gallery_location_retype_requires_both() {
        let mut source = Record::new();
        source.insert("gid".into(), Value::Integer(1));
        source.insert("token".into(), Value::Text("t".into()));
        source.insert("title".into(), Value::Text("x".into()));
        source.insert(
            "coverURL".into(),
            Value::Text("https://x/y.jpg".into()),
        );
        source.insert("galleryURL".into(), Value::Text("not a url".into()));

        let schema = destination_entity(SchemaVersion::V4, GALLERY);
        let migrated = transform_record(&source, &schema, Some(retype_gallery_locations));

        // mandatory-pair precondition failed: neither field written
        assert!(!migrated.contains_key("coverURL"));
        assert!(!migrated.contains_key("galleryURL"));
    }

    #[test]
    fn test_gallery_location_retype_converts_both() {
        let mut source = Record::new();
        source.insert("gid".into(), Value::Integer(1));
        source.insert("token".into(), Value::Text("t".into()));
        source.insert("title".into(), Value::Text("x".into()));
        source.insert("coverURL".into(), Value::Text("https://x/y.jpg".into()));
        source.insert(
            "galleryURL".into(),
            Value::Text("https://x/g/1/t/".into()),
        );

        let schema = destination_entity(SchemaVersion::V4, GALLERY);
        let migrated = transform_record(&source, &schema, Some(retype_gallery_locations));

        assert!(matches!(migrated.get("coverURL"), Some(Value::Url(_))));
        assert!(matches!(migrated.get("galleryURL"), Some(Value::Url(_))));
    }

    #[test]
    fn test_detail_retype_skips_without_cover() {
        let mut source = Record::new();
        source.insert("gid".into(), Value::Integer(1));
        source.insert("title".into(), Value::Text("x".into()));
        source.insert(
            "parentURL".into(),
            Value::Text("https://x/g/parent/".into()),
        );

        let schema = destination_entity(SchemaVersion::V5, GALLERY_DETAIL);
        let migrated = transform_record(&source, &schema, Some(retype_detail_locations));

        assert!(!migrated.contains_key("coverURL"));
        assert!(!migrated.contains_key("parentURL"));
    }

    #[test]
    fn test_detail_retype_optional_fields_absent_on_failure() {
        let mut source = Record::new();
        source.insert("gid".into(), Value::Integer(1));
        source.insert("title".into(), Value::Text("x".into()));
        source.insert("coverURL".into(), Value::Text("https://x/c.jpg".into()));
        source.insert("parentURL".into(), Value::Text("   ".into()));
        source.insert(
            "archiveURL".into(),
            Value::Text("https://x/archive".into()),
        );

        let schema = destination_entity(SchemaVersion::V5, GALLERY_DETAIL);
        let migrated = transform_record(&source, &schema, Some(retype_detail_locations));

        assert!(matches!(migrated.get("coverURL"), Some(Value::Url(_))));
        assert!(!migrated.contains_key("parentURL"));
        assert!(matches!(migrated.get("archiveURL"), Some(Value::Url(_))));
    }

    #[test]
    fn test_state_map_retype_drops_unparsable_entries() {
        let mut previews = BTreeMap::new();
        previews.insert(1, "https://a".to_string());
        previews.insert(2, "not-a-url".to_string());

        let mut source = Record::new();
        source.insert("gid".into(), Value::Integer(1));
        source.insert("previewURLs".into(), Value::TextMap(previews));

        let schema = destination_entity(SchemaVersion::V6, GALLERY_STATE);
        let migrated = transform_record(&source, &schema, Some(retype_state_url_maps));

        let map = migrated.get("previewURLs").and_then(Value::as_url_map).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&1));
        // absent source map stays absent
        assert!(!migrated.contains_key("thumbnailURLs"));
    }

    #[test]
    fn test_inferred_copy_carries_new_optional_attribute_gap() {
        // version2 -> version3 adds lastOpenDate; an inferred copy of an old
        // record simply leaves it absent.
        let mut source = Record::new();
        source.insert("gid".into(), Value::Integer(1));
        source.insert("token".into(), Value::Text("t".into()));
        source.insert("title".into(), Value::Text("x".into()));
        source.insert("likeCount".into(), Value::Integer(3));

        let schema = destination_entity(SchemaVersion::V3, GALLERY);
        let migrated = transform_record(&source, &schema, None);

        assert_eq!(migrated.get("likeCount"), Some(&Value::Integer(3)));
        assert!(!migrated.contains_key("lastOpenDate"));
    }
}
