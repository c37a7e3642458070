//! Field-level value coercion shared by the entity transforms. Decode
//! failures are never errors here: the destination field is left absent,
//! which downstream code distinguishes from a zero/empty default.

use std::str::FromStr;

use url::Url;

use crate::core::{Record, Value};

/// Reads the string attribute `key` from `source` (absent or `Null` reads as
/// the empty string), decodes it as `T`, and writes the decoded value into
/// `destination` under the same key. On decode failure the destination
/// attribute is removed instead.
pub fn map_string_field<T>(source: &Record, destination: &mut Record, key: &str)
where
    T: FromStr,
    Value: From<T>,
{
    let raw = source.get(key).and_then(Value::as_str).unwrap_or("");
    match raw.parse::<T>() {
        Ok(parsed) => {
            destination.insert(key.to_string(), Value::from(parsed));
        }
        Err(_) => {
            destination.remove(key);
        }
    }
}

/// Parses a stored location string into a typed URL. Blank strings are
/// treated the same as unparsable ones.
pub fn parse_url(raw: &str) -> Option<Url> {
    if raw.trim().is_empty() {
        return None;
    }
    Url::parse(raw).ok()
}
