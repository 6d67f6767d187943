//! Dot-path field mapping from interaction records to consumer objects.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use kollektor_core::KollektorResult;

use crate::events::Interaction;
use crate::privacy::PrivacyManager;

/// Build a consumer's data object. Each map entry is `output key → dot path`;
/// missing or null values become `""` and strings are privacy-masked. Zero
/// and `false` are kept as they are.
pub fn map_to_consumer_object(
    interaction: &Interaction,
    map: &BTreeMap<String, String>,
    privacy: &PrivacyManager,
) -> KollektorResult<Map<String, Value>> {
    let record = serde_json::to_value(interaction)?;
    let mut data = Map::with_capacity(map.len());
    for (key, path) in map {
        let value = match lookup(&record, path) {
            None | Some(Value::Null) => Value::String(String::new()),
            Some(Value::String(s)) => Value::String(privacy.mask_long_numbers(s).into_owned()),
            Some(other) => other.clone(),
        };
        data.insert(key.clone(), value);
    }
    Ok(data)
}

/// Resolve a dot path (`data.target.name`, `items.0`) inside a JSON value.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(fields) => fields.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
