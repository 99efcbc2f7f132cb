//! Tag reconciliation
//!
//! Providers reject adding a key that already exists, so every change is a
//! delete of the affected keys followed by an add of the desired pairs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Tag key to tag value
pub type TagSet = BTreeMap<String, String>;

/// Keys to delete and pairs to add, applied in that order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPlan {
    pub delete: Vec<String>,
    pub add: TagSet,
}

impl TagPlan {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.add.is_empty()
    }

    /// Tag set after executing this plan against `existing`
    pub fn apply(&self, existing: &TagSet) -> TagSet {
        let mut result = existing.clone();
        for key in &self.delete {
            result.remove(key);
        }
        result.extend(self.add.iter().map(|(k, v)| (k.clone(), v.clone())));
        result
    }
}

/// Compute the delete/add plan moving `existing` towards `desired`.
///
/// With `replace` every existing key is deleted and the end state equals
/// `desired`. Otherwise only keys present in both are deleted (so they can
/// be re-added with the new value) and other existing keys are kept.
pub fn plan(existing: &TagSet, desired: &TagSet, replace: bool) -> TagPlan {
    let delete = if replace {
        existing.keys().cloned().collect()
    } else {
        existing
            .keys()
            .filter(|k| desired.contains_key(*k))
            .cloned()
            .collect()
    };

    TagPlan {
        delete,
        add: desired.clone(),
    }
}

/// Read tags from a provider payload.
///
/// Accepts `[{"key": k, "value": v}]` lists and plain `{k: v}` objects.
pub fn tags_from_json(value: &Value) -> TagSet {
    match value {
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| {
                let key = entry.get("key")?.as_str()?;
                let value = entry
                    .get("value")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                Some((key.to_string(), value.to_string()))
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect(),
        _ => TagSet::new(),
    }
}

/// `[{"key": k, "value": v}]` body form of a tag set
pub fn tags_to_json(tags: &TagSet) -> Value {
    Value::Array(
        tags.iter()
            .map(|(k, v)| serde_json::json!({ "key": k, "value": v }))
            .collect(),
    )
}

/// Parse `key=value` arguments; a bare `key` gets an empty value
pub fn parse_tag_args<S: AsRef<str>>(args: &[S]) -> TagSet {
    args.iter()
        .map(|arg| match arg.as_ref().split_once('=') {
            Some((k, v)) => (k.trim().to_string(), v.trim().to_string()),
            None => (arg.as_ref().trim().to_string(), String::new()),
        })
        .filter(|(k, _)| !k.is_empty())
        .collect()
}
