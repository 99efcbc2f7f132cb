//! Resource Fetcher
//!
//! Lists resources of a kind through the paginator and pulls values out of
//! provider payloads by dotted path.

use super::registry::{KindDef, PaginationDef};
use crate::client::Region;
use crate::error::Result;
use crate::paginate::{fetch_all, Continuation, Page};
use serde_json::{Map, Value};

/// Follow a dotted path (`page_info.next_marker`, `items.0.id`) into a value
pub fn extract_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(value);
    }

    path.split('.').try_fold(value, |current, part| {
        // Handle array index
        if let Ok(idx) = part.parse::<usize>() {
            current.get(idx)
        } else {
            current.get(part)
        }
    })
}

/// String or number at `path`, as an owned string
pub fn extract_string(item: &Value, path: &str) -> Option<String> {
    match extract_path(item, path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract the item array from a list response
pub fn extract_items(response: &Value, list_field: &str) -> Vec<Value> {
    extract_path(response, list_field)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// Build a [`Page`] from one list response
pub fn page_from_response(
    pagination: &PaginationDef,
    list_field: &str,
    response: &Value,
) -> Page<Value> {
    let mut page = Page::new(extract_items(response, list_field));

    if let Some(total) = pagination
        .total_field
        .as_deref()
        .and_then(|f| extract_path(response, f))
        .and_then(|v| v.as_u64())
    {
        page = page.with_total(total as usize);
    }

    if let Some(marker) = pagination
        .marker_field
        .as_deref()
        .and_then(|f| extract_string(response, f))
    {
        page = page.with_marker(marker);
    }

    if let Some(more) = pagination
        .more_field
        .as_deref()
        .and_then(|f| extract_path(response, f))
        .and_then(|v| v.as_bool())
    {
        page = page.with_more(more);
    }

    page
}

/// Fetch all items of a kind (auto-paginate). `filters` are extra query params.
pub async fn fetch_items(region: &Region, def: &KindDef, filters: &Value) -> Result<Vec<Value>> {
    let path = region.expand(&def.collection_path, "");
    let pagination = &def.pagination;

    let mut query = match filters {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    query.insert(
        pagination.limit_param.clone(),
        Value::from(region.options().page_size),
    );

    tracing::debug!("Listing {} ({} pagination)", def.key, pagination.style.as_str());

    let fetch = |query: &Map<String, Value>| {
        let params = Value::Object(query.clone());
        let path = &path;
        async move {
            let response = region.get(&def.service, path, &params).await?;
            Ok(page_from_response(pagination, &def.list_field, &response))
        }
    };

    let advance = |query: &mut Map<String, Value>, next: &Continuation| match next {
        Continuation::Offset(count) => {
            query.insert(pagination.offset_param.clone(), Value::from(*count));
        },
        Continuation::Marker(marker) => {
            query.insert(pagination.marker_param.clone(), Value::from(marker.as_str()));
        },
    };

    let items = fetch_all(pagination.style, query, fetch, advance).await?;
    tracing::debug!("Listed {} {} items", items.len(), def.key);
    Ok(items)
}
