// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Result Mapper
//!
//! Turns store hits into caller documents:
//!
//! ```text
//! {_id: "1", _index: "people", _source: {name: "a", rel: {name: "child", parent: "9"}}}
//!   ──→ {_meta: {_id: "1", _index: "people", _parent: "9"}, id: "1", name: "a", rel: "child"}
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::FieldNames;
use crate::query::Filters;
use crate::storage::traits::SearchResponse;

/// Map a hit (or bulk item) to a caller document.
///
/// Everything except `_source` goes under the meta field; `_source` entries are
/// spread at the top level, with the id alias set from `_id`. A join field holding
/// `{name, parent}` is flattened to `name`, and `parent` moves to the meta as `_parent`.
pub fn map_item(item: &Value, fields: &FieldNames) -> Value {
    let mut meta = item.as_object().cloned().unwrap_or_default();
    let source = meta.remove("_source");
    let id = meta.get("_id").cloned();

    let mut result = Map::new();
    result.insert(fields.meta.clone(), Value::Object(meta));
    if let Some(Value::Object(source)) = source {
        result.extend(source);
    }
    if let Some(id) = id {
        result.insert(fields.id.clone(), id);
    }

    if let Some(join) = &fields.join {
        flatten_join(&mut result, join, &fields.meta);
    }
    Value::Object(result)
}

fn flatten_join(result: &mut Map<String, Value>, join: &str, meta_field: &str) {
    let Some(Value::Object(relation)) = result.get(join) else {
        return;
    };
    let name = relation.get("name").cloned().unwrap_or(Value::Null);
    let parent = relation.get("parent").cloned().unwrap_or(Value::Null);

    if let Some(Value::Object(meta)) = result.get_mut(meta_field) {
        meta.insert("_parent".into(), parent);
    }
    result.insert(join.to_string(), name);
}

/// Map an `update` response item; the post-write snapshot lives under `get._source`.
pub fn map_patch(item: &Value, fields: &FieldNames) -> Value {
    let mut normalized = item.as_object().cloned().unwrap_or_default();
    let source = normalized
        .remove("get")
        .and_then(|get| get.get("_source").cloned());
    if let Some(source) = source {
        normalized.insert("_source".into(), source);
    }
    map_item(&Value::Object(normalized), fields)
}

/// Map the items of a bulk response, each `{create|index|update|delete: item}`.
pub fn map_bulk(items: &[Value], fields: &FieldNames) -> Vec<Value> {
    items
        .iter()
        .map(|item| {
            if let Some(update) = item.get("update") {
                return map_patch(update, fields);
            }
            let inner = ["create", "index", "delete"]
                .iter()
                .find_map(|action| item.get(*action))
                .unwrap_or(&Value::Null);
            map_item(inner, fields)
        })
        .collect()
}

/// `find` output: a page when pagination is on, a plain list otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FindResult {
    Page {
        total: u64,
        skip: usize,
        limit: Option<usize>,
        data: Vec<Value>,
    },
    List(Vec<Value>),
}

impl FindResult {
    pub fn data(&self) -> &[Value] {
        match self {
            Self::Page { data, .. } | Self::List(data) => data,
        }
    }

    pub fn into_data(self) -> Vec<Value> {
        match self {
            Self::Page { data, .. } | Self::List(data) => data,
        }
    }

    pub fn is_page(&self) -> bool {
        matches!(self, Self::Page { .. })
    }
}

pub fn map_find(
    response: &SearchResponse,
    filters: &Filters,
    paginated: bool,
    fields: &FieldNames,
) -> FindResult {
    let data = response.hits.iter().map(|hit| map_item(hit, fields)).collect();
    if paginated {
        FindResult::Page {
            total: response.total,
            skip: filters.skip,
            limit: filters.limit,
            data,
        }
    } else {
        FindResult::List(data)
    }
}
