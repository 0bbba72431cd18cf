// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Filter Normalizer
//!
//! Splits a request query into control parameters (pagination, sort, projection,
//! routing, index) and the matching criteria handed to the compiler.
//!
//! ```text
//! {name: "a", $limit: 10, $sort: {age: -1}, $select: ["name"]}
//!     ├─→ Filters  { limit: 10, skip: 0, sort: [age desc], select: Fields([name]) }
//!     └─→ criteria { name: "a" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kind::{validate_type, ValueKind};
use crate::config::Paginate;
use crate::error::QueryError;

/// Control keys recognised by the normalizer.
pub const CONTROL_KEYS: &[&str] = &["$limit", "$skip", "$sort", "$select", "$routing", "$index"];

/// Which parts of `_source` to return.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceFilter {
    /// Whole document (`_source: true`)
    #[default]
    All,
    /// Only these fields
    Fields(Vec<String>),
    /// No source, metadata only (`_source: false`)
    None,
}

impl SourceFilter {
    /// Wire form: `true`, `false` or a field list.
    pub fn to_value(&self) -> Value {
        match self {
            Self::All => Value::Bool(true),
            Self::None => Value::Bool(false),
            Self::Fields(fields) => Value::Array(fields.iter().cloned().map(Value::String).collect()),
        }
    }

    /// Apply the projection to a document body.
    pub fn project(&self, source: &Map<String, Value>) -> Option<Map<String, Value>> {
        match self {
            Self::All => Some(source.clone()),
            Self::None => None,
            Self::Fields(fields) => Some(
                source
                    .iter()
                    .filter(|(key, _)| fields.iter().any(|f| f == *key))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One sort key, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
}

impl SortField {
    /// Wire form: `{field: "asc"|"desc"}`
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        let order = match self.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        map.insert(self.field.clone(), Value::String(order.to_string()));
        Value::Object(map)
    }
}

/// Control parameters of a request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filters {
    pub limit: Option<usize>,
    pub skip: usize,
    pub sort: Vec<SortField>,
    pub select: SourceFilter,
    pub routing: Option<String>,
    pub index: Option<String>,
}

/// Normalized request: control parameters plus remaining criteria.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterQuery {
    pub filters: Filters,
    pub criteria: Map<String, Value>,
}

impl FilterQuery {
    /// Split `query` (null/absent treated as `{}`) using `paginate` for limit defaults.
    pub fn parse(query: Option<&Value>, paginate: &Paginate) -> Result<Self, QueryError> {
        validate_type(query, "query", &[ValueKind::Object, ValueKind::Null, ValueKind::Missing])?;
        let empty = Map::new();
        let map = query.and_then(Value::as_object).unwrap_or(&empty);

        let mut filters = Filters::default();
        let mut criteria = Map::new();

        for (key, value) in map {
            match key.as_str() {
                "$limit" => filters.limit = parse_count(value),
                "$skip" => filters.skip = parse_count(value).unwrap_or(0),
                "$sort" => filters.sort = parse_sort(value)?,
                "$select" => filters.select = parse_select(value)?,
                "$routing" => filters.routing = parse_string(value, "$routing")?,
                "$index" => filters.index = parse_string(value, "$index")?,
                _ => {
                    criteria.insert(key.clone(), value.clone());
                }
            }
        }

        filters.limit = paginate.resolve_limit(filters.limit);
        Ok(Self { filters, criteria })
    }

    /// Criteria as a JSON value, ready for the compiler.
    pub fn criteria_value(&self) -> Value {
        Value::Object(self.criteria.clone())
    }
}

/// Non-negative integer, also accepted as a numeric string.
fn parse_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_sort(value: &Value) -> Result<Vec<SortField>, QueryError> {
    validate_type(Some(value), "$sort", &[ValueKind::Object])?;
    let Value::Object(map) = value else {
        return Ok(Vec::new());
    };

    Ok(map
        .iter()
        .map(|(field, direction)| {
            let descending = match direction {
                Value::Number(n) => n.as_f64().is_some_and(|d| d < 0.0),
                Value::String(s) => s.trim() == "-1" || s.eq_ignore_ascii_case("desc"),
                _ => false,
            };
            SortField {
                field: field.clone(),
                order: if descending { SortOrder::Desc } else { SortOrder::Asc },
            }
        })
        .collect())
}

fn parse_select(value: &Value) -> Result<SourceFilter, QueryError> {
    validate_type(Some(value), "$select", &[ValueKind::Array, ValueKind::Boolean])?;
    Ok(match value {
        Value::Bool(false) => SourceFilter::None,
        Value::Array(fields) => {
            let mut names = Vec::with_capacity(fields.len());
            for (i, field) in fields.iter().enumerate() {
                validate_type(Some(field), &format!("$select[{i}]"), &[ValueKind::String])?;
                if let Value::String(name) = field {
                    names.push(name.clone());
                }
            }
            SourceFilter::Fields(names)
        }
        _ => SourceFilter::All,
    })
}

fn parse_string(value: &Value, key: &str) -> Result<Option<String>, QueryError> {
    validate_type(Some(value), key, &[ValueKind::String, ValueKind::Null])?;
    Ok(value.as_str().map(str::to_string))
}
