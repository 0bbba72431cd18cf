// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document Descriptor Resolver
//!
//! Splits a caller document into the write-path pieces: identity, parent, routing,
//! relation name and the body to store.

use serde_json::{Map, Value};

use crate::config::FieldNames;

/// Write-path view of one document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocDescriptor {
    pub id: Option<String>,
    pub parent: Option<String>,
    /// Falls back to `parent`; never `None` while `parent` is set
    pub routing: Option<String>,
    /// Relation name, only read when a join field is configured
    pub join: Option<Value>,
    /// `data` without the reserved fields
    pub doc: Map<String, Value>,
}

impl DocDescriptor {
    /// Resolve from `data`, with `supplementary` maps overlaid on it (later wins) for
    /// the id/parent/routing/join lookups. The body is stripped from `data` alone.
    pub fn resolve(fields: &FieldNames, data: &Map<String, Value>, supplementary: &[&Map<String, Value>]) -> Self {
        let mut merged = data.clone();
        for extra in supplementary {
            merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let id = merged
            .get(&fields.id)
            .filter(|v| !v.is_null())
            .map(stringify);
        let parent = merged.get(&fields.parent).filter(|v| is_truthy(v)).map(stringify);
        let routing = merged
            .get(&fields.routing)
            .filter(|v| is_truthy(v))
            .map(stringify)
            .or_else(|| parent.clone());
        let join = fields
            .join
            .as_ref()
            .and_then(|join| merged.get(join))
            .filter(|v| is_truthy(v))
            .cloned();

        let mut doc = data.clone();
        for reserved in [&fields.meta, &fields.id, &fields.parent, &fields.routing] {
            doc.remove(reserved);
        }
        if let Some(join) = &fields.join {
            doc.remove(join);
        }

        Self { id, parent, routing, join, doc }
    }

    /// Body to store on create: `doc` with the relation written back as
    /// `{join: {name, parent}}` when there is one.
    pub fn body_with_relation(&self, fields: &FieldNames) -> Map<String, Value> {
        let mut body = self.doc.clone();
        if let (Some(join_field), Some(name)) = (&fields.join, &self.join) {
            let mut relation = Map::new();
            relation.insert("name".into(), name.clone());
            if let Some(parent) = &self.parent {
                relation.insert("parent".into(), Value::String(parent.clone()));
            }
            body.insert(join_field.clone(), Value::Object(relation));
        }
        body
    }
}

/// String form of a key value: strings as-is, everything else as JSON text.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
