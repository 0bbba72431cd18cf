// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bulk action descriptors.
//!
//! A bulk request is an ordered list of `(header, body?)` pairs:
//!
//! ```text
//! {create: {_id: "1", routing: "p"}}   {name: "a"}
//! {update: {_id: "2"}}                 {doc: {name: "b"}}
//! {delete: {_id: "3"}}
//! ```

use serde_json::{Map, Value};

use crate::config::RefreshPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkAction {
    /// Insert; fails if the id exists
    Create,
    /// Insert or replace
    Index,
    /// Partial update of an existing document
    Update,
    Delete,
}

impl BulkAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Index => "index",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "create" => Self::Create,
            "index" => Self::Index,
            "update" => Self::Update,
            "delete" => Self::Delete,
            _ => return None,
        })
    }

    /// Whether `status` is a success for this action. An `index` that overwrites an
    /// existing document reports 200 instead of 201.
    pub fn is_success(self, status: u16) -> bool {
        match self {
            Self::Create => status == 201,
            Self::Index => status == 200 || status == 201,
            Self::Update | Self::Delete => status == 200,
        }
    }
}

/// One item of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    pub action: BulkAction,
    pub id: Option<String>,
    pub routing: Option<String>,
    /// Absent for `delete`; `{doc: ...}` for `update`
    pub body: Option<Value>,
}

impl BulkOperation {
    pub fn create(id: Option<String>, routing: Option<String>, doc: Map<String, Value>) -> Self {
        Self { action: BulkAction::Create, id, routing, body: Some(Value::Object(doc)) }
    }

    pub fn index(id: Option<String>, routing: Option<String>, doc: Map<String, Value>) -> Self {
        Self { action: BulkAction::Index, id, routing, body: Some(Value::Object(doc)) }
    }

    pub fn update(id: String, routing: Option<String>, doc: Map<String, Value>) -> Self {
        let mut body = Map::new();
        body.insert("doc".into(), Value::Object(doc));
        Self { action: BulkAction::Update, id: Some(id), routing, body: Some(Value::Object(body)) }
    }

    pub fn delete(id: String, routing: Option<String>) -> Self {
        Self { action: BulkAction::Delete, id: Some(id), routing, body: None }
    }

    /// `{action: {_id?, routing?}}`
    pub fn header(&self) -> Value {
        let mut meta = Map::new();
        if let Some(id) = &self.id {
            meta.insert("_id".into(), Value::String(id.clone()));
        }
        if let Some(routing) = &self.routing {
            meta.insert("routing".into(), Value::String(routing.clone()));
        }
        let mut header = Map::new();
        header.insert(self.action.as_str().into(), Value::Object(meta));
        Value::Object(header)
    }
}

/// A full bulk call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkRequest {
    pub index: Option<String>,
    pub refresh: RefreshPolicy,
    pub operations: Vec<BulkOperation>,
}

impl BulkRequest {
    pub fn new(index: Option<String>, refresh: RefreshPolicy) -> Self {
        Self { index, refresh, operations: Vec::new() }
    }

    #[must_use]
    pub fn with_operations(mut self, operations: Vec<BulkOperation>) -> Self {
        self.operations = operations;
        self
    }

    pub fn push(&mut self, operation: BulkOperation) {
        self.operations.push(operation);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Flattened header/body lines, as sent over the wire.
    pub fn to_body(&self) -> Vec<Value> {
        let mut lines = Vec::with_capacity(self.operations.len() * 2);
        for operation in &self.operations {
            lines.push(operation.header());
            if let Some(body) = &operation.body {
                lines.push(body.clone());
            }
        }
        lines
    }
}
