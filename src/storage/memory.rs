// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory reference store.
//!
//! Implements [`DocumentStore`] over a `DashMap`, with the status codes a search
//! store reports for bulk items:
//!
//! | action | outcome                      |
//! |--------|------------------------------|
//! | create | 201, or 409 if the id exists |
//! | index  | 201 new, 200 overwritten     |
//! | update | 200, or 404 if missing       |
//! | delete | 200, or 404 if missing       |
//!
//! Writes are visible immediately, whatever the refresh policy.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::matcher::{compare, field_values, matches_query, DocView};
use super::traits::{DocKey, DocumentStore, SearchRequest, SearchResponse, StorageError};
use crate::bulk::{BulkAction, BulkOperation, BulkRequest};
use crate::query::{SortOrder, SourceFilter};

const DEFAULT_INDEX: &str = "default";

#[derive(Debug, Clone)]
struct StoredDoc {
    /// Insertion sequence, the tie-breaker for result order
    seq: u64,
    routing: Option<String>,
    source: Map<String, Value>,
}

pub struct InMemoryStore {
    data: DashMap<(String, String), StoredDoc>,
    next_id: AtomicU64,
    next_seq: AtomicU64,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            next_id: AtomicU64::new(1),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Get current document count across all indices
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clear all documents
    pub fn clear(&self) {
        self.data.clear();
    }

    /// Source of a stored document, if present.
    #[must_use]
    pub fn source(&self, index: Option<&str>, id: &str) -> Option<Map<String, Value>> {
        self.data
            .get(&key(index, id))
            .map(|doc| doc.value().source.clone())
    }

    fn generate_id(&self, index: &str) -> String {
        loop {
            let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed).to_string();
            if !self.data.contains_key(&(index.to_string(), id.clone())) {
                return id;
            }
        }
    }

    fn stored(&self, routing: Option<String>, source: Map<String, Value>) -> StoredDoc {
        StoredDoc {
            seq: self.next_seq.fetch_add(1, AtomicOrdering::Relaxed),
            routing,
            source,
        }
    }

    fn apply(&self, index: &str, operation: &BulkOperation) -> Value {
        let action = operation.action;
        match action {
            BulkAction::Create | BulkAction::Index => {
                let Some(Value::Object(source)) = &operation.body else {
                    return failure(
                        action,
                        index,
                        operation.id.as_deref(),
                        400,
                        "mapper_parsing_exception",
                        "document body must be an object",
                    );
                };
                let id = operation.id.clone().unwrap_or_else(|| self.generate_id(index));
                let entry = self.data.entry((index.to_string(), id.clone()));
                let status = match entry {
                    dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                        if action == BulkAction::Create {
                            let reason =
                                format!("[{id}]: version conflict, document already exists");
                            return failure(
                                action,
                                index,
                                Some(&id),
                                409,
                                "version_conflict_engine_exception",
                                &reason,
                            );
                        }
                        let seq = occupied.get().seq;
                        occupied.insert(StoredDoc {
                            seq,
                            routing: operation.routing.clone(),
                            source: source.clone(),
                        });
                        200
                    }
                    dashmap::mapref::entry::Entry::Vacant(vacant) => {
                        vacant.insert(self.stored(operation.routing.clone(), source.clone()));
                        201
                    }
                };
                let result = if status == 201 { "created" } else { "updated" };
                success(action, index, &id, operation.routing.as_deref(), status, result, None)
            }
            BulkAction::Update => {
                let Some(id) = operation.id.as_deref() else {
                    return missing_id(action, index);
                };
                let Some(mut stored) = self.data.get_mut(&key(Some(index), id)) else {
                    return missing(action, index, id);
                };
                let patch = operation.body.as_ref().and_then(|b| b.get("doc"));
                if let Some(Value::Object(patch)) = patch {
                    deep_merge(&mut stored.source, patch);
                }
                let routing = stored.routing.clone();
                let snapshot = Value::Object(stored.source.clone());
                drop(stored);
                success(action, index, id, routing.as_deref(), 200, "updated", Some(snapshot))
            }
            BulkAction::Delete => {
                let Some(id) = operation.id.as_deref() else {
                    return missing_id(action, index);
                };
                match self.data.remove(&key(Some(index), id)) {
                    Some((_, removed)) => {
                        let routing = removed.routing.as_deref();
                        success(action, index, id, routing, 200, "deleted", None)
                    }
                    None => missing(action, index, id),
                }
            }
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn key(index: Option<&str>, id: &str) -> (String, String) {
    (index.unwrap_or(DEFAULT_INDEX).to_string(), id.to_string())
}

fn success(
    action: BulkAction,
    index: &str,
    id: &str,
    routing: Option<&str>,
    status: u16,
    result: &str,
    snapshot: Option<Value>,
) -> Value {
    let mut item = Map::new();
    item.insert("_index".into(), json!(index));
    item.insert("_id".into(), json!(id));
    if let Some(routing) = routing {
        item.insert("_routing".into(), json!(routing));
    }
    item.insert("status".into(), json!(status));
    item.insert("result".into(), json!(result));
    if let Some(source) = snapshot {
        item.insert("get".into(), json!({ "_source": source }));
    }
    wrap(action, item)
}

fn failure(
    action: BulkAction,
    index: &str,
    id: Option<&str>,
    status: u16,
    kind: &str,
    reason: &str,
) -> Value {
    let mut item = Map::new();
    item.insert("_index".into(), json!(index));
    if let Some(id) = id {
        item.insert("_id".into(), json!(id));
    }
    item.insert("status".into(), json!(status));
    item.insert("error".into(), json!({ "type": kind, "reason": reason }));
    wrap(action, item)
}

fn missing(action: BulkAction, index: &str, id: &str) -> Value {
    let reason = format!("[{id}]: document missing");
    failure(action, index, Some(id), 404, "document_missing_exception", &reason)
}

fn missing_id(action: BulkAction, index: &str) -> Value {
    failure(action, index, None, 400, "action_request_validation_exception", "id is missing")
}

/// `{action: item}`
fn wrap(action: BulkAction, item: Map<String, Value>) -> Value {
    let mut wrapped = Map::new();
    wrapped.insert(action.as_str().to_string(), Value::Object(item));
    Value::Object(wrapped)
}

/// Recursive object merge, the way partial updates apply `doc`.
fn deep_merge(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (field, value) in patch {
        match (target.get_mut(field), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(field.clone(), value.clone());
            }
        }
    }
}

fn hit(index: &str, id: &str, doc: &StoredDoc, source: &SourceFilter) -> Map<String, Value> {
    let mut hit = Map::new();
    hit.insert("_index".into(), json!(index));
    hit.insert("_id".into(), json!(id));
    if let Some(routing) = &doc.routing {
        hit.insert("_routing".into(), json!(routing));
    }
    if let Some(projected) = source.project(&doc.source) {
        hit.insert("_source".into(), Value::Object(projected));
    }
    hit
}

/// Sort key comparison; documents without the field sort last in either direction.
fn compare_field(a: DocView<'_>, b: DocView<'_>, field: &str, order: SortOrder) -> Ordering {
    let left = field_values(a, field).into_iter().next();
    let right = field_values(b, field).into_iter().next();
    match (left, right) {
        (Some(l), Some(r)) => {
            let ordering = compare(&l, &r).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, StorageError> {
        let index = request.index.as_deref().unwrap_or(DEFAULT_INDEX);

        let mut matched: Vec<(String, StoredDoc)> = Vec::new();
        for entry in self.data.iter() {
            let (doc_index, id) = entry.key();
            if doc_index != index {
                continue;
            }
            let view = DocView { id, source: &entry.value().source };
            let is_match = match &request.query {
                Some(query) => matches_query(query, view)?,
                None => true,
            };
            if is_match {
                matched.push((id.clone(), entry.value().clone()));
            }
        }

        matched.sort_by(|(a_id, a), (b_id, b)| {
            let a_view = DocView { id: a_id, source: &a.source };
            let b_view = DocView { id: b_id, source: &b.source };
            request
                .sort
                .iter()
                .map(|sort| compare_field(a_view, b_view, &sort.field, sort.order))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.seq.cmp(&b.seq))
        });

        let total = matched.len() as u64;
        let hits = matched
            .iter()
            .skip(request.from)
            .take(request.size.unwrap_or(usize::MAX))
            .map(|(id, doc)| Value::Object(hit(index, id, doc, &request.source)))
            .collect::<Vec<_>>();

        debug!(index, total, returned = hits.len(), "In-memory search");
        Ok(SearchResponse { total, hits })
    }

    async fn bulk(&self, request: &BulkRequest) -> Result<Vec<Value>, StorageError> {
        let index = request.index.as_deref().unwrap_or(DEFAULT_INDEX);
        debug!(index, count = request.len(), refresh = request.refresh.as_str(), "In-memory bulk");
        Ok(request
            .operations
            .iter()
            .map(|operation| self.apply(index, operation))
            .collect())
    }

    async fn mget(
        &self,
        index: Option<&str>,
        keys: &[DocKey],
        source: &SourceFilter,
    ) -> Result<Vec<Value>, StorageError> {
        let index = index.unwrap_or(DEFAULT_INDEX);
        Ok(keys
            .iter()
            .map(|doc_key| match self.data.get(&key(Some(index), &doc_key.id)) {
                Some(doc) => {
                    let mut found = hit(index, &doc_key.id, doc.value(), source);
                    found.insert("found".into(), Value::Bool(true));
                    Value::Object(found)
                }
                None => json!({ "_index": index, "_id": doc_key.id, "found": false }),
            })
            .collect())
    }
}
