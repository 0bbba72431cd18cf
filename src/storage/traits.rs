// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::bulk::BulkRequest;
use crate::query::{BoolQuery, SortField, SourceFilter};

/// Opaque failure from the store. Propagated unchanged; this crate never retries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Document not found")]
    NotFound,
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Storage connection error: {0}")]
    Connection(String),
    /// The store answered, but not in the shape or order it promised.
    #[error("Store response contract violated: {0}")]
    Contract(String),
}

/// Point-read key: identity plus optional routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DocKey {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
}

impl DocKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), routing: None }
    }

    #[must_use]
    pub fn with_routing(mut self, routing: Option<String>) -> Self {
        self.routing = routing;
        self
    }
}

/// One search call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub index: Option<String>,
    /// `None` means match everything
    pub query: Option<BoolQuery>,
    pub from: usize,
    pub size: Option<usize>,
    pub sort: Vec<SortField>,
    pub routing: Option<String>,
    pub source: SourceFilter,
}

impl SearchRequest {
    /// Request body in the store's native form. The query clause is omitted when there
    /// is nothing to constrain.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        if let Some(query) = &self.query {
            body.insert("query".into(), query.to_clause());
        }
        body.insert("from".into(), Value::from(self.from));
        if let Some(size) = self.size {
            body.insert("size".into(), Value::from(size));
        }
        if !self.sort.is_empty() {
            body.insert(
                "sort".into(),
                Value::Array(self.sort.iter().map(SortField::to_value).collect()),
            );
        }
        body.insert("_source".into(), self.source.to_value());
        Value::Object(body)
    }
}

/// Search result: total match count and the hits of the requested window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub total: u64,
    /// Raw hits: `{_id, _index, _routing?, _source?}`
    pub hits: Vec<Value>,
}

impl SearchResponse {
    /// Decode a native `{hits: {total, hits}}` response. `total` may be a number or
    /// `{value: n}`, depending on the store version.
    pub fn from_value(response: &Value) -> Result<Self, StorageError> {
        let hits = response
            .get("hits")
            .ok_or_else(|| StorageError::Contract("search response without hits".into()))?;
        let total = match hits.get("total") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64),
            _ => None,
        }
        .ok_or_else(|| StorageError::Contract("search response without total".into()))?;
        let hits = hits
            .get("hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(Self { total, hits })
    }
}

/// The three calls the adapter needs from a search store.
///
/// Implementations must keep response order equal to request order for `bulk` and
/// `mget`; the reconciliation engine pairs items by position.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Boolean-query search.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, StorageError>;

    /// Batched write. Returns one `{action: {_id, status, error?, ...}}` item per
    /// operation, in request order. Item failures are not errors.
    async fn bulk(&self, request: &BulkRequest) -> Result<Vec<Value>, StorageError>;

    /// Batched point read. Returns one `{_id, found, _source?}` document per key, in
    /// key order.
    async fn mget(
        &self,
        index: Option<&str>,
        keys: &[DocKey],
        source: &SourceFilter,
    ) -> Result<Vec<Value>, StorageError>;

    /// Single point read.
    /// Default implementation falls back to a one-key `mget`.
    async fn get(
        &self,
        index: Option<&str>,
        key: &DocKey,
        source: &SourceFilter,
    ) -> Result<Value, StorageError> {
        let mut docs = self.mget(index, std::slice::from_ref(key), source).await?;
        if docs.len() != 1 {
            return Err(StorageError::Contract(format!(
                "mget returned {} documents for 1 key",
                docs.len()
            )));
        }
        let doc = docs.swap_remove(0);
        if doc.get("found").and_then(Value::as_bool) == Some(false) {
            return Err(StorageError::NotFound);
        }
        Ok(doc)
    }
}
