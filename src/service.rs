// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document service: the adapter's public CRUD surface.
//!
//! ```text
//! find        normalize → compile → search → map
//! get         point read, or find({$and: [query, {id}]}) when the query has criteria
//! create      write one → get
//! update      get (existence) → index → get
//! patch       get (when criteria) → update → point read
//! remove      get → delete
//! create_many bulk create/index → re-read successes → merge
//! patch_many  find (current page only) → bulk update → re-read successes → merge
//! remove_many find → bulk delete → keep the removed documents
//! ```
//!
//! Single-document writes go through a one-item bulk call, so they share the
//! per-item status handling with the batched forms.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::bulk::{reconcile, BulkItem, BulkOperation, BulkRequest};
use crate::config::{AdapterConfig, Paginate};
use crate::document::{is_truthy, map_find, map_item, stringify, DocDescriptor, FindResult};
use crate::error::{AdapterError, QueryError};
use crate::metrics;
use crate::query::{FilterQuery, Filters, KindSet, QueryCompiler, SourceFilter, ValueKind};
use crate::storage::traits::{DocKey, DocumentStore, SearchRequest, StorageError};

/// Per-call parameters.
#[derive(Debug, Clone, Default)]
pub struct Params {
    /// Criteria plus control keys (`$limit`, `$skip`, `$sort`, `$select`, `$routing`, `$index`)
    pub query: Option<Value>,
    /// Overrides the configured pagination; `Some(Paginate::DISABLED)` forces a list
    pub paginate: Option<Paginate>,
    /// Writes replace or insert instead of failing on an existing id
    pub upsert: bool,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(query: Value) -> Self {
        Self { query: Some(query), ..Self::default() }
    }

    #[must_use]
    pub fn paginate(mut self, paginate: Paginate) -> Self {
        self.paginate = Some(paginate);
        self
    }

    #[must_use]
    pub fn upsert(mut self) -> Self {
        self.upsert = true;
        self
    }

    /// Query entries as a map; a non-object query yields an empty map.
    fn query_map(&self) -> Map<String, Value> {
        match &self.query {
            Some(Value::Object(query)) => query.clone(),
            _ => Map::new(),
        }
    }

    /// Same params with `query` replaced.
    fn with_query_map(&self, query: Map<String, Value>) -> Self {
        Self { query: Some(Value::Object(query)), ..self.clone() }
    }
}

/// CRUD adapter over a [`DocumentStore`].
pub struct DocumentService<S> {
    store: S,
    config: AdapterConfig,
    compiler: QueryCompiler,
}

impl<S: DocumentStore> DocumentService<S> {
    pub fn new(store: S, config: AdapterConfig) -> Self {
        let compiler = QueryCompiler::new(config.fields.id.clone()).with_max_depth(config.max_query_depth);
        Self { store, config, compiler }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Search with the request's criteria, pagination, sort and projection.
    pub async fn find(&self, params: &Params) -> Result<FindResult, AdapterError> {
        let paginate = self.paginate(params);
        let FilterQuery { filters, criteria } = FilterQuery::parse(params.query.as_ref(), &paginate)?;

        let query = match self.compiler.compile(Some(&Value::Object(criteria))) {
            Ok(query) => {
                metrics::record_query_compiled(if query.is_some() { "ok" } else { "empty" });
                query
            }
            Err(e) => {
                metrics::record_query_compiled("invalid");
                debug!(error = %e, "Rejected query");
                return Err(e.into());
            }
        };

        let request = SearchRequest {
            index: self.index_for(&filters),
            query,
            from: filters.skip,
            size: filters.limit,
            sort: filters.sort.clone(),
            routing: filters.routing.clone(),
            source: filters.select.clone(),
        };
        debug!(
            index = ?request.index,
            from = request.from,
            size = ?request.size,
            clauses = request.query.as_ref().map_or(0, |q| q.len()),
            "Searching"
        );

        let response = self.store.search(&request).await.map_err(|e| {
            metrics::record_store_error("search");
            e
        })?;
        Ok(map_find(&response, &filters, paginate.is_enabled(), &self.config.fields))
    }

    /// Fetch one document. With criteria in the query, the document must also match
    /// them.
    pub async fn get(&self, id: &str, params: &Params) -> Result<Value, AdapterError> {
        let FilterQuery { filters, criteria } = self.filter_query(params)?;
        let routing = self.descriptor(&criteria, &[]).routing;

        if self.query_length(&criteria) >= 1 {
            let fields = &self.config.fields;
            let mut scoped = criteria;
            scoped.remove(&fields.routing);
            scoped.remove(&fields.parent);
            let mut by_id = Map::new();
            by_id.insert(fields.id.clone(), Value::String(id.to_string()));

            let mut query = control_entries(&params.query_map(), &["$select", "$routing", "$index"]);
            if !query.contains_key("$routing") {
                if let Some(routing) = routing {
                    query.insert("$routing".into(), Value::String(routing));
                }
            }
            query.insert(
                "$and".into(),
                Value::Array(vec![Value::Object(scoped), Value::Object(by_id)]),
            );

            let matched = self
                .find(&params.with_query_map(query).paginate(Paginate::DISABLED))
                .await?;
            return matched
                .into_data()
                .into_iter()
                .next()
                .ok_or_else(|| AdapterError::NotFound(id.to_string()));
        }

        let key = DocKey::new(id).with_routing(routing);
        self.read_one(self.index_for(&filters).as_deref(), key, &filters.select).await
    }

    /// Create one document. An id in `data` makes this a strict create unless
    /// `params.upsert` is set.
    pub async fn create(&self, data: &Value, params: &Params) -> Result<Value, AdapterError> {
        let doc = as_document(data, "data")?;
        let FilterQuery { filters, .. } = self.filter_query(params)?;
        let descriptor = self.descriptor(doc, &[]);

        let operation = self.create_operation(&descriptor, params.upsert);
        let id = self.write_one(self.index_for(&filters), operation).await?;

        let mut query = Map::new();
        if let Some(routing) = &descriptor.routing {
            query.insert(self.config.fields.routing.clone(), Value::String(routing.clone()));
        }
        query.extend(params.query_map());
        self.get(&id, &params.with_query_map(query)).await
    }

    /// Create a batch. The result has one entry per input, in input order: the stored
    /// document, or the failure for that position.
    pub async fn create_many(&self, data: &[Value], params: &Params) -> Result<Vec<BulkItem>, AdapterError> {
        let FilterQuery { filters, .. } = self.filter_query(params)?;

        let mut operations = Vec::with_capacity(data.len());
        for (i, item) in data.iter().enumerate() {
            let doc = as_document(item, &format!("data[{i}]"))?;
            operations.push(self.create_operation(&self.descriptor(doc, &[]), params.upsert));
        }
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        let request = BulkRequest::new(self.index_for(&filters), self.config.refresh).with_operations(operations);
        Ok(reconcile::reconcile(&self.store, "create", &request, &filters.select, &self.config.fields).await?)
    }

    /// Replace a document. Unless `params.upsert` is set, the document must exist
    /// (and match the query's criteria, if any).
    pub async fn update(&self, id: &str, data: &Value, params: &Params) -> Result<Value, AdapterError> {
        let doc = as_document(data, "data")?;
        let FilterQuery { filters, criteria } = self.filter_query(params)?;
        let mut id_entry = Map::new();
        id_entry.insert(self.config.fields.id.clone(), Value::String(id.to_string()));
        let descriptor = self.descriptor(doc, &[&criteria, &id_entry]);

        if !params.upsert {
            let mut query = Map::new();
            query.insert("$select".into(), Value::Bool(false));
            query.extend(params.query_map());
            self.get(id, &params.with_query_map(query)).await?;
        }

        let operation = BulkOperation::index(descriptor.id, descriptor.routing, descriptor.doc);
        let written = self.write_one(self.index_for(&filters), operation).await?;
        self.get(&written, &Params { upsert: false, ..params.clone() }).await
    }

    /// Merge `data` into a document and return the result.
    pub async fn patch(&self, id: &str, data: &Value, params: &Params) -> Result<Value, AdapterError> {
        let doc = as_document(data, "data")?;
        let FilterQuery { filters, criteria } = self.filter_query(params)?;
        let routing = self.descriptor(&criteria, &[]).routing;
        let body = self.descriptor(doc, &[]).doc;

        if self.query_length(&criteria) >= 1 {
            self.get(id, params).await?;
        }

        let index = self.index_for(&filters);
        let operation = BulkOperation::update(id.to_string(), routing.clone(), body);
        let written = self.write_one(index.clone(), operation).await?;
        let key = DocKey::new(written).with_routing(routing);
        self.read_one(index.as_deref(), key, &filters.select).await
    }

    /// Patch every document on the current page of `params.query`.
    ///
    /// Pagination applies to the selection, so with a page size of N at most N
    /// documents are patched per call.
    pub async fn patch_many(&self, data: &Value, params: &Params) -> Result<Vec<BulkItem>, AdapterError> {
        let doc = as_document(data, "data")?;
        let FilterQuery { filters, .. } = self.filter_query(params)?;

        let mut query = params.query_map();
        query.insert("$select".into(), Value::Bool(false));
        let found = self.find(&params.with_query_map(query)).await?.into_data();
        if found.is_empty() {
            debug!("Nothing matched, skipping bulk patch");
            return Ok(Vec::new());
        }

        let body = self.descriptor(doc, &[]).doc;
        let operations = found
            .iter()
            .map(|item| {
                let (id, routing) = self.found_key(item)?;
                Ok(BulkOperation::update(id, routing, body.clone()))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;

        let request = BulkRequest::new(self.index_for(&filters), self.config.refresh).with_operations(operations);
        Ok(reconcile::reconcile(&self.store, "patch", &request, &filters.select, &self.config.fields).await?)
    }

    /// Delete one document and return it as it was.
    pub async fn remove(&self, id: &str, params: &Params) -> Result<Value, AdapterError> {
        let FilterQuery { filters, criteria } = self.filter_query(params)?;
        let routing = self.descriptor(&criteria, &[]).routing;

        let found = self.get(id, params).await?;
        self.write_one(self.index_for(&filters), BulkOperation::delete(id.to_string(), routing))
            .await?;
        info!(id, "Removed document");
        Ok(found)
    }

    /// Delete every document on the current page of `params.query`. Only the documents
    /// that were actually removed are returned.
    pub async fn remove_many(&self, params: &Params) -> Result<Vec<Value>, AdapterError> {
        let FilterQuery { filters, .. } = self.filter_query(params)?;

        let found = self.find(params).await?.into_data();
        if found.is_empty() {
            debug!("Nothing matched, skipping bulk delete");
            return Ok(found);
        }

        let operations = found
            .iter()
            .map(|item| {
                let (id, routing) = self.found_key(item)?;
                Ok(BulkOperation::delete(id, routing))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;

        let request = BulkRequest::new(self.index_for(&filters), self.config.refresh).with_operations(operations);
        Ok(reconcile::remove_found(&self.store, &request, found, &self.config.fields).await?)
    }

    fn paginate(&self, params: &Params) -> Paginate {
        params.paginate.unwrap_or(self.config.paginate)
    }

    fn filter_query(&self, params: &Params) -> Result<FilterQuery, QueryError> {
        FilterQuery::parse(params.query.as_ref(), &self.paginate(params))
    }

    fn index_for(&self, filters: &Filters) -> Option<String> {
        filters.index.clone().or_else(|| self.config.index.clone())
    }

    fn descriptor(&self, data: &Map<String, Value>, supplementary: &[&Map<String, Value>]) -> DocDescriptor {
        DocDescriptor::resolve(&self.config.fields, data, supplementary)
    }

    /// Criteria keys other than the routing and parent aliases.
    fn query_length(&self, criteria: &Map<String, Value>) -> usize {
        let fields = &self.config.fields;
        criteria
            .keys()
            .filter(|key| **key != fields.routing && **key != fields.parent)
            .count()
    }

    fn create_operation(&self, descriptor: &DocDescriptor, upsert: bool) -> BulkOperation {
        let body = descriptor.body_with_relation(&self.config.fields);
        let id = descriptor.id.clone();
        let routing = descriptor.routing.clone();
        if id.is_some() && !upsert {
            BulkOperation::create(id, routing, body)
        } else {
            BulkOperation::index(id, routing, body)
        }
    }

    /// Id and routing of a document returned by `find`: `_meta._id`, and
    /// `_meta._routing` falling back to `_meta._parent`.
    fn found_key(&self, item: &Value) -> Result<(String, Option<String>), StorageError> {
        let meta = item.get(&self.config.fields.meta);
        let id = meta
            .and_then(|meta| meta.get("_id"))
            .filter(|id| !id.is_null())
            .map(stringify)
            .ok_or_else(|| StorageError::Contract("search hit without _id".into()))?;
        let routing = ["_routing", "_parent"]
            .iter()
            .find_map(|key| meta.and_then(|meta| meta.get(*key)).filter(|v| is_truthy(v)))
            .map(stringify);
        Ok((id, routing))
    }

    async fn read_one(&self, index: Option<&str>, key: DocKey, source: &SourceFilter) -> Result<Value, AdapterError> {
        match self.store.get(index, &key, source).await {
            Ok(doc) => Ok(map_item(&doc, &self.config.fields)),
            Err(StorageError::NotFound) => Err(AdapterError::NotFound(key.id)),
            Err(e) => {
                metrics::record_store_error("get");
                Err(e.into())
            }
        }
    }

    /// One-item bulk write; returns the persisted id. A 404 becomes `NotFound`, any
    /// other item failure `Rejected`.
    async fn write_one(&self, index: Option<String>, operation: BulkOperation) -> Result<String, AdapterError> {
        let requested_id = operation.id.clone();
        let request = BulkRequest::new(index, self.config.refresh).with_operations(vec![operation]);
        let outcome = reconcile::write(&self.store, &request, &self.config.fields)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::Contract("empty bulk response".into()))?;

        if let Some(id) = outcome.persisted_id() {
            return Ok(id.to_string());
        }
        match outcome.into_item() {
            BulkItem::Failed(failure) if failure.status == 404 => {
                Err(AdapterError::NotFound(requested_id.unwrap_or_default()))
            }
            BulkItem::Failed(failure) => Err(AdapterError::Rejected {
                status: failure.status,
                reason: failure.reason(),
            }),
            BulkItem::Document(_) => Err(StorageError::Contract("unclassified bulk item".into()).into()),
        }
    }
}

/// `data` as an object, or an `InvalidQueryShape` for `key`.
fn as_document<'a>(data: &'a Value, key: &str) -> Result<&'a Map<String, Value>, QueryError> {
    match data {
        Value::Object(doc) => Ok(doc),
        other => Err(QueryError::InvalidQueryShape {
            key: key.to_string(),
            expected: KindSet::from(&[ValueKind::Object][..]),
            found: ValueKind::of(Some(other)),
        }),
    }
}

fn control_entries(query: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    query
        .iter()
        .filter(|(key, _)| keys.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
