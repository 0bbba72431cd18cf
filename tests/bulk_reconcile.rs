//! Bulk reconciliation against a scripted store.
//!
//! The store answers `bulk` with a fixed list of statuses and records every `mget`
//! call, so the tests can check exactly which keys were re-read and in what order.
//!
//! Run with: `cargo test --test bulk_reconcile`

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use search_adapter::bulk::{reconcile, remove_found, BulkItem, BulkOperation, BulkRequest};
use search_adapter::query::SourceFilter;
use search_adapter::storage::traits::{DocKey, DocumentStore, SearchRequest, SearchResponse, StorageError};
use search_adapter::{FieldNames, RefreshPolicy};

// =============================================================================
// Scripted Store
// =============================================================================

/// Answers each bulk operation with the next scripted status and records reads.
struct ScriptedStore {
    statuses: Vec<u16>,
    /// Every `mget` call, in call order
    reads: Mutex<Vec<Vec<DocKey>>>,
    /// Drop this many documents from every `mget` answer
    short_reads: usize,
    fail_bulk: bool,
}

impl ScriptedStore {
    fn new(statuses: Vec<u16>) -> Self {
        Self {
            statuses,
            reads: Mutex::new(Vec::new()),
            short_reads: 0,
            fail_bulk: false,
        }
    }

    fn read_calls(&self) -> Vec<Vec<DocKey>> {
        self.reads.lock().clone()
    }
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    async fn search(&self, _request: &SearchRequest) -> Result<SearchResponse, StorageError> {
        Ok(SearchResponse { total: 0, hits: Vec::new() })
    }

    async fn bulk(&self, request: &BulkRequest) -> Result<Vec<Value>, StorageError> {
        if self.fail_bulk {
            return Err(StorageError::Connection("connection reset".into()));
        }
        Ok(request
            .operations
            .iter()
            .zip(&self.statuses)
            .map(|(operation, status)| {
                let mut item = Map::new();
                if let Some(id) = &operation.id {
                    item.insert("_id".into(), json!(id));
                }
                item.insert("status".into(), json!(status));
                if *status >= 300 {
                    item.insert(
                        "error".into(),
                        json!({"type": "version_conflict_engine_exception", "reason": "exists"}),
                    );
                }
                let mut wrapped = Map::new();
                wrapped.insert(operation.action.as_str().to_string(), Value::Object(item));
                Value::Object(wrapped)
            })
            .collect())
    }

    async fn mget(
        &self,
        _index: Option<&str>,
        keys: &[DocKey],
        _source: &SourceFilter,
    ) -> Result<Vec<Value>, StorageError> {
        self.reads.lock().push(keys.to_vec());
        let returned = keys.len().saturating_sub(self.short_reads);
        Ok(keys
            .iter()
            .take(returned)
            .map(|key| json!({"_id": key.id, "found": true, "_source": {"fresh": key.id}}))
            .collect())
    }
}

fn create_request(ids: &[&str]) -> BulkRequest {
    BulkRequest::new(Some("people".into()), RefreshPolicy::WaitFor).with_operations(
        ids.iter()
            .map(|id| BulkOperation::create(Some(id.to_string()), None, Map::new()))
            .collect(),
    )
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn test_partial_failure_keeps_positions() {
    let store = ScriptedStore::new(vec![201, 409, 201]);
    let request = create_request(&["a", "b", "c"]);

    let items = reconcile(&store, "create", &request, &SourceFilter::All, &FieldNames::default())
        .await
        .unwrap();

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_document().unwrap()["fresh"], json!("a"));
    assert_eq!(items[2].as_document().unwrap()["fresh"], json!("c"));

    let failure = items[1].as_failure().expect("position 1 should fail");
    assert_eq!(failure.position, 1);
    assert_eq!(failure.status, 409);
    assert_eq!(failure.reason(), "exists");
    assert_eq!(failure.descriptor["_meta"]["_id"], json!("b"));

    assert_eq!(store.read_calls(), vec![vec![DocKey::new("a"), DocKey::new("c")]]);
}

#[tokio::test]
async fn test_all_failed_skips_reread() {
    let store = ScriptedStore::new(vec![409, 409, 409]);
    let request = create_request(&["a", "b", "c"]);

    let items = reconcile(&store, "create", &request, &SourceFilter::All, &FieldNames::default())
        .await
        .unwrap();

    assert_eq!(items.len(), 3);
    assert!(items.iter().all(BulkItem::is_failed));
    for (position, item) in items.iter().enumerate() {
        assert_eq!(item.as_failure().unwrap().position, position);
    }
    assert!(store.read_calls().is_empty());
}

#[tokio::test]
async fn test_reread_carries_operation_routing() {
    let store = ScriptedStore::new(vec![200, 200]);
    let request = BulkRequest::new(None, RefreshPolicy::False).with_operations(vec![
        BulkOperation::update("1".into(), Some("p1".into()), Map::new()),
        BulkOperation::update("2".into(), None, Map::new()),
    ]);

    let items = reconcile(&store, "patch", &request, &SourceFilter::All, &FieldNames::default())
        .await
        .unwrap();

    assert!(items.iter().all(|item| !item.is_failed()));
    assert_eq!(
        store.read_calls(),
        vec![vec![
            DocKey::new("1").with_routing(Some("p1".into())),
            DocKey::new("2"),
        ]]
    );
}

#[tokio::test]
async fn test_index_accepts_created_and_overwritten() {
    let store = ScriptedStore::new(vec![201, 200, 409]);
    let request = BulkRequest::new(None, RefreshPolicy::False).with_operations(vec![
        BulkOperation::index(Some("n".into()), None, Map::new()),
        BulkOperation::index(Some("o".into()), None, Map::new()),
        BulkOperation::index(Some("x".into()), None, Map::new()),
    ]);

    let items = reconcile(&store, "create", &request, &SourceFilter::All, &FieldNames::default())
        .await
        .unwrap();

    assert!(!items[0].is_failed());
    assert!(!items[1].is_failed());
    assert!(items[2].is_failed());
    assert_eq!(store.read_calls()[0].len(), 2);
}

#[tokio::test]
async fn test_create_overwrite_status_is_failure() {
    // A 200 answer to `create` is not a success for that action.
    let store = ScriptedStore::new(vec![200]);
    let items = reconcile(&store, "create", &create_request(&["a"]), &SourceFilter::All, &FieldNames::default())
        .await
        .unwrap();
    assert_eq!(items[0].as_failure().map(|f| f.status), Some(200));
    assert!(store.read_calls().is_empty());
}

// =============================================================================
// Store contract violations
// =============================================================================

#[tokio::test]
async fn test_bulk_error_propagates_without_reread() {
    let mut store = ScriptedStore::new(vec![201]);
    store.fail_bulk = true;

    let err = reconcile(&store, "create", &create_request(&["a"]), &SourceFilter::All, &FieldNames::default())
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Connection(_)));
    assert!(store.read_calls().is_empty());
}

#[tokio::test]
async fn test_short_bulk_response_is_contract_error() {
    let store = ScriptedStore::new(vec![201]);
    let err = reconcile(&store, "create", &create_request(&["a", "b"]), &SourceFilter::All, &FieldNames::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Contract(_)));
}

#[tokio::test]
async fn test_short_reread_is_contract_error() {
    let mut store = ScriptedStore::new(vec![201, 201]);
    store.short_reads = 1;
    let err = reconcile(&store, "create", &create_request(&["a", "b"]), &SourceFilter::All, &FieldNames::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Contract(_)));
}

// =============================================================================
// Delete path
// =============================================================================

#[tokio::test]
async fn test_remove_found_keeps_only_deleted() {
    let store = ScriptedStore::new(vec![200, 404, 200]);
    let request = BulkRequest::new(None, RefreshPolicy::False).with_operations(vec![
        BulkOperation::delete("a".into(), None),
        BulkOperation::delete("b".into(), None),
        BulkOperation::delete("c".into(), None),
    ]);
    let found = vec![json!({"_id": "a"}), json!({"_id": "b"}), json!({"_id": "c"})];

    let removed = remove_found(&store, &request, found, &FieldNames::default()).await.unwrap();

    assert_eq!(removed, vec![json!({"_id": "a"}), json!({"_id": "c"})]);
    assert!(store.read_calls().is_empty());
}
