// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bulk Reconciliation Engine
//!
//! ```text
//!  operations ──→ store.bulk ──→ decode ──→ outcomes [ok, FAIL, ok]
//!                                               │
//!                                 compaction keys [k0, k2]   (empty: stop here)
//!                                               │
//!                                   store.mget ──→ refreshed [d0, d2]
//!                                               │
//!                      cursor merge ──→ [d0, FAIL, d2]
//! ```
//!
//! At most two store calls, strictly in sequence: the read is only issued after the
//! write response is fully decoded. Store failures propagate unchanged.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::action::BulkRequest;
use super::outcome::{decode_all, BulkItem, ItemOutcome, OutcomeKind};
use crate::config::FieldNames;
use crate::document::map_item;
use crate::metrics;
use crate::query::SourceFilter;
use crate::storage::traits::{DocKey, DocumentStore, StorageError};

/// Issue `request` and decode every item. No re-read.
pub async fn write<S>(
    store: &S,
    request: &BulkRequest,
    fields: &FieldNames,
) -> Result<Vec<ItemOutcome>, StorageError>
where
    S: DocumentStore + ?Sized,
{
    debug!(count = request.len(), "Issuing bulk write");
    let raw = store.bulk(request).await.map_err(|e| {
        metrics::record_store_error("bulk");
        warn!(error = %e, "Bulk write failed");
        e
    })?;
    let outcomes = decode_all(&request.operations, &raw, fields).map_err(|e| {
        metrics::record_store_error("bulk");
        warn!(error = %e, "Bulk response violates the store contract");
        e
    })?;

    for outcome in &outcomes {
        if let OutcomeKind::Failed { status, error } = &outcome.kind {
            warn!(
                position = outcome.position,
                action = outcome.action.as_str(),
                status,
                error = %error,
                "Bulk item failed"
            );
        }
    }
    Ok(outcomes)
}

/// Write `request`, then re-read the successful items and splice them back into
/// request order. Failed positions keep their failure descriptor.
pub async fn reconcile<S>(
    store: &S,
    operation: &'static str,
    request: &BulkRequest,
    source: &SourceFilter,
    fields: &FieldNames,
) -> Result<Vec<BulkItem>, StorageError>
where
    S: DocumentStore + ?Sized,
{
    let _timer = metrics::BulkTimer::new(operation);
    let outcomes = write(store, request, fields).await?;

    let keys = compaction_keys(&outcomes, request);
    let failed = outcomes.len() - keys.len();
    metrics::record_bulk_items(operation, keys.len(), failed);

    if keys.is_empty() {
        debug!(operation, count = outcomes.len(), "No successful items, skipping re-read");
        metrics::record_secondary_read(false);
        return Ok(outcomes.into_iter().map(ItemOutcome::into_item).collect());
    }

    metrics::record_secondary_read(true);
    let fetched = store
        .mget(request.index.as_deref(), &keys, source)
        .await
        .map_err(|e| {
            metrics::record_store_error("mget");
            warn!(error = %e, "Re-read after bulk write failed");
            e
        })?;
    let refreshed: Vec<Value> = fetched.iter().map(|doc| map_item(doc, fields)).collect();

    let items = merge_refreshed(outcomes, refreshed).map_err(|e| {
        warn!(error = %e, "Re-read violates the store contract");
        e
    })?;
    info!(operation, succeeded = keys.len(), failed, "Bulk operation complete");
    Ok(items)
}

/// Delete path: write only, then keep the `found` documents whose delete succeeded.
/// Failures are dropped from the result.
pub async fn remove_found<S>(
    store: &S,
    request: &BulkRequest,
    found: Vec<Value>,
    fields: &FieldNames,
) -> Result<Vec<Value>, StorageError>
where
    S: DocumentStore + ?Sized,
{
    let _timer = metrics::BulkTimer::new("remove");
    let outcomes = write(store, request, fields).await?;
    let removed = retain_successful(found, &outcomes);

    let failed = outcomes.len() - removed.len();
    metrics::record_bulk_items("remove", removed.len(), failed);
    info!(operation = "remove", succeeded = removed.len(), failed, "Bulk operation complete");
    Ok(removed)
}

/// Keys of the successful outcomes, in their original relative order. Routing comes
/// from the operation at the same position.
pub fn compaction_keys(outcomes: &[ItemOutcome], request: &BulkRequest) -> Vec<DocKey> {
    outcomes
        .iter()
        .filter_map(|outcome| {
            let id = outcome.persisted_id()?;
            let routing = request
                .operations
                .get(outcome.position)
                .and_then(|operation| operation.routing.clone());
            Some(DocKey::new(id).with_routing(routing))
        })
        .collect()
}

/// Two-pointer merge: walk `outcomes` in order; each success consumes the next
/// refreshed document, each failure stays as it is.
///
/// `refreshed` must hold exactly one document per success, in success order.
pub fn merge_refreshed(
    outcomes: Vec<ItemOutcome>,
    refreshed: Vec<Value>,
) -> Result<Vec<BulkItem>, StorageError> {
    let successes = outcomes.iter().filter(|o| o.is_success()).count();
    if refreshed.len() != successes {
        return Err(StorageError::Contract(format!(
            "mget returned {} documents for {} keys",
            refreshed.len(),
            successes
        )));
    }

    let mut cursor = refreshed.into_iter();
    Ok(outcomes
        .into_iter()
        .map(|outcome| {
            if outcome.is_success() {
                // Length checked above.
                cursor.next().map_or_else(|| outcome.into_item(), BulkItem::Document)
            } else {
                outcome.into_item()
            }
        })
        .collect())
}

/// `found[i]` is kept iff the outcome at position `i` succeeded.
pub fn retain_successful(found: Vec<Value>, outcomes: &[ItemOutcome]) -> Vec<Value> {
    found
        .into_iter()
        .zip(outcomes)
        .filter_map(|(doc, outcome)| outcome.is_success().then_some(doc))
        .collect()
}
