// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-item decoding of bulk responses.
//!
//! Each response item is classified against the action that produced it:
//!
//! | action | success      | outcome            |
//! |--------|--------------|--------------------|
//! | create | 201          | `Created`          |
//! | index  | 201 / 200    | `Created` / `Updated` |
//! | update | 200          | `Updated`          |
//! | delete | 200          | `Deleted`          |
//!
//! Anything else is `Failed(status, error)`. A failed item is an outcome, not an error;
//! only a response that breaks the store contract (wrong length, unknown shape) is.

use serde_json::Value;

use super::action::{BulkAction, BulkOperation};
use crate::config::FieldNames;
use crate::document::{map_item, map_patch};
use crate::storage::traits::StorageError;

/// Classification of one item. Successes carry the persisted identity.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeKind {
    Created { id: String },
    Updated { id: String },
    Deleted { id: String },
    Failed { status: u16, error: Value },
}

/// Decoded response item, tied to its request position.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub position: usize,
    pub action: BulkAction,
    pub kind: OutcomeKind,
    /// The raw item through the result mapper: the write acknowledgement for
    /// successes (with the post-write snapshot for updates), the failure descriptor
    /// otherwise.
    pub item: Value,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.persisted_id().is_some()
    }

    /// Identity of a successful write.
    pub fn persisted_id(&self) -> Option<&str> {
        match &self.kind {
            OutcomeKind::Created { id } | OutcomeKind::Updated { id } | OutcomeKind::Deleted { id } => {
                Some(id)
            }
            OutcomeKind::Failed { .. } => None,
        }
    }

    pub fn into_item(self) -> BulkItem {
        match self.kind {
            OutcomeKind::Failed { status, error } => BulkItem::Failed(BulkFailure {
                position: self.position,
                status,
                error,
                descriptor: self.item,
            }),
            _ => BulkItem::Document(self.item),
        }
    }
}

/// A failed bulk item as handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFailure {
    pub position: usize,
    pub status: u16,
    /// Store error detail, typically `{type, reason}`
    pub error: Value,
    /// Mapped raw item (`{_meta: {_id, status, error}, ...}`)
    pub descriptor: Value,
}

impl BulkFailure {
    /// Human-readable reason: `error.reason`, then `error.type`, then the raw error.
    pub fn reason(&self) -> String {
        ["reason", "type"]
            .iter()
            .find_map(|key| self.error.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| self.error.to_string())
    }
}

/// One slot of a reconciled bulk result, in request order.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkItem {
    /// Refreshed document (or the write acknowledgement when no re-read was needed)
    Document(Value),
    Failed(BulkFailure),
}

impl BulkItem {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn as_document(&self) -> Option<&Value> {
        match self {
            Self::Document(doc) => Some(doc),
            Self::Failed(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&BulkFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            Self::Document(_) => None,
        }
    }

    /// Caller-facing value: the document, or the failure descriptor.
    pub fn into_value(self) -> Value {
        match self {
            Self::Document(doc) => doc,
            Self::Failed(failure) => failure.descriptor,
        }
    }
}

/// Decode one `{action: {_id, status, error?}}` item for `operation`.
pub fn decode_item(
    position: usize,
    operation: &BulkOperation,
    raw: &Value,
    fields: &FieldNames,
) -> Result<ItemOutcome, StorageError> {
    let (name, inner) = raw
        .as_object()
        .filter(|entry| entry.len() == 1)
        .and_then(|entry| entry.iter().next())
        .ok_or_else(|| StorageError::Contract(format!("bulk item {position} is not a single-action object")))?;

    let action = BulkAction::parse(name)
        .filter(|action| *action == operation.action)
        .ok_or_else(|| {
            StorageError::Contract(format!(
                "bulk item {position} answers '{name}' for a '{}' request",
                operation.action.as_str()
            ))
        })?;

    let status = inner
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
        .ok_or_else(|| StorageError::Contract(format!("bulk item {position} has no status")))?;

    let item = match action {
        BulkAction::Update => map_patch(inner, fields),
        _ => map_item(inner, fields),
    };

    let id = inner
        .get("_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| operation.id.clone());

    let kind = match (action.is_success(status), id) {
        (true, Some(id)) => match action {
            BulkAction::Create => OutcomeKind::Created { id },
            BulkAction::Index if status == 201 => OutcomeKind::Created { id },
            BulkAction::Index | BulkAction::Update => OutcomeKind::Updated { id },
            BulkAction::Delete => OutcomeKind::Deleted { id },
        },
        (true, None) => {
            return Err(StorageError::Contract(format!(
                "bulk item {position} succeeded without an id"
            )))
        }
        (false, _) => OutcomeKind::Failed {
            status,
            error: inner.get("error").cloned().unwrap_or(Value::Null),
        },
    };

    Ok(ItemOutcome { position, action, kind, item })
}

/// Decode a whole response against its request. The response must have exactly one
/// item per operation.
pub fn decode_all(
    operations: &[BulkOperation],
    raw: &[Value],
    fields: &FieldNames,
) -> Result<Vec<ItemOutcome>, StorageError> {
    if operations.len() != raw.len() {
        return Err(StorageError::Contract(format!(
            "bulk returned {} items for {} operations",
            raw.len(),
            operations.len()
        )));
    }
    operations
        .iter()
        .zip(raw)
        .enumerate()
        .map(|(position, (operation, item))| decode_item(position, operation, item, fields))
        .collect()
}
