// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error taxonomy.
//!
//! - [`QueryError`]: malformed client criteria. Raised eagerly during compilation,
//!   before any store call is made. Never retried.
//! - [`StorageError`]: opaque transport failure from the store, propagated unchanged.
//! - [`AdapterError`]: what the service layer returns, wrapping both of the above plus
//!   single-document write rejections.
//!
//! Partial bulk failures are not errors at all; they are per-item outcomes
//! (see [`crate::bulk::BulkItem`]).

use thiserror::Error;

use crate::query::{KindSet, ValueKind};
pub use crate::storage::traits::StorageError;

/// Client-input errors raised by the query compiler and filter normalizer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// An operator (or field) value has the wrong shape.
    #[error("{key} should be one of {expected}")]
    InvalidQueryShape {
        /// Offending key, e.g. `$or`, `$sqs.$fields`, `$exists[2]`
        key: String,
        /// Accepted value kinds for that key
        expected: KindSet,
        /// What was actually supplied
        found: ValueKind,
    },
    /// `$and/$or/$nested/$child/$parent` nested deeper than the configured limit.
    #[error("query nesting exceeds the maximum depth of {max}")]
    NestingTooDeep { max: usize },
}

impl QueryError {
    /// The key this error refers to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::InvalidQueryShape { key, .. } => Some(key),
            Self::NestingTooDeep { .. } => None,
        }
    }
}

/// Errors surfaced by [`crate::DocumentService`].
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error(transparent)]
    InvalidQuery(#[from] QueryError),

    #[error("No record found for id '{0}'")]
    NotFound(String),

    /// The store refused a single-document write (e.g. 409 on create of an existing id).
    #[error("Store rejected the write with status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AdapterError {
    /// Whether the caller caused this (bad input, missing or conflicting document).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidQuery(_) | Self::NotFound(_) => true,
            Self::Rejected { status, .. } => (400..500).contains(status),
            Self::Storage(StorageError::NotFound) => true,
            Self::Storage(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_shape_message() {
        let err = QueryError::InvalidQueryShape {
            key: "$or".into(),
            expected: KindSet::from(&[ValueKind::Array][..]),
            found: ValueKind::String,
        };
        assert_eq!(err.to_string(), "$or should be one of array");
        assert_eq!(err.key(), Some("$or"));
    }

    #[test]
    fn test_multi_kind_message() {
        let err = QueryError::InvalidQueryShape {
            key: "query".into(),
            expected: KindSet::from(&[ValueKind::Object, ValueKind::Null, ValueKind::Missing][..]),
            found: ValueKind::Number,
        };
        assert_eq!(err.to_string(), "query should be one of object, null, undefined");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(AdapterError::NotFound("1".into()).is_client_error());
        assert!(AdapterError::Rejected { status: 409, reason: "conflict".into() }.is_client_error());
        assert!(!AdapterError::Rejected { status: 503, reason: "busy".into() }.is_client_error());
        assert!(!AdapterError::Storage(StorageError::Backend("boom".into())).is_client_error());
        assert!(AdapterError::from(QueryError::NestingTooDeep { max: 4 }).is_client_error());
    }
}
