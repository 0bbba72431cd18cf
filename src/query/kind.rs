// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Type Validator
//!
//! Every operator in the filter language expects a particular value shape. This module
//! classifies JSON values into a small closed set of kinds and rejects mismatches with a
//! structured [`QueryError::InvalidQueryShape`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QueryError;

/// Shape of a criteria value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Null,
    /// Key not present at all
    Missing,
}

impl ValueKind {
    /// Classify an optional JSON value. `None` means the key was absent.
    #[must_use]
    pub fn of(value: Option<&Value>) -> Self {
        match value {
            None => Self::Missing,
            Some(Value::Null) => Self::Null,
            Some(Value::Bool(_)) => Self::Boolean,
            Some(Value::Number(_)) => Self::Number,
            Some(Value::String(_)) => Self::String,
            Some(Value::Array(_)) => Self::Array,
            Some(Value::Object(_)) => Self::Object,
        }
    }

    /// String, number or boolean.
    #[must_use]
    pub fn is_scalar(self) -> bool {
        matches!(self, Self::String | Self::Number | Self::Boolean)
    }

    /// Null or missing: the operator is switched off.
    #[must_use]
    pub fn is_absent(self) -> bool {
        matches!(self, Self::Null | Self::Missing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
            Self::Missing => "undefined",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered set of accepted kinds, rendered as `"a, b, c"` in error messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KindSet(Vec<ValueKind>);

impl KindSet {
    #[must_use]
    pub fn contains(&self, kind: ValueKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = ValueKind> + '_ {
        self.0.iter().copied()
    }
}

impl From<&[ValueKind]> for KindSet {
    fn from(kinds: &[ValueKind]) -> Self {
        Self(kinds.to_vec())
    }
}

impl fmt::Display for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(kind.as_str())?;
        }
        Ok(())
    }
}

pub(crate) const SCALAR: &[ValueKind] = &[ValueKind::String, ValueKind::Number, ValueKind::Boolean];
pub(crate) const CRITERIA: &[ValueKind] = &[ValueKind::Object, ValueKind::Null, ValueKind::Missing];
pub(crate) const FIELD_VALUE: &[ValueKind] = &[
    ValueKind::Number,
    ValueKind::String,
    ValueKind::Boolean,
    ValueKind::Object,
    ValueKind::Array,
];

/// Check `value` against the accepted kinds and return its kind.
///
/// `key` is reported back verbatim in the error so the caller can point at the
/// offending part of the request.
pub fn validate_type(
    value: Option<&Value>,
    key: &str,
    accepted: &[ValueKind],
) -> Result<ValueKind, QueryError> {
    let kind = ValueKind::of(value);
    if accepted.contains(&kind) {
        Ok(kind)
    } else {
        Err(QueryError::InvalidQueryShape {
            key: key.to_string(),
            expected: KindSet::from(accepted),
            found: kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_of() {
        assert_eq!(ValueKind::of(None), ValueKind::Missing);
        assert_eq!(ValueKind::of(Some(&json!(null))), ValueKind::Null);
        assert_eq!(ValueKind::of(Some(&json!(1.5))), ValueKind::Number);
        assert_eq!(ValueKind::of(Some(&json!("a"))), ValueKind::String);
        assert_eq!(ValueKind::of(Some(&json!(false))), ValueKind::Boolean);
        assert_eq!(ValueKind::of(Some(&json!([]))), ValueKind::Array);
        assert_eq!(ValueKind::of(Some(&json!({}))), ValueKind::Object);
    }

    #[test]
    fn test_validate_accepts() {
        let v = json!([1, 2]);
        assert_eq!(validate_type(Some(&v), "$in", &[ValueKind::Array]), Ok(ValueKind::Array));
        assert_eq!(validate_type(None, "query", CRITERIA), Ok(ValueKind::Missing));
    }

    #[test]
    fn test_validate_rejects_with_key_and_set() {
        let v = json!("nope");
        let err = validate_type(Some(&v), "$and", &[ValueKind::Array]).unwrap_err();
        match err {
            QueryError::InvalidQueryShape { key, expected, found } => {
                assert_eq!(key, "$and");
                assert!(expected.contains(ValueKind::Array));
                assert_eq!(found, ValueKind::String);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_null_is_not_a_field_value() {
        let v = json!(null);
        assert!(validate_type(Some(&v), "age", FIELD_VALUE).is_err());
    }

    #[test]
    fn test_scalar_and_absent() {
        assert!(ValueKind::Boolean.is_scalar());
        assert!(!ValueKind::Array.is_scalar());
        assert!(ValueKind::Null.is_absent());
        assert!(ValueKind::Missing.is_absent());
        assert!(!ValueKind::Object.is_absent());
        assert_eq!(KindSet::from(SCALAR).to_string(), "string, number, boolean");
    }
}
