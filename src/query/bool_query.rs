// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Boolean query tree.
//!
//! The compiler's output and the store's native query shape:
//!
//! ```json
//! {
//!   "filter":   [ ...non-scoring, all must hold... ],
//!   "must":     [ ...scoring, all must hold... ],
//!   "must_not": [ ...none may hold... ],
//!   "should":   [ ...disjunction... ],
//!   "minimum_should_match": 1
//! }
//! ```
//!
//! Empty sections are omitted on serialization. A tree with nothing in it is never
//! handed out by the compiler; it returns `None` instead.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::operator::Section;

/// Accumulator for the four clause sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<u32>,
}

impl BoolQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// No clause in any section.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filter.is_empty()
            && self.must.is_empty()
            && self.must_not.is_empty()
            && self.should.is_empty()
    }

    /// Total number of clauses across sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filter.len() + self.must.len() + self.must_not.len() + self.should.len()
    }

    pub fn section(&self, section: Section) -> &[Value] {
        match section {
            Section::Filter => &self.filter,
            Section::Must => &self.must,
            Section::MustNot => &self.must_not,
            Section::Should => &self.should,
        }
    }

    fn section_mut(&mut self, section: Section) -> &mut Vec<Value> {
        match section {
            Section::Filter => &mut self.filter,
            Section::Must => &mut self.must,
            Section::MustNot => &mut self.must_not,
            Section::Should => &mut self.should,
        }
    }

    pub fn push(&mut self, section: Section, clause: Value) {
        self.section_mut(section).push(clause);
    }

    /// Conjunctive merge used by `$and`: `filter`, `must` and `must_not` are appended
    /// to the same-named sections of `self`. A populated `should` stays a disjunction
    /// of its own, pushed into `must` as `{bool: {should, minimum_should_match}}`, so
    /// `(A|B) & (C|D)` never widens to `A|B|C|D`.
    pub fn merge(&mut self, other: BoolQuery) {
        self.filter.extend(other.filter);
        self.must.extend(other.must);
        self.must_not.extend(other.must_not);
        if !other.should.is_empty() {
            let disjunction = BoolQuery {
                should: other.should,
                minimum_should_match: other.minimum_should_match,
                ..BoolQuery::default()
            };
            self.must.push(disjunction.to_clause());
        }
    }

    /// `None` when empty, so callers can drop the query clause entirely.
    #[must_use]
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// The tree as a JSON object (sections only).
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Wrapped as a compound clause: `{bool: {...}}`.
    pub fn to_clause(&self) -> Value {
        json!({ "bool": self.to_value() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree() {
        let q = BoolQuery::new();
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
        assert_eq!(q.to_value(), json!({}));
        assert!(q.non_empty().is_none());
    }

    #[test]
    fn test_push_and_serialize_skips_empty_sections() {
        let mut q = BoolQuery::new();
        q.push(Section::Filter, json!({"term": {"a": 1}}));
        q.push(Section::MustNot, json!({"term": {"b": 2}}));
        assert_eq!(
            q.to_value(),
            json!({"filter": [{"term": {"a": 1}}], "must_not": [{"term": {"b": 2}}]})
        );
        assert_eq!(q.section(Section::Filter).len(), 1);
        assert!(q.section(Section::Should).is_empty());
    }

    #[test]
    fn test_merge_concatenates_sections() {
        let mut a = BoolQuery::new();
        a.push(Section::Filter, json!(1));
        let mut b = BoolQuery::new();
        b.push(Section::Filter, json!(2));
        b.push(Section::Must, json!(3));
        a.merge(b);
        assert_eq!(a.filter, vec![json!(1), json!(2)]);
        assert_eq!(a.must, vec![json!(3)]);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_merge_keeps_disjunctions_apart() {
        let mut a = BoolQuery::new();
        a.push(Section::Should, json!("a"));
        a.minimum_should_match = Some(1);
        let mut b = BoolQuery::new();
        b.push(Section::Filter, json!("f"));
        b.push(Section::Should, json!("c"));
        b.push(Section::Should, json!("d"));
        b.minimum_should_match = Some(1);
        a.merge(b);
        assert_eq!(a.should, vec![json!("a")]);
        assert_eq!(a.filter, vec![json!("f")]);
        assert_eq!(
            a.must,
            vec![json!({"bool": {"should": ["c", "d"], "minimum_should_match": 1}})]
        );
        assert_eq!(a.minimum_should_match, Some(1));
    }

    #[test]
    fn test_clause_wrapper() {
        let mut q = BoolQuery::new();
        q.push(Section::Must, json!({"match_all": {}}));
        assert_eq!(q.to_clause(), json!({"bool": {"must": [{"match_all": {}}]}}));
    }

    #[test]
    fn test_deserialize_partial_tree() {
        let q: BoolQuery = serde_json::from_value(json!({
            "should": [{"term": {"x": 1}}],
            "minimum_should_match": 1
        }))
        .unwrap();
        assert_eq!(q.should.len(), 1);
        assert_eq!(q.minimum_should_match, Some(1));
    }
}
