// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Boolean query evaluation against a single stored document.
//!
//! Supported clauses: `bool`, `match_all`, `term`, `terms`, `range`, `prefix`,
//! `wildcard`, `exists`, `match`, `match_phrase`, `match_phrase_prefix`, `nested`.
//! Anything else is a backend error, never a silent non-match.
//!
//! Field names are dot-paths into the source; arrays along the path fan out, so a
//! field matches when any of its values does. `_id` resolves to the document id.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::traits::StorageError;
use crate::query::{BoolQuery, STORE_ID_FIELD};

/// A stored document as seen by the matcher.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DocView<'a> {
    pub id: &'a str,
    pub source: &'a Map<String, Value>,
}

/// Evaluate a compiled tree.
pub(crate) fn matches_query(query: &BoolQuery, doc: DocView<'_>) -> Result<bool, StorageError> {
    matches_sections(
        &query.filter,
        &query.must,
        &query.must_not,
        &query.should,
        query.minimum_should_match,
        doc,
    )
}

fn matches_sections(
    filter: &[Value],
    must: &[Value],
    must_not: &[Value],
    should: &[Value],
    minimum_should_match: Option<u32>,
    doc: DocView<'_>,
) -> Result<bool, StorageError> {
    for clause in filter.iter().chain(must) {
        if !matches_clause(clause, doc)? {
            return Ok(false);
        }
    }
    for clause in must_not {
        if matches_clause(clause, doc)? {
            return Ok(false);
        }
    }
    if should.is_empty() {
        return Ok(true);
    }

    // Without filter/must clauses, at least one should clause has to match.
    let required = match minimum_should_match {
        Some(n) => n as usize,
        None if filter.is_empty() && must.is_empty() => 1,
        None => 0,
    };
    let mut matched = 0;
    for clause in should {
        if matched >= required {
            break;
        }
        if matches_clause(clause, doc)? {
            matched += 1;
        }
    }
    Ok(matched >= required)
}

fn matches_bool_body(body: &Value, doc: DocView<'_>) -> Result<bool, StorageError> {
    let minimum_should_match = body
        .get("minimum_should_match")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());
    matches_sections(
        section(body, "filter"),
        section(body, "must"),
        section(body, "must_not"),
        section(body, "should"),
        minimum_should_match,
        doc,
    )
}

fn section<'a>(body: &'a Value, name: &str) -> &'a [Value] {
    body.get(name).and_then(Value::as_array).map_or(&[][..], Vec::as_slice)
}

pub(crate) fn matches_clause(clause: &Value, doc: DocView<'_>) -> Result<bool, StorageError> {
    let (name, body) = clause
        .as_object()
        .filter(|c| c.len() == 1)
        .and_then(|c| c.iter().next())
        .ok_or_else(|| StorageError::Backend(format!("malformed query clause {clause}")))?;

    match name.as_str() {
        "bool" => matches_bool_body(body, doc),
        "match_all" => Ok(true),
        "nested" => matches_nested(body, doc),
        "exists" => {
            let field = body
                .get("field")
                .and_then(Value::as_str)
                .ok_or_else(|| StorageError::Backend("exists clause without field".into()))?;
            Ok(field_values(doc, field).iter().any(|v| !v.is_null()))
        }
        "term" => field_test(body, doc, |value, operand| scalar_eq(value, unwrap_value(operand))),
        "terms" => field_test(body, doc, |value, operand| {
            operand
                .as_array()
                .is_some_and(|candidates| candidates.iter().any(|c| scalar_eq(value, c)))
        }),
        "range" => field_test(body, doc, in_range),
        "prefix" => field_test(body, doc, |value, operand| {
            match (value.as_str(), unwrap_value(operand).as_str()) {
                (Some(text), Some(prefix)) => text.starts_with(prefix),
                _ => false,
            }
        }),
        "wildcard" => field_test(body, doc, |value, operand| {
            match (value.as_str(), unwrap_value(operand).as_str()) {
                (Some(text), Some(pattern)) => wildcard_match(pattern.as_bytes(), text.as_bytes()),
                _ => false,
            }
        }),
        "match" => text_test(body, doc, |field, query| {
            query.iter().any(|token| field.contains(token))
        }),
        "match_phrase" => text_test(body, doc, |field, query| contains_phrase(field, query, false)),
        "match_phrase_prefix" => {
            text_test(body, doc, |field, query| contains_phrase(field, query, true))
        }
        other => Err(StorageError::Backend(format!("unsupported query clause '{other}'"))),
    }
}

/// `{field: operand}`: true when any value of `field` passes `test`.
fn field_test<F>(body: &Value, doc: DocView<'_>, test: F) -> Result<bool, StorageError>
where
    F: Fn(&Value, &Value) -> bool,
{
    let (field, operand) = single_field(body)?;
    Ok(field_values(doc, field).iter().any(|value| test(value.as_ref(), operand)))
}

fn text_test<F>(body: &Value, doc: DocView<'_>, test: F) -> Result<bool, StorageError>
where
    F: Fn(&[String], &[String]) -> bool,
{
    let (field, operand) = single_field(body)?;
    let query = match unwrap_query(operand) {
        Value::String(s) => tokenize(s),
        other => vec![other.to_string().to_lowercase()],
    };
    if query.is_empty() {
        return Ok(false);
    }
    Ok(field_values(doc, field).iter().any(|value| {
        let tokens = match value.as_ref() {
            Value::String(s) => tokenize(s),
            Value::Null => Vec::new(),
            other => vec![other.to_string().to_lowercase()],
        };
        test(&tokens, &query)
    }))
}

fn single_field(body: &Value) -> Result<(&str, &Value), StorageError> {
    body.as_object()
        .filter(|b| b.len() == 1)
        .and_then(|b| b.iter().next())
        .map(|(field, operand)| (field.as_str(), operand))
        .ok_or_else(|| StorageError::Backend(format!("expected a single-field clause, got {body}")))
}

/// `{value: x}` long form of term/prefix/wildcard operands.
fn unwrap_value(operand: &Value) -> &Value {
    operand.get("value").unwrap_or(operand)
}

/// `{query: x}` long form of match operands.
fn unwrap_query(operand: &Value) -> &Value {
    operand.get("query").unwrap_or(operand)
}

fn matches_nested(body: &Value, doc: DocView<'_>) -> Result<bool, StorageError> {
    let path = body
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| StorageError::Backend("nested clause without path".into()))?;
    let query = body
        .get("query")
        .ok_or_else(|| StorageError::Backend("nested clause without query".into()))?;

    // Each nested object is matched on its own, so sibling fields cannot cross-match.
    for value in field_values(doc, path) {
        if !value.is_object() {
            continue;
        }
        let mut scoped = doc.source.clone();
        set_path(&mut scoped, path, value.into_owned());
        let view = DocView { id: doc.id, source: &scoped };
        if matches_clause(query, view)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn set_path(source: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            source.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = source
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_path(child, rest, value);
            }
        }
    }
}

/// All leaf values of a dot-path, with arrays flattened.
pub(crate) fn field_values<'a>(doc: DocView<'a>, path: &str) -> Vec<Cow<'a, Value>> {
    if path == STORE_ID_FIELD {
        return vec![Cow::Owned(Value::String(doc.id.to_string()))];
    }

    let mut segments = path.split('.');
    let mut current: Vec<&'a Value> = Vec::new();
    if let Some(value) = segments.next().and_then(|first| doc.source.get(first)) {
        push_flattened(&mut current, value);
    }
    for segment in segments {
        let mut next = Vec::new();
        for value in current {
            if let Some(child) = value.get(segment) {
                push_flattened(&mut next, child);
            }
        }
        current = next;
    }
    current.into_iter().map(Cow::Borrowed).collect()
}

fn push_flattened<'a>(out: &mut Vec<&'a Value>, value: &'a Value) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| push_flattened(out, item)),
        other => out.push(other),
    }
}

/// Loose scalar equality: numbers by value, and a string equals a number or boolean
/// with the same text (ids are strings, criteria often are not).
pub(crate) fn scalar_eq(value: &Value, operand: &Value) -> bool {
    match (value, operand) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        (Value::String(a), Value::Number(_) | Value::Bool(_)) => *a == operand.to_string(),
        (Value::Number(_) | Value::Bool(_), Value::String(b)) => value.to_string() == *b,
        (a, b) => a == b,
    }
}

/// Ordering for range bounds and sorting: numbers numerically, strings lexically.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn in_range(value: &Value, bounds: &Value) -> bool {
    let Some(bounds) = bounds.as_object() else {
        return false;
    };
    bounds.iter().all(|(bound, limit)| {
        let Some(ordering) = compare(value, limit) else {
            return false;
        };
        match bound.as_str() {
            "gt" => ordering == Ordering::Greater,
            "gte" => ordering != Ordering::Less,
            "lt" => ordering == Ordering::Less,
            "lte" => ordering != Ordering::Greater,
            _ => true,
        }
    })
}

/// Glob match with `*` (any run) and `?` (any single byte).
fn wildcard_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == b'*')
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(field: &[String], query: &[String], prefix_last: bool) -> bool {
    if query.len() > field.len() {
        return false;
    }
    field.windows(query.len()).any(|window| {
        window.iter().zip(query).enumerate().all(|(i, (have, want))| {
            if prefix_last && i == query.len() - 1 {
                have.starts_with(want.as_str())
            } else {
                have == want
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> Map<String, Value> {
        json!({
            "name": "Douglas Adams",
            "age": 42,
            "tags": ["scifi", "humor"],
            "bio": "The quick brown fox jumps",
            "address": {"city": "Cambridge"},
            "books": [
                {"title": "Hitchhiker", "year": 1979},
                {"title": "Restaurant", "year": 1980}
            ]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn check(clause: Value) -> bool {
        let source = source();
        matches_clause(&clause, DocView { id: "7", source: &source }).unwrap()
    }

    #[test]
    fn test_term_and_terms() {
        assert!(check(json!({"term": {"age": 42}})));
        assert!(check(json!({"term": {"tags": "humor"}})));
        assert!(!check(json!({"term": {"age": 41}})));
        assert!(check(json!({"terms": {"tags": ["x", "scifi"]}})));
        assert!(check(json!({"term": {"address.city": "Cambridge"}})));
    }

    #[test]
    fn test_id_term_matches_numeric_operand() {
        assert!(check(json!({"term": {"_id": 7}})));
        assert!(check(json!({"terms": {"_id": ["1", "7"]}})));
        assert!(!check(json!({"term": {"_id": "8"}})));
    }

    #[test]
    fn test_range() {
        assert!(check(json!({"range": {"age": {"gt": 30}}})));
        assert!(!check(json!({"range": {"age": {"lt": 40}}})));
        assert!(check(json!({"range": {"age": {"gte": 42, "lte": 42}}})));
    }

    #[test]
    fn test_prefix_wildcard_exists() {
        assert!(check(json!({"prefix": {"name": "Doug"}})));
        assert!(check(json!({"wildcard": {"name": "D*s A?ams"}})));
        assert!(!check(json!({"wildcard": {"name": "X*"}})));
        assert!(check(json!({"exists": {"field": "address.city"}})));
        assert!(!check(json!({"exists": {"field": "missing"}})));
    }

    #[test]
    fn test_text_clauses() {
        assert!(check(json!({"match": {"bio": "slow fox"}})));
        assert!(check(json!({"match_phrase": {"bio": "brown fox"}})));
        assert!(!check(json!({"match_phrase": {"bio": "fox brown"}})));
        assert!(check(json!({"match_phrase_prefix": {"bio": "quick bro"}})));
    }

    #[test]
    fn test_bool_sections() {
        assert!(check(json!({"bool": {
            "filter": [{"term": {"age": 42}}],
            "must_not": [{"term": {"tags": "horror"}}]
        }})));
        assert!(!check(json!({"bool": {
            "should": [{"term": {"age": 1}}, {"term": {"age": 2}}],
            "minimum_should_match": 1
        }})));
        assert!(check(json!({"bool": {"should": [{"term": {"age": 1}}, {"term": {"age": 42}}]}})));
    }

    #[test]
    fn test_nested_scopes_each_object() {
        assert!(check(json!({"nested": {"path": "books", "query": {"bool": {"filter": [
            {"term": {"books.title": "Hitchhiker"}},
            {"term": {"books.year": 1979}}
        ]}}}})));
        assert!(!check(json!({"nested": {"path": "books", "query": {"bool": {"filter": [
            {"term": {"books.title": "Hitchhiker"}},
            {"term": {"books.year": 1980}}
        ]}}}})));
    }

    #[test]
    fn test_unsupported_clause_is_an_error() {
        let source = source();
        let err = matches_clause(
            &json!({"has_child": {"type": "x", "query": {"match_all": {}}}}),
            DocView { id: "1", source: &source },
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::Backend(msg) if msg.contains("has_child")));
    }
}
