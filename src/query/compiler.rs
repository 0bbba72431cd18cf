// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Compiler
//!
//! Translates MongoDB-style criteria into a [`BoolQuery`].
//!
//! # Translation table
//!
//! ```text
//! {f: v}                          filter   += term(f, v)
//! {f: [v1, v2]}                   filter   += term(f, v1), term(f, v2)
//! {f: {$in: [..]}}                filter   += terms(f, [..])
//! {f: {$nin: [..]}}               must_not += terms(f, [..])
//! {f: {$ne: v}}                   must_not += term(f, v)
//! {f: {$gt: a, $lt: b}}           filter   += range(f, gt a), range(f, lt b)
//! {f: {$prefix|$wildcard|$regexp}} filter  += prefix|wildcard|regexp
//! {f: {$match|$phrase|$phrase_prefix}} must += match|match_phrase|match_phrase_prefix
//! {$all: true}                    must     += match_all
//! {$sqs: {$fields, $query, $operator?}}  must += simple_query_string
//! {$and: [A, B]}                  sections of A and B concatenated into ours;
//!                                 a sub-$or stays whole: must += bool(should..)
//! {$or: [A, B]}                   should   += bool(A), bool(B); minimum_should_match = 1
//! {$child|$parent: {$type, ..}}   must     += has_child|has_parent(bool(..))
//! {$nested: {$path, ..}}          must     += nested(bool(..))
//! {$exists: [f..]}                must     += exists(f)..
//! {$missing: [f..]}               must_not += exists(f)..
//! ```
//!
//! The compiler is a pure function of its input and holds no state, so one instance
//! can be shared freely across threads.

use serde_json::{json, Map, Value};

use super::bool_query::BoolQuery;
use super::kind::{validate_type, ValueKind, CRITERIA, FIELD_VALUE, SCALAR};
use super::operator::{term, Criterion, Operator, Section};
use crate::document::is_truthy;
use crate::error::QueryError;

/// Reserved identity field of the store.
pub const STORE_ID_FIELD: &str = "_id";

/// Default recursion bound for nested operators.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Compile `criteria` with the default depth limit.
///
/// Shorthand for `QueryCompiler::new(id_alias).compile(criteria)`.
pub fn compile(criteria: Option<&Value>, id_alias: &str) -> Result<Option<BoolQuery>, QueryError> {
    QueryCompiler::new(id_alias).compile(criteria)
}

/// Criteria → boolean tree translator.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    id_alias: String,
    max_depth: usize,
}

impl QueryCompiler {
    /// `id_alias` is the caller-facing name of the identity field; keys equal to it
    /// are rewritten to `_id`.
    pub fn new(id_alias: impl Into<String>) -> Self {
        Self {
            id_alias: id_alias.into(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Compile criteria into a boolean tree.
    ///
    /// Returns `Ok(None)` when there is nothing to constrain: `criteria` is null or
    /// absent, or every key turned out to be inert.
    pub fn compile(&self, criteria: Option<&Value>) -> Result<Option<BoolQuery>, QueryError> {
        self.compile_at(criteria, "query", 0)
    }

    fn compile_at(
        &self,
        criteria: Option<&Value>,
        key: &str,
        depth: usize,
    ) -> Result<Option<BoolQuery>, QueryError> {
        if depth > self.max_depth {
            return Err(QueryError::NestingTooDeep { max: self.max_depth });
        }

        validate_type(criteria, key, CRITERIA)?;
        let Some(Value::Object(map)) = criteria else {
            return Ok(None);
        };

        let mut bool_query = BoolQuery::new();
        for (raw_key, value) in map {
            let field = if *raw_key == self.id_alias {
                STORE_ID_FIELD
            } else {
                raw_key.as_str()
            };

            match Operator::parse(field) {
                Some(op) => self.apply_operator(op, value, &mut bool_query, depth)?,
                None => Self::apply_field(field, value, &mut bool_query)?,
            }
        }

        Ok(bool_query.non_empty())
    }

    fn apply_operator(
        &self,
        op: Operator,
        value: &Value,
        out: &mut BoolQuery,
        depth: usize,
    ) -> Result<(), QueryError> {
        match op {
            Operator::Or => self.apply_or(value, out, depth),
            Operator::And => self.apply_and(value, out, depth),
            Operator::All => Self::apply_all(value, out),
            Operator::Sqs => Self::apply_sqs(value, out),
            Operator::Nested => self.apply_scoped(op, "$path", value, out, depth),
            Operator::Child | Operator::Parent => self.apply_scoped(op, "$type", value, out, depth),
            Operator::Exists => Self::apply_exists(op, Section::Must, value, out),
            Operator::Missing => Self::apply_exists(op, Section::MustNot, value, out),
        }
    }

    /// Plain field: scalar, bare array, or an object of field-level criteria.
    fn apply_field(field: &str, value: &Value, out: &mut BoolQuery) -> Result<(), QueryError> {
        validate_type(Some(value), field, FIELD_VALUE)?;

        match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    validate_type(Some(item), &format!("{field}[{i}]"), SCALAR)?;
                    out.push(Section::Filter, term(field, item));
                }
            }
            Value::Object(criteria) => {
                // Unknown sub-keys are ignored.
                for (name, operand) in criteria {
                    if let Some(criterion) = Criterion::parse(name) {
                        out.push(criterion.section(), criterion.clause(field, operand));
                    }
                }
            }
            scalar => out.push(Section::Filter, term(field, scalar)),
        }
        Ok(())
    }

    fn apply_or(&self, value: &Value, out: &mut BoolQuery, depth: usize) -> Result<(), QueryError> {
        validate_type(Some(value), Operator::Or.as_str(), &[ValueKind::Array])?;
        let Value::Array(branches) = value else {
            return Ok(());
        };

        let mut added = false;
        for branch in branches {
            if let Some(sub) = self.compile_at(Some(branch), Operator::Or.as_str(), depth + 1)? {
                out.push(Section::Should, sub.to_clause());
                added = true;
            }
        }
        if added {
            out.minimum_should_match = Some(1);
        }
        Ok(())
    }

    fn apply_and(&self, value: &Value, out: &mut BoolQuery, depth: usize) -> Result<(), QueryError> {
        validate_type(Some(value), Operator::And.as_str(), &[ValueKind::Array])?;
        let Value::Array(parts) = value else {
            return Ok(());
        };

        for part in parts {
            if let Some(sub) = self.compile_at(Some(part), Operator::And.as_str(), depth + 1)? {
                out.merge(sub);
            }
        }
        Ok(())
    }

    /// Any truthy value (`true`, non-zero number, non-empty string, array, object)
    /// adds `match_all`; falsy values contribute nothing. Never a shape error.
    fn apply_all(value: &Value, out: &mut BoolQuery) -> Result<(), QueryError> {
        if is_truthy(value) {
            out.push(Section::Must, json!({ "match_all": {} }));
        }
        Ok(())
    }

    fn apply_sqs(value: &Value, out: &mut BoolQuery) -> Result<(), QueryError> {
        if validate_type(Some(value), "$sqs", &[ValueKind::Object, ValueKind::Null])?.is_absent() {
            return Ok(());
        }

        let fields = value.get("$fields");
        let query = value.get("$query");
        let operator = value.get("$operator");
        validate_type(fields, "$sqs.$fields", &[ValueKind::Array])?;
        validate_type(query, "$sqs.$query", &[ValueKind::String])?;
        let operator_kind = validate_type(
            operator,
            "$sqs.$operator",
            &[ValueKind::String, ValueKind::Null, ValueKind::Missing],
        )?;

        let default_operator = match (operator_kind, operator) {
            (ValueKind::String, Some(Value::String(op))) if !op.is_empty() => op.as_str(),
            _ => "or",
        };

        out.push(
            Section::Must,
            json!({
                "simple_query_string": {
                    "fields": fields,
                    "query": query,
                    "default_operator": default_operator,
                }
            }),
        );
        Ok(())
    }

    /// `$child`, `$parent` and `$nested`: a scope key plus sub-criteria compiled into
    /// a wrapped `bool`. Contributes nothing when the sub-criteria are empty.
    fn apply_scoped(
        &self,
        op: Operator,
        scope_key: &str,
        value: &Value,
        out: &mut BoolQuery,
        depth: usize,
    ) -> Result<(), QueryError> {
        let name = op.as_str();
        if validate_type(Some(value), name, &[ValueKind::Object, ValueKind::Null])?.is_absent() {
            return Ok(());
        }

        let scope = value.get(scope_key);
        validate_type(scope, &format!("{name}.{scope_key}"), &[ValueKind::String])?;
        let scope = scope.cloned().unwrap_or(Value::Null);

        let mut rest: Map<String, Value> = value.as_object().cloned().unwrap_or_default();
        rest.remove(scope_key);
        let rest = Value::Object(rest);

        let Some(sub) = self.compile_at(Some(&rest), name, depth + 1)? else {
            return Ok(());
        };

        let clause = match op {
            Operator::Child => json!({
                "has_child": { "type": scope, "query": sub.to_clause() }
            }),
            Operator::Parent => json!({
                "has_parent": { "parent_type": scope, "query": sub.to_clause() }
            }),
            _ => json!({
                "nested": { "path": scope, "query": sub.to_clause() }
            }),
        };
        out.push(Section::Must, clause);
        Ok(())
    }

    fn apply_exists(
        op: Operator,
        section: Section,
        value: &Value,
        out: &mut BoolQuery,
    ) -> Result<(), QueryError> {
        let name = op.as_str();
        if validate_type(Some(value), name, &[ValueKind::Array, ValueKind::Null])?.is_absent() {
            return Ok(());
        }
        let Value::Array(fields) = value else {
            return Ok(());
        };

        // Validate the whole list before touching the output.
        for (i, field) in fields.iter().enumerate() {
            validate_type(Some(field), &format!("{name}[{i}]"), &[ValueKind::String])?;
        }
        for field in fields {
            out.push(section, json!({ "exists": { "field": field } }));
        }
        Ok(())
    }
}
