// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Filter operator vocabulary.
//!
//! Two closed sets:
//! - [`Operator`]: keys that appear at criteria level (`$or`, `$child`, ...)
//! - [`Criterion`]: keys that appear under a field (`{age: {$gt: 3}}`)
//!
//! Adding an operator means extending one of these enums; the compiler matches them
//! exhaustively.

use serde_json::{Map, Value};

/// Boolean tree section a clause lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Non-scoring, conjunctive
    Filter,
    /// Scoring, conjunctive
    Must,
    /// Conjunctive negation
    MustNot,
    /// Disjunctive, scoring
    Should,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Must => "must",
            Self::MustNot => "must_not",
            Self::Should => "should",
        }
    }
}

/// Criteria-level operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Or,
    And,
    All,
    Sqs,
    Nested,
    Exists,
    Missing,
    Child,
    Parent,
}

impl Operator {
    pub fn parse(key: &str) -> Option<Self> {
        Some(match key {
            "$or" => Self::Or,
            "$and" => Self::And,
            "$all" => Self::All,
            "$sqs" => Self::Sqs,
            "$nested" => Self::Nested,
            "$exists" => Self::Exists,
            "$missing" => Self::Missing,
            "$child" => Self::Child,
            "$parent" => Self::Parent,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Or => "$or",
            Self::And => "$and",
            Self::All => "$all",
            Self::Sqs => "$sqs",
            Self::Nested => "$nested",
            Self::Exists => "$exists",
            Self::Missing => "$missing",
            Self::Child => "$child",
            Self::Parent => "$parent",
        }
    }
}

/// Field-level operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    In,
    Nin,
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
    Prefix,
    Wildcard,
    Regexp,
    Match,
    Phrase,
    PhrasePrefix,
}

impl Criterion {
    pub fn parse(key: &str) -> Option<Self> {
        Some(match key {
            "$in" => Self::In,
            "$nin" => Self::Nin,
            "$gt" => Self::Gt,
            "$gte" => Self::Gte,
            "$lt" => Self::Lt,
            "$lte" => Self::Lte,
            "$ne" => Self::Ne,
            "$prefix" => Self::Prefix,
            "$wildcard" => Self::Wildcard,
            "$regexp" => Self::Regexp,
            "$match" => Self::Match,
            "$phrase" => Self::Phrase,
            "$phrase_prefix" => Self::PhrasePrefix,
            _ => return None,
        })
    }

    /// Where the generated clause goes.
    pub fn section(self) -> Section {
        match self {
            Self::Nin | Self::Ne => Section::MustNot,
            Self::Match | Self::Phrase | Self::PhrasePrefix => Section::Must,
            Self::In
            | Self::Gt
            | Self::Gte
            | Self::Lt
            | Self::Lte
            | Self::Prefix
            | Self::Wildcard
            | Self::Regexp => Section::Filter,
        }
    }

    /// Native clause name.
    fn clause_name(self) -> &'static str {
        match self {
            Self::In | Self::Nin => "terms",
            Self::Ne => "term",
            Self::Gt | Self::Gte | Self::Lt | Self::Lte => "range",
            Self::Prefix => "prefix",
            Self::Wildcard => "wildcard",
            Self::Regexp => "regexp",
            Self::Match => "match",
            Self::Phrase => "match_phrase",
            Self::PhrasePrefix => "match_phrase_prefix",
        }
    }

    /// Range bound name, for range operators only.
    fn range_bound(self) -> Option<&'static str> {
        match self {
            Self::Gt => Some("gt"),
            Self::Gte => Some("gte"),
            Self::Lt => Some("lt"),
            Self::Lte => Some("lte"),
            _ => None,
        }
    }

    /// Build `{clause: {field: operand}}`, or `{range: {field: {bound: operand}}}`.
    pub fn clause(self, field: &str, operand: &Value) -> Value {
        let inner = match self.range_bound() {
            Some(bound) => {
                let mut range = Map::new();
                range.insert(bound.to_string(), operand.clone());
                Value::Object(range)
            }
            None => operand.clone(),
        };
        let mut body = Map::new();
        body.insert(field.to_string(), inner);
        let mut clause = Map::new();
        clause.insert(self.clause_name().to_string(), Value::Object(body));
        Value::Object(clause)
    }
}

/// `{term: {field: value}}`
pub(crate) fn term(field: &str, value: &Value) -> Value {
    let mut body = Map::new();
    body.insert(field.to_string(), value.clone());
    let mut clause = Map::new();
    clause.insert("term".to_string(), Value::Object(body));
    Value::Object(clause)
}
