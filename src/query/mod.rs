// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Filter language and boolean query compilation.
//!
//! # Pipeline
//!
//! ```text
//! request query ──→ FilterQuery::parse ──→ Filters   (limit, skip, sort, select, routing, index)
//!                                     └──→ criteria ──→ QueryCompiler ──→ Option<BoolQuery>
//! ```
//!
//! Every operator value is shape-checked by [`validate_type`] before it is used, and a
//! mismatch aborts compilation with [`QueryError::InvalidQueryShape`](crate::QueryError)
//! before any store call is made.
//!
//! # Example
//!
//! ```
//! use search_adapter::query::compile;
//! use serde_json::json;
//!
//! let criteria = json!({"age": {"$gt": 30, "$lt": 40}, "tags": {"$nin": ["x"]}});
//! let tree = compile(Some(&criteria), "_id").unwrap().unwrap();
//! assert_eq!(tree.to_value(), json!({
//!     "filter": [{"range": {"age": {"gt": 30}}}, {"range": {"age": {"lt": 40}}}],
//!     "must_not": [{"terms": {"tags": ["x"]}}]
//! }));
//! ```

mod bool_query;
mod compiler;
mod filter;
mod kind;
mod operator;

pub use bool_query::BoolQuery;
pub use compiler::{compile, QueryCompiler, DEFAULT_MAX_DEPTH, STORE_ID_FIELD};
pub use filter::{FilterQuery, Filters, SortField, SortOrder, SourceFilter, CONTROL_KEYS};
pub use kind::{validate_type, KindSet, ValueKind};
pub use operator::{Criterion, Operator, Section};
