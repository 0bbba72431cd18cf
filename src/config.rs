// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the search adapter.
//!
//! # Example
//!
//! ```
//! use search_adapter::AdapterConfig;
//!
//! // Minimal config (uses defaults)
//! let config = AdapterConfig::default();
//! assert_eq!(config.fields.id, "_id");
//! assert_eq!(config.max_query_depth, 32);
//!
//! // Application-facing aliases
//! let config: AdapterConfig = serde_json::from_value(serde_json::json!({
//!     "index": "people",
//!     "fields": { "id": "id", "join": "relation" },
//!     "paginate": { "default": 10, "max": 50 }
//! })).unwrap();
//! assert_eq!(config.fields.id, "id");
//! assert_eq!(config.fields.parent, "_parent");
//! assert_eq!(config.paginate.default, Some(10));
//! ```

use serde::Deserialize;

use crate::query::DEFAULT_MAX_DEPTH;

/// Configuration for [`crate::DocumentService`].
///
/// All fields have defaults matching the store's own reserved field names.
#[derive(Debug, Clone, Deserialize)]
pub struct AdapterConfig {
    /// Default index name passed to the store (overridable per request with `$index`)
    #[serde(default)]
    pub index: Option<String>,

    /// Reserved document-descriptor field aliases
    #[serde(default)]
    pub fields: FieldNames,

    /// Pagination defaults applied to `find`
    #[serde(default)]
    pub paginate: Paginate,

    /// Maximum nesting of `$and/$or/$nested/$child/$parent`
    #[serde(default = "default_max_query_depth")]
    pub max_query_depth: usize,

    /// Visibility requested from bulk writes. Use `WaitFor` when the re-read after a
    /// bulk write must observe the write.
    #[serde(default)]
    pub refresh: RefreshPolicy,
}

fn default_max_query_depth() -> usize { DEFAULT_MAX_DEPTH }

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            index: None,
            fields: FieldNames::default(),
            paginate: Paginate::default(),
            max_query_depth: default_max_query_depth(),
            refresh: RefreshPolicy::default(),
        }
    }
}

/// Caller-facing names of the reserved descriptor fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldNames {
    #[serde(default = "default_id")]
    pub id: String,
    #[serde(default = "default_parent")]
    pub parent: String,
    #[serde(default = "default_routing")]
    pub routing: String,
    #[serde(default = "default_meta")]
    pub meta: String,
    /// Join (relation-name) field; parent/child relations are off when unset
    #[serde(default)]
    pub join: Option<String>,
}

fn default_id() -> String { "_id".into() }
fn default_parent() -> String { "_parent".into() }
fn default_routing() -> String { "_routing".into() }
fn default_meta() -> String { "_meta".into() }

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            id: default_id(),
            parent: default_parent(),
            routing: default_routing(),
            meta: default_meta(),
            join: None,
        }
    }
}

/// Pagination settings. With no `default`, `find` returns a plain list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct Paginate {
    #[serde(default)]
    pub default: Option<usize>,
    #[serde(default)]
    pub max: Option<usize>,
}

impl Paginate {
    /// Pagination switched off.
    pub const DISABLED: Paginate = Paginate { default: None, max: None };

    /// Whether results come back as a page (`total/skip/limit/data`).
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.default.is_some()
    }

    /// Requested limit, falling back to `default` and capped at `max`.
    #[must_use]
    pub fn resolve_limit(&self, requested: Option<usize>) -> Option<usize> {
        let limit = requested.or(self.default);
        match (limit, self.max) {
            (Some(limit), Some(max)) => Some(limit.min(max)),
            (None, Some(max)) if self.default.is_some() => Some(max),
            (limit, _) => limit,
        }
    }
}

/// Write visibility passed through to the store's bulk call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Return immediately; a following read may not see the write
    #[default]
    False,
    /// Force a refresh after the write
    True,
    /// Block until the write is visible
    WaitFor,
}

impl RefreshPolicy {
    /// Wire value of the `refresh` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::False => "false",
            Self::True => "true",
            Self::WaitFor => "wait_for",
        }
    }
}
