// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Search Adapter
//!
//! A MongoDB-style filter language and CRUD surface over a search store's boolean
//! query and bulk APIs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      DocumentService                        │
//! │  • find / get / create / update / patch / remove            │
//! │  • create_many / patch_many / remove_many                   │
//! └─────────────────────────────────────────────────────────────┘
//!            │                                   │
//!            ▼                                   ▼
//! ┌─────────────────────────────┐  ┌─────────────────────────────┐
//! │  Query                      │  │  Bulk                       │
//! │  • FilterQuery (control     │  │  • DocDescriptor → actions  │
//! │    keys vs. criteria)       │  │  • per-item outcomes        │
//! │  • QueryCompiler → BoolQuery│  │  • re-read + ordered merge  │
//! └─────────────────────────────┘  └─────────────────────────────┘
//!            │                                   │
//!            └─────────────────┬─────────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                DocumentStore (search / bulk / mget)         │
//! │  • InMemoryStore reference implementation                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use search_adapter::{AdapterConfig, DocumentService, InMemoryStore, Params};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let service = DocumentService::new(InMemoryStore::new(), AdapterConfig::default());
//!
//! service.create(&json!({"_id": "1", "name": "Ada", "age": 36}), &Params::new()).await.unwrap();
//! service.create(&json!({"_id": "2", "name": "Alan", "age": 41}), &Params::new()).await.unwrap();
//!
//! let found = service
//!     .find(&Params::with_query(json!({"age": {"$gt": 40}})))
//!     .await
//!     .unwrap();
//! assert_eq!(found.data().len(), 1);
//! assert_eq!(found.data()[0]["name"], "Alan");
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`query`]: filter normalizer, type validator and query compiler
//! - [`document`]: document descriptors and result mapping
//! - [`bulk`]: bulk actions, outcome decoding and reconciliation
//! - [`storage`]: the [`DocumentStore`] boundary and [`InMemoryStore`]
//! - [`service`]: [`DocumentService`]

pub mod bulk;
pub mod config;
pub mod document;
pub mod error;
pub mod metrics;
pub mod query;
pub mod service;
pub mod storage;

// Note: We don't expose a `tracing` module to avoid conflict with the tracing crate

pub use bulk::{BulkAction, BulkFailure, BulkItem, BulkOperation, BulkRequest, ItemOutcome, OutcomeKind};
pub use config::{AdapterConfig, FieldNames, Paginate, RefreshPolicy};
pub use document::{DocDescriptor, FindResult};
pub use error::{AdapterError, QueryError};
pub use query::{compile, BoolQuery, FilterQuery, QueryCompiler, SourceFilter};
pub use service::{DocumentService, Params};
pub use storage::memory::InMemoryStore;
pub use storage::traits::{DocKey, DocumentStore, SearchRequest, SearchResponse, StorageError};
