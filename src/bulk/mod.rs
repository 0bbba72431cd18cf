// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Batched writes and partial-failure reconciliation.
//!
//! - [`action`]: request side (`create/index/update/delete` operations)
//! - [`outcome`]: response side, one classified outcome per operation
//! - [`reconcile`]: write, re-read the successes, merge back in request order

pub mod action;
pub mod outcome;
pub mod reconcile;

pub use action::{BulkAction, BulkOperation, BulkRequest};
pub use outcome::{BulkFailure, BulkItem, ItemOutcome, OutcomeKind};
pub use reconcile::{compaction_keys, merge_refreshed, reconcile, remove_found, retain_successful};
