// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Store boundary.
//!
//! - [`traits`]: the [`DocumentStore`](traits::DocumentStore) trait the adapter drives
//! - [`memory`]: a `DashMap`-backed reference store for tests and embedding
//! - `matcher`: boolean-tree evaluation used by the in-memory store

pub mod memory;
pub mod traits;

mod matcher;
