// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document shaping on the way in (descriptor) and on the way out (mapper).

mod descriptor;
mod mapper;

pub use descriptor::DocDescriptor;
pub(crate) use descriptor::{is_truthy, stringify};
pub use mapper::{map_bulk, map_find, map_item, map_patch, FindResult};
