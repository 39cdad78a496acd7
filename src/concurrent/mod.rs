// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Process-level write coordination: an advisory exclusive lock on a single
//! `catalog.lock` file per base directory (§10.7). A safety rail against two
//! CLI invocations mutating the same directory concurrently, not a
//! substitute for the single-writer scheduling model of §5.

pub mod lock;

pub use lock::{acquire_lock, is_locked, CatalogLock};
