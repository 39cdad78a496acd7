// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Error types for catalog operations.
//!
//! Provides structured error handling with detailed context for debugging.

use std::fmt;

/// Standard Result type for all catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Error taxonomy for the catalog engine.
///
/// Variants map directly onto the kinds distinguished by the five index
/// engines, the `IndexManager` fan-out, and the query planner. None of these
/// are meant to be exhaustive matches by callers outside this crate; new
/// context fields may be added to an existing variant without that being a
/// breaking change in spirit (it is one in the type system, accepted here).
#[derive(Debug, Clone)]
pub enum CatalogError {
    /// Underlying file read/write/seek failure.
    IoError { operation: String, reason: String },

    /// Malformed CSV row, unknown predicate column, or type mismatch on insert.
    SchemaError { reason: String },

    /// `insert_full` rejected because the `restaurant_id` already exists.
    DuplicateId { restaurant_id: u32 },

    /// A lookup found nothing. Most search paths prefer an empty result set
    /// over this variant; it surfaces where absence is itself exceptional
    /// (e.g. deleting an id that was never present).
    NotFound { what: String },

    /// A forced index is incompatible with the predicate's attribute, or the
    /// predicate shape is not supported on the chosen path.
    PlanError { reason: String },

    /// The query text or AST received is structurally malformed.
    ParseError { reason: String, position: usize },

    /// Could not acquire the base-directory write lock within the timeout.
    LockTimeout { path: String, timeout_secs: u64 },

    /// A disk page failed its checksum on read (corruption or truncated write).
    CorruptPage { engine: String, offset: u64 },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::IoError { operation, reason } => {
                write!(f, "io error during {operation}: {reason}")
            }
            CatalogError::SchemaError { reason } => write!(f, "schema error: {reason}"),
            CatalogError::DuplicateId { restaurant_id } => {
                write!(f, "duplicate restaurant_id: {restaurant_id}")
            }
            CatalogError::NotFound { what } => write!(f, "not found: {what}"),
            CatalogError::PlanError { reason } => write!(f, "plan error: {reason}"),
            CatalogError::ParseError { reason, position } => {
                write!(f, "parse error at position {position}: {reason}")
            }
            CatalogError::LockTimeout { path, timeout_secs } => {
                write!(f, "timed out after {timeout_secs}s waiting for lock on {path}")
            }
            CatalogError::CorruptPage { engine, offset } => {
                write!(f, "{engine}: checksum mismatch for page at offset {offset}")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::IoError {
            operation: "unspecified".to_string(),
            reason: err.to_string(),
        }
    }
}

impl CatalogError {
    /// Short machine-stable tag used by the planner's error envelope and by
    /// `EXPLAIN`'s `status` field.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::IoError { .. } => "IoError",
            CatalogError::SchemaError { .. } => "SchemaError",
            CatalogError::DuplicateId { .. } => "DuplicateId",
            CatalogError::NotFound { .. } => "NotFound",
            CatalogError::PlanError { .. } => "PlanError",
            CatalogError::ParseError { .. } => "ParseError",
            CatalogError::LockTimeout { .. } => "LockTimeout",
            CatalogError::CorruptPage { .. } => "CorruptPage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_stable() {
        let err = CatalogError::DuplicateId { restaurant_id: 42 };
        assert_eq!(err.kind(), "DuplicateId");
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CatalogError = io.into();
        assert_eq!(err.kind(), "IoError");
    }
}
