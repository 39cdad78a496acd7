// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Catalog configuration: base directory, default index set, and the
//! on-disk page-size constants the five engines were built with.
//!
//! Loaded from `catalogdb.toml` if present, then overlaid by `CATALOGDB_*`
//! environment variables, then by CLI flags; the CLI is responsible for
//! applying its own layer on top of [`Config::load`]'s result, since flags
//! are parsed by `clap` before a `Config` exists.

use crate::error::{CatalogError, CatalogResult};
use crate::isam::page::PAGE_SIZE as ISAM_PAGE_SIZE;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Resolved configuration, after the file/env layers have been merged.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
    pub default_indices: Option<String>,
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_dir: PathBuf::from(".catalogdb"),
            default_indices: None,
            page_size: ISAM_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    base_dir: Option<PathBuf>,
    default_indices: Option<String>,
    page_size: Option<usize>,
}

impl From<TomlConfig> for Config {
    fn from(toml: TomlConfig) -> Config {
        let default = Config::default();
        Config {
            base_dir: toml.base_dir.unwrap_or(default.base_dir),
            default_indices: toml.default_indices,
            page_size: toml.page_size.unwrap_or(default.page_size),
        }
    }
}

impl Config {
    /// Reads `<dir>/catalogdb.toml` (if present) and layers the
    /// `CATALOGDB_BASE_DIR` / `CATALOGDB_DEFAULT_INDICES` / `CATALOGDB_PAGE_SIZE`
    /// environment variables on top, falling back to built-in defaults for
    /// anything neither source sets. CLI flags are applied by the caller
    /// afterward, since they take precedence over all of this.
    pub fn load(dir: &Path) -> CatalogResult<Config> {
        let path = dir.join("catalogdb.toml");
        let toml_config = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            toml::from_str(&text).map_err(|e| CatalogError::SchemaError {
                reason: format!("invalid {}: {e}", path.display()),
            })?
        } else {
            TomlConfig::default()
        };

        let mut config: Config = toml_config.into();

        if let Ok(val) = std::env::var("CATALOGDB_BASE_DIR") {
            config.base_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CATALOGDB_DEFAULT_INDICES") {
            config.default_indices = Some(val);
        }
        if let Ok(val) = std::env::var("CATALOGDB_PAGE_SIZE") {
            config.page_size = val.parse().map_err(|_| CatalogError::SchemaError {
                reason: format!("CATALOGDB_PAGE_SIZE must be a positive integer, got {val:?}"),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// The five engines' on-disk page layouts are compile-time constants;
    /// a config that overrides `page_size` away from what the binary was
    /// built with would produce pages the reader can't parse, so this
    /// rejects the mismatch instead of silently ignoring it (§10.5: such a
    /// change "requires a rebuild", i.e. a recompile, not a config edit).
    fn validate(&self) -> CatalogResult<()> {
        if self.page_size != ISAM_PAGE_SIZE {
            return Err(CatalogError::SchemaError {
                reason: format!(
                    "page_size {} does not match the compiled-in ISAM page size {}; \
                     changing page sizes requires rebuilding catalogdb, not editing config",
                    self.page_size, ISAM_PAGE_SIZE
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn defaults_when_no_file_and_no_env() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.base_dir, PathBuf::from(".catalogdb"));
        assert_eq!(config.default_indices, None);
    }

    #[test]
    fn file_overrides_default() {
        let dir = tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("catalogdb.toml")).unwrap();
        writeln!(file, "base_dir = \"/tmp/mycatalog\"").unwrap();
        writeln!(file, "default_indices = \"ISAM,HASH\"").unwrap();
        drop(file);

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/tmp/mycatalog"));
        assert_eq!(config.default_indices.as_deref(), Some("ISAM,HASH"));
    }

    #[test]
    #[serial_test::serial(catalogdb_env)]
    fn env_overrides_file() {
        let dir = tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("catalogdb.toml")).unwrap();
        writeln!(file, "base_dir = \"/tmp/mycatalog\"").unwrap();
        drop(file);

        std::env::set_var("CATALOGDB_BASE_DIR", "/tmp/fromenv");
        let config = Config::load(dir.path()).unwrap();
        std::env::remove_var("CATALOGDB_BASE_DIR");

        assert_eq!(config.base_dir, PathBuf::from("/tmp/fromenv"));
    }

    #[test]
    fn mismatched_page_size_is_rejected() {
        let dir = tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("catalogdb.toml")).unwrap();
        writeln!(file, "page_size = 1").unwrap();
        drop(file);

        let err = Config::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), "SchemaError");
    }
}
