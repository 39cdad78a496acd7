// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! File locking for single-writer coordination across processes.
//!
//! Uses an advisory exclusive file lock so two CLI processes cannot mutate
//! the same catalog base directory at once. Readers (plain `query`) do not
//! take the lock.

use crate::error::{CatalogError, CatalogResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Acquires the exclusive lock on `<base_path>/catalog.lock`.
///
/// Blocks, retrying every 100ms, until either the lock is acquired or
/// `timeout` elapses, in which case a `LockTimeout` error is returned.
pub fn acquire_lock(base_path: &Path, timeout: Duration) -> CatalogResult<CatalogLock> {
    std::fs::create_dir_all(base_path)?;
    let lock_path = base_path.join("catalog.lock");

    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(&lock_path)
        .map_err(|e| CatalogError::IoError {
            operation: "create_lock_file".to_string(),
            reason: e.to_string(),
        })?;

    let start = Instant::now();
    loop {
        match lock_file.try_lock_exclusive() {
            Ok(()) => {
                return Ok(CatalogLock {
                    file: lock_file,
                    path: lock_path,
                });
            }
            Err(_) if start.elapsed() < timeout => {
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(_) => {
                return Err(CatalogError::LockTimeout {
                    path: lock_path.display().to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }
        }
    }
}

/// RAII handle: the lock releases when this value drops.
pub struct CatalogLock {
    file: File,
    #[allow(dead_code)]
    path: PathBuf,
}

impl Drop for CatalogLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// True if another process currently holds `<base_path>/catalog.lock`.
pub fn is_locked(base_path: &Path) -> bool {
    let lock_path = base_path.join("catalog.lock");
    let lock_file = match OpenOptions::new().read(true).open(&lock_path) {
        Ok(f) => f,
        Err(_) => return false,
    };
    match lock_file.try_lock_exclusive() {
        Ok(()) => {
            let _ = lock_file.unlock();
            false
        }
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_then_release_allows_reacquire() {
        let dir = tempdir().unwrap();
        {
            let _lock = acquire_lock(dir.path(), Duration::from_secs(1)).unwrap();
            assert!(is_locked(dir.path()));
        }
        let _lock2 = acquire_lock(dir.path(), Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn second_acquire_times_out_while_first_is_held() {
        let dir = tempdir().unwrap();
        let _first = acquire_lock(dir.path(), Duration::from_secs(1)).unwrap();
        let err = acquire_lock(dir.path(), Duration::from_millis(250)).unwrap_err();
        assert_eq!(err.kind(), "LockTimeout");
    }
}
