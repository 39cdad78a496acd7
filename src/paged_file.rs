// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Block-addressable file abstraction shared by every index engine.
//!
//! Generalises the fixed-page, memory-mapped, CRC32-checked page store the
//! B+-Tree used internally into a single reusable primitive: `IsamIndex`,
//! `BPlusIndex` and `RTreeIndex` all open one `PagedFile` per data file
//! instead of hand-rolling their own mmap bookkeeping.

use crate::error::{CatalogError, CatalogResult};
use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// A page-aligned, growable, memory-mapped file.
///
/// All reads and writes are full-page aligned; there is no partial-page
/// I/O. Growth happens by appending a page at a time and remapping. The
/// mapping is created lazily on the first `append_page` so a brand-new file
/// genuinely has zero pages rather than one unwritten phantom page (§4.1).
#[derive(Debug)]
pub struct PagedFile {
    path: PathBuf,
    file: File,
    mmap: Option<MmapMut>,
    page_size: usize,
    page_count: u64,
}

impl PagedFile {
    /// Opens (creating if absent) a paged file with the given fixed page
    /// size. An empty/new file starts with zero pages. Reopening an
    /// existing file derives `page_count` from its length (always an exact
    /// multiple of `page_size`, since growth only ever happens one page at
    /// a time).
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> CatalogResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| CatalogError::IoError {
                operation: "paged_file_open".to_string(),
                reason: e.to_string(),
            })?;

        let len = file.metadata().map_err(|e| CatalogError::IoError {
            operation: "paged_file_stat".to_string(),
            reason: e.to_string(),
        })?.len();

        let page_count = len / page_size as u64;

        let mmap = if page_count == 0 {
            None
        } else {
            Some(unsafe {
                MmapMut::map_mut(&file).map_err(|e| CatalogError::IoError {
                    operation: "paged_file_mmap".to_string(),
                    reason: e.to_string(),
                })?
            })
        };

        Ok(PagedFile {
            path,
            file,
            mmap,
            page_size,
            page_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of whole pages currently backing the file.
    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    /// Reads the page at `index` (0-based) into a freshly allocated buffer.
    pub fn read_page(&self, index: u64) -> CatalogResult<Vec<u8>> {
        let (start, end) = self.bounds(index)?;
        Ok(self.mmap_ref()?[start..end].to_vec())
    }

    /// Writes `data` (must be exactly `page_size` bytes) to the page at
    /// `index`. A read issued right after this call on the same index
    /// observes the written bytes (read-after-write within one process).
    pub fn write_page(&mut self, index: u64, data: &[u8]) -> CatalogResult<()> {
        if data.len() != self.page_size {
            return Err(CatalogError::SchemaError {
                reason: format!(
                    "write_page expected {} bytes, got {}",
                    self.page_size,
                    data.len()
                ),
            });
        }
        let (start, end) = self.bounds(index)?;
        self.mmap_mut()?[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Appends a new page (growing the file by one page) and returns its
    /// index.
    pub fn append_page(&mut self, data: &[u8]) -> CatalogResult<u64> {
        if data.len() != self.page_size {
            return Err(CatalogError::SchemaError {
                reason: format!(
                    "append_page expected {} bytes, got {}",
                    self.page_size,
                    data.len()
                ),
            });
        }
        let index = self.page_count;
        let new_len = (index + 1) * self.page_size as u64;
        self.file.set_len(new_len).map_err(|e| CatalogError::IoError {
            operation: "paged_file_grow".to_string(),
            reason: e.to_string(),
        })?;
        self.mmap = Some(unsafe {
            MmapMut::map_mut(&self.file).map_err(|e| CatalogError::IoError {
                operation: "paged_file_remap".to_string(),
                reason: e.to_string(),
            })?
        });
        self.page_count += 1;
        self.write_page(index, data)?;
        Ok(index)
    }

    /// Flushes the mapping to disk. Engines call this before closing a
    /// handle that other processes may open next (e.g. before `rebuild`).
    pub fn flush(&self) -> CatalogResult<()> {
        match &self.mmap {
            Some(mmap) => mmap.flush().map_err(|e| CatalogError::IoError {
                operation: "paged_file_flush".to_string(),
                reason: e.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn mmap_ref(&self) -> CatalogResult<&MmapMut> {
        self.mmap.as_ref().ok_or_else(|| CatalogError::IoError {
            operation: "paged_file_bounds".to_string(),
            reason: "no pages present".to_string(),
        })
    }

    fn mmap_mut(&mut self) -> CatalogResult<&mut MmapMut> {
        self.mmap.as_mut().ok_or_else(|| CatalogError::IoError {
            operation: "paged_file_bounds".to_string(),
            reason: "no pages present".to_string(),
        })
    }

    fn bounds(&self, index: u64) -> CatalogResult<(usize, usize)> {
        if index >= self.page_count {
            return Err(CatalogError::IoError {
                operation: "paged_file_bounds".to_string(),
                reason: format!("page {index} out of range ({} pages present)", self.page_count),
            });
        }
        let start = index as usize * self.page_size;
        let end = start + self.page_size;
        Ok((start, end))
    }
}
