//! Process-wide mapping from canonical path to the state a session needs:
//! its per-file lock, open count, descriptor location, and owned cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use monofs_common::CanonicalPath;

use crate::cache::ClusterCache;
use crate::directory_index::DescriptorLocation;
use crate::sync::RwGate;

/// Everything held in memory for one file that has been observed (created
/// or opened) at least once since mount.
pub struct FileHandleRecord {
    pub path: CanonicalPath,
    pub descriptor_location: DescriptorLocation,
    pub file_l1_cluster: u32,
    open_count: AtomicU32,
    pub lock: RwGate,
    pub cache: ClusterCache,
}

impl FileHandleRecord {
    pub fn new(path: CanonicalPath, descriptor_location: DescriptorLocation, file_l1_cluster: u32) -> Self {
        Self {
            path,
            descriptor_location,
            file_l1_cluster,
            open_count: AtomicU32::new(0),
            lock: RwGate::new(),
            cache: ClusterCache::new(),
        }
    }

    pub fn open_count(&self) -> u32 {
        self.open_count.load(Ordering::SeqCst)
    }

    /// Every mutation of `open_count` happens while the caller holds the
    /// global metadata exclusive lock, so relaxed interior mutability here
    /// is sound without its own lock.
    pub fn increment_open_count(&self) {
        self.open_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn decrement_open_count(&self) {
        self.open_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Canonical path -> [`FileHandleRecord`]. An entry exists iff the
/// descriptor it names has been observed at least once since mount and not
/// since deleted.
#[derive(Default)]
pub struct OpenFileTable {
    records: HashMap<String, Arc<FileHandleRecord>>,
}

impl OpenFileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &CanonicalPath) -> Option<Arc<FileHandleRecord>> {
        self.records.get(&path.to_string()).cloned()
    }

    pub fn insert(&mut self, record: Arc<FileHandleRecord>) {
        self.records.insert(record.path.to_string(), record);
    }

    pub fn remove(&mut self, path: &CanonicalPath) -> Option<Arc<FileHandleRecord>> {
        self.records.remove(&path.to_string())
    }

    pub fn total_open_count(&self) -> u32 {
        self.records.values().map(|r| r.open_count()).sum()
    }
}
